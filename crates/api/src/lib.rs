//! HTTP intake and read API for the wallet/commission pipeline.

pub mod app;
pub mod verify;
