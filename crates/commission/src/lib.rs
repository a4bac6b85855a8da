//! `paygrid-commission` — platform commission computation and recording.

pub mod engine;
pub mod rates;

pub use engine::{
    CommissionEngine, CommissionError, CommissionRecord, CommissionStore, InMemoryCommissionStore,
    REVENUE_SLUG,
};
pub use rates::RateSchedule;
