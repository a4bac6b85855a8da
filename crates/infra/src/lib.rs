//! Infrastructure layer: event envelope store, routing, handlers, the retry
//! supervisor, runtime configuration, and outbound notification seams.

pub mod config;
pub mod event_store;
pub mod handlers;
pub mod notify;
pub mod router;
pub mod supervisor;

pub use config::Config;
pub use event_store::{EventStats, EventStore, EventStoreError, InMemoryEventStore};
pub use handlers::{ChargeRefundedHandler, ChargeSucceededHandler, WalletTopupHandler};
pub use notify::TracingBalanceListener;
pub use router::{EventHandler, EventRouter, HandlerOutcome};
pub use supervisor::{ProcessOutcome, RetrySupervisor, SupervisorConfig, SupervisorHandle};
