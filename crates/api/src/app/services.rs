//! Service wiring: builds the stores, ledger, commission engine, router and
//! supervisor the HTTP layer runs against.

use std::sync::Arc;

use paygrid_commission::{CommissionEngine, InMemoryCommissionStore};
use paygrid_core::{UserId, WalletOwner};
use paygrid_events::{AdmissionFilter, ContextResolver};
use paygrid_infra::{
    ChargeRefundedHandler, ChargeSucceededHandler, Config, EventRouter, InMemoryEventStore,
    RetrySupervisor, SupervisorConfig, SupervisorHandle, TracingBalanceListener,
    WalletTopupHandler,
};
use paygrid_ledger::{InMemoryWalletStore, WalletLedger};

/// Shared state handed to every route handler.
pub struct AppServices {
    pub config: Config,
    pub events: Arc<InMemoryEventStore>,
    pub admission: AdmissionFilter,
    pub ledger: Arc<WalletLedger>,
    pub commissions: Arc<InMemoryCommissionStore>,
}

/// Build the services and start the background supervisor.
///
/// The platform wallet owner is a fixed service account: commission credits
/// land there regardless of which tenant the charge belongs to.
pub fn build_services(config: Config) -> (Arc<AppServices>, SupervisorHandle) {
    let events = InMemoryEventStore::arc();
    let ledger = Arc::new(
        WalletLedger::new(InMemoryWalletStore::arc())
            .with_listener(Arc::new(TracingBalanceListener)),
    );
    let commissions = InMemoryCommissionStore::arc();

    let platform_owner = WalletOwner::User(UserId::new());
    let engine = Arc::new(CommissionEngine::new(
        config.rate_schedule(),
        ledger.clone(),
        commissions.clone(),
        platform_owner,
    ));

    let router = EventRouter::new()
        .register(
            "payment_intent.succeeded",
            WalletTopupHandler::new(ledger.clone()),
        )
        .register("charge.succeeded", ChargeSucceededHandler::new(engine))
        .register(
            "charge.refunded",
            ChargeRefundedHandler::new(ledger.clone()),
        );

    let supervisor = RetrySupervisor::new(
        events.clone(),
        Arc::new(router),
        ContextResolver::new(),
        config.retry_policy(),
    );
    let handle = supervisor.spawn(SupervisorConfig {
        processing_timeout: config.processing_timeout(),
        ..Default::default()
    });

    let services = Arc::new(AppServices {
        admission: config.admission_filter(),
        events,
        ledger,
        commissions,
        config,
    });

    (services, handle)
}
