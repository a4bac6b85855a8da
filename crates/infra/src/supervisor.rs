//! Retry/backoff supervisor: the worker loop that drives events from
//! `Pending` to a terminal state.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use paygrid_events::{ContextResolver, InboundEvent, RetryPolicy, TenantScope};

use crate::event_store::EventStore;
use crate::router::{EventRouter, HandlerOutcome};

/// Supervisor loop configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How often to poll for ready events when idle.
    pub poll_interval: Duration,
    /// Events stuck in `Processing` longer than this are requeued
    /// (crash recovery via timeout, not in-memory state).
    pub processing_timeout: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            processing_timeout: Duration::from_secs(300),
            name: "event-supervisor".to_string(),
        }
    }
}

/// What happened to one claimed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Handler succeeded; event is `Processed`.
    Processed,
    /// Retryable failure; event is `Failed` and scheduled for another
    /// attempt after backoff.
    Retrying,
    /// Terminal: attempt budget exhausted or fatal handler error.
    DeadLettered,
    /// Terminal: no tenant context resolvable; retrying cannot manufacture
    /// missing metadata.
    Unresolvable,
}

/// Runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SupervisorStats {
    pub events_processed: u64,
    pub events_retried: u64,
    pub events_dead_lettered: u64,
    pub events_unresolvable: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SupervisorStats>>,
}

impl SupervisorHandle {
    /// Request graceful shutdown and wait for the loop to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Pulls claimed events through resolution, routing, and state transitions.
pub struct RetrySupervisor<S: EventStore> {
    store: S,
    router: Arc<EventRouter>,
    resolver: ContextResolver,
    scope: TenantScope,
    policy: RetryPolicy,
}

impl<S: EventStore> RetrySupervisor<S> {
    pub fn new(
        store: S,
        router: Arc<EventRouter>,
        resolver: ContextResolver,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            router,
            resolver,
            scope: TenantScope::new(),
            policy,
        }
    }

    /// Share an externally owned scope cell (e.g. one consulted by
    /// scope-sensitive repositories).
    pub fn with_scope(mut self, scope: TenantScope) -> Self {
        self.scope = scope;
        self
    }

    /// Process one already-claimed event to completion and persist the
    /// resulting state. Exposed for deterministic tests; the spawned loop
    /// calls this for every claim.
    pub fn process_one(&self, event: &mut InboundEvent) -> ProcessOutcome {
        let ctx = match self.resolver.resolve(event) {
            Ok(ctx) => ctx,
            // Both variants are terminal: retrying cannot manufacture
            // missing or unparseable metadata.
            Err(err) => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "dropping event without resolvable tenant context"
                );
                event.mark_dead_lettered(err.to_string());
                self.persist(event);
                return ProcessOutcome::Unresolvable;
            }
        };

        // Tenant scope is torn down when the guard drops, success or
        // failure, so it cannot leak into the next event on this worker.
        let _guard = self.scope.enter(ctx.tenant_id);

        match self.router.route(event, &ctx) {
            HandlerOutcome::Success => {
                event.mark_processed();
                self.persist(event);
                debug!(event_id = %event.id, "event processed");
                ProcessOutcome::Processed
            }
            HandlerOutcome::Retryable(reason) => {
                event.mark_failed(reason.clone(), &self.policy);
                self.persist(event);
                if event.status.is_retriable() {
                    debug!(
                        event_id = %event.id,
                        attempts = event.attempts,
                        error = %reason,
                        "retryable failure, backoff scheduled"
                    );
                    ProcessOutcome::Retrying
                } else {
                    error!(
                        event_id = %event.id,
                        attempts = event.attempts,
                        error = %reason,
                        "event dead-lettered after exhausting retries"
                    );
                    ProcessOutcome::DeadLettered
                }
            }
            HandlerOutcome::Fatal(reason) => {
                error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %reason,
                    "fatal handler error, event dead-lettered"
                );
                event.mark_dead_lettered(reason);
                self.persist(event);
                ProcessOutcome::DeadLettered
            }
        }
    }

    /// Claim and process every currently ready event. Returns how many were
    /// claimed. Useful for tests and drain-on-shutdown.
    pub fn drain_ready(&self) -> usize {
        let mut processed = 0;
        loop {
            match self.store.claim_next() {
                Ok(Some(mut event)) => {
                    self.process_one(&mut event);
                    processed += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to claim event");
                    break;
                }
            }
        }
        processed
    }

    fn persist(&self, event: &InboundEvent) {
        if let Err(err) = self.store.update(event) {
            // The state transition is lost but the event itself is durable;
            // stale-processing recovery will requeue it.
            error!(event_id = %event.id, error = %err, "failed to persist event state");
        }
    }

    /// Spawn the polling loop on a background thread.
    pub fn spawn(self, config: SupervisorConfig) -> SupervisorHandle
    where
        S: Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SupervisorStats::default()));
        let stats_clone = Arc::clone(&stats);

        let join =
            thread::spawn(move || supervisor_loop(self, config, shutdown_rx, stats_clone));

        SupervisorHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}

fn supervisor_loop<S: EventStore>(
    supervisor: RetrySupervisor<S>,
    config: SupervisorConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SupervisorStats>>,
) {
    info!(supervisor = %config.name, "event supervisor started");
    let start_time = Instant::now();
    let mut last_recovery = Instant::now() - config.processing_timeout;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        {
            let mut s = stats.lock().unwrap_or_else(|e| e.into_inner());
            s.uptime_secs = start_time.elapsed().as_secs();
        }

        // Periodic crash recovery: a worker that died mid-event leaves it
        // in Processing; requeue past the timeout.
        if last_recovery.elapsed() >= config.processing_timeout {
            match supervisor.store.recover_stale(config.processing_timeout) {
                Ok(requeued) if !requeued.is_empty() => {
                    warn!(
                        supervisor = %config.name,
                        count = requeued.len(),
                        "requeued events stuck in processing"
                    );
                }
                Ok(_) => {}
                Err(err) => error!(supervisor = %config.name, error = %err, "stale recovery failed"),
            }
            last_recovery = Instant::now();
        }

        match supervisor.store.claim_next() {
            Ok(Some(mut event)) => {
                debug!(
                    supervisor = %config.name,
                    event_id = %event.id,
                    event_type = %event.event_type,
                    attempt = event.attempts,
                    "claimed event"
                );
                let outcome = supervisor.process_one(&mut event);
                let mut s = stats.lock().unwrap_or_else(|e| e.into_inner());
                match outcome {
                    ProcessOutcome::Processed => s.events_processed += 1,
                    ProcessOutcome::Retrying => s.events_retried += 1,
                    ProcessOutcome::DeadLettered => s.events_dead_lettered += 1,
                    ProcessOutcome::Unresolvable => s.events_unresolvable += 1,
                }
            }
            Ok(None) => thread::sleep(config.poll_interval),
            Err(err) => {
                error!(supervisor = %config.name, error = %err, "failed to claim event");
                thread::sleep(config.poll_interval);
            }
        }
    }

    info!(supervisor = %config.name, "event supervisor stopped");
}
