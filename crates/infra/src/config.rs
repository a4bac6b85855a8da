//! Runtime configuration, sourced from the environment with sensible
//! defaults for local development.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use paygrid_commission::RateSchedule;
use paygrid_core::{CommissionRate, TenantId};
use paygrid_events::{AdmissionFilter, Channel, RetryPolicy};

/// Commission configuration: platform-wide default rate plus per-tenant
/// overrides, in basis points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub default_rate_bps: u32,
    #[serde(default)]
    pub tenant_overrides: HashMap<TenantId, u32>,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            default_rate_bps: 790,
            tenant_overrides: HashMap::new(),
        }
    }
}

/// Admitted event types per intake channel. Operators can widen or narrow
/// these lists without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub platform: Vec<String>,
    pub tenant: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let filter = AdmissionFilter::with_defaults();
        Self {
            platform: filter.allowed(Channel::Platform).map(String::from).collect(),
            tenant: filter.allowed(Channel::Tenant).map(String::from).collect(),
        }
    }
}

/// Retry configuration in plain seconds, the shape operators set it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 10,
            max_delay_secs: 600,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub commission: CommissionConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Events stuck in `Processing` longer than this are requeued.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
    /// Shared secret for verifying inbound webhook signatures.
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,
    /// Listen address for the HTTP server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_processing_timeout_secs() -> u64 {
    300
}

fn default_webhook_secret() -> String {
    "whsec_dev".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commission: CommissionConfig::default(),
            admission: AdmissionConfig::default(),
            retry: RetryConfig::default(),
            processing_timeout_secs: default_processing_timeout_secs(),
            webhook_secret: default_webhook_secret(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load configuration from `PAYGRID_*` environment variables, falling
    /// back to defaults. Warns when the webhook secret is the dev default.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(bps) = env_parse::<u32>("PAYGRID_COMMISSION_BPS") {
            config.commission.default_rate_bps = bps;
        }
        if let Ok(raw) = std::env::var("PAYGRID_TENANT_RATE_OVERRIDES") {
            config.commission.tenant_overrides = parse_rate_overrides(&raw);
        }
        if let Ok(raw) = std::env::var("PAYGRID_ADMIT_PLATFORM_TYPES") {
            config.admission.platform = parse_type_list(&raw);
        }
        if let Ok(raw) = std::env::var("PAYGRID_ADMIT_TENANT_TYPES") {
            config.admission.tenant = parse_type_list(&raw);
        }
        if let Some(attempts) = env_parse::<u32>("PAYGRID_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = env_parse::<u64>("PAYGRID_RETRY_BASE_DELAY_SECS") {
            config.retry.base_delay_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("PAYGRID_RETRY_MAX_DELAY_SECS") {
            config.retry.max_delay_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("PAYGRID_PROCESSING_TIMEOUT_SECS") {
            config.processing_timeout_secs = secs;
        }
        if let Ok(secret) = std::env::var("PAYGRID_WEBHOOK_SECRET") {
            config.webhook_secret = secret;
        } else {
            warn!("PAYGRID_WEBHOOK_SECRET not set, using development default");
        }
        if let Ok(addr) = std::env::var("PAYGRID_BIND_ADDR") {
            config.bind_addr = addr;
        }

        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.base_delay_secs),
            Duration::from_secs(self.retry.max_delay_secs),
        )
    }

    pub fn admission_filter(&self) -> AdmissionFilter {
        AdmissionFilter::new(
            self.admission.platform.iter().cloned(),
            self.admission.tenant.iter().cloned(),
        )
    }

    /// Build the rate schedule; invalid basis-point values (over 100%) are
    /// dropped with a warning rather than taking the pipeline down.
    pub fn rate_schedule(&self) -> RateSchedule {
        let default_rate = match CommissionRate::from_basis_points(self.commission.default_rate_bps)
        {
            Ok(rate) => rate,
            Err(err) => {
                warn!(
                    bps = self.commission.default_rate_bps,
                    error = %err,
                    "invalid default commission rate, using 790 bps"
                );
                CommissionRate::from_basis_points(790).unwrap_or(CommissionRate::ZERO)
            }
        };

        let mut schedule = RateSchedule::new(default_rate);
        for (tenant_id, bps) in &self.commission.tenant_overrides {
            match CommissionRate::from_basis_points(*bps) {
                Ok(rate) => schedule = schedule.with_override(*tenant_id, rate),
                Err(err) => {
                    warn!(tenant_id = %tenant_id, bps, error = %err, "skipping invalid rate override");
                }
            }
        }
        schedule
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }
}

/// Split a comma-separated list, trimming blanks
/// (`"a.b, c.d"` -> `["a.b", "c.d"]`).
fn parse_type_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `"<tenant_uuid>=<bps>,..."` pairs. Unparseable pairs are dropped
/// with a warning rather than taking startup down.
fn parse_rate_overrides(raw: &str) -> HashMap<TenantId, u32> {
    let mut overrides = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = pair.split_once('=').and_then(|(tenant, bps)| {
            let tenant = tenant.trim().parse::<TenantId>().ok()?;
            let bps = bps.trim().parse::<u32>().ok()?;
            Some((tenant, bps))
        });
        match parsed {
            Some((tenant, bps)) => {
                overrides.insert(tenant, bps);
            }
            None => warn!(pair, "unparseable tenant rate override, ignoring"),
        }
    }
    overrides
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "unparseable environment variable, ignoring");
            None
        }
    }
}
