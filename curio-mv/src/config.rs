//! Configuration resolution for curio-mv
//!
//! Settings resolve with the priority: environment variables, then the
//! `curio-mv.toml` config file, then compiled defaults. Provider
//! credentials stay out of the binary; a provider without a configured
//! credential is skipped at startup with a warning rather than failing
//! the whole service.

use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5731";
const DEFAULT_FANOUT_DEADLINE_SECS: u64 = 30;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ENRICHMENT_DELAY_MS: u64 = 2000;

/// Per-provider connection settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    /// Endpoint override for staging or test harnesses
    pub base_url: Option<String>,
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MvConfig {
    pub bind_address: String,
    /// Global deadline for one provider fan-out
    pub fanout_deadline_secs: u64,
    /// Per-call timeout applied to every provider call
    pub provider_timeout_secs: u64,
    /// Pause between items during batch enrichment
    pub enrichment_delay_ms: u64,
    pub gocollect: ProviderSettings,
    pub pricecharting: ProviderSettings,
    pub ebay: ProviderSettings,
    pub covermatch: ProviderSettings,
}

impl Default for MvConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            fanout_deadline_secs: DEFAULT_FANOUT_DEADLINE_SECS,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            enrichment_delay_ms: DEFAULT_ENRICHMENT_DELAY_MS,
            gocollect: ProviderSettings::default(),
            pricecharting: ProviderSettings::default(),
            ebay: ProviderSettings::default(),
            covermatch: ProviderSettings::default(),
        }
    }
}

impl MvConfig {
    /// Load the config: TOML layer first, environment overrides on top
    pub fn load() -> curio_common::Result<Self> {
        let mut config: MvConfig =
            curio_common::config::load_service_config("curio-mv")?.unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables override the file layer
    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("CURIO_MV_BIND") {
            self.bind_address = bind;
        }
        if let Some(secs) = env_u64("CURIO_MV_FANOUT_DEADLINE_SECS") {
            self.fanout_deadline_secs = secs;
        }
        if let Some(secs) = env_u64("CURIO_MV_PROVIDER_TIMEOUT_SECS") {
            self.provider_timeout_secs = secs;
        }
        if let Some(ms) = env_u64("CURIO_MV_ENRICHMENT_DELAY_MS") {
            self.enrichment_delay_ms = ms;
        }
        if let Ok(key) = std::env::var("CURIO_GOCOLLECT_API_KEY") {
            self.gocollect.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CURIO_PRICECHARTING_API_KEY") {
            self.pricecharting.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CURIO_EBAY_OAUTH_TOKEN") {
            self.ebay.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("CURIO_COVERMATCH_URL") {
            self.covermatch.base_url = Some(url);
        }
    }

    pub fn fanout_deadline(&self) -> Duration {
        Duration::from_secs(self.fanout_deadline_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn enrichment_delay(&self) -> Duration {
        Duration::from_millis(self.enrichment_delay_ms)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(var = name, value = %raw, "ignoring non-numeric environment override");
                None
            }
        },
        Err(_) => None,
    }
}
