use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use promfan_core::error::{Result, PromfanError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PromfanError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if self.groups.is_empty() {
            return Err(PromfanError::BadRequest("groups must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for g in &self.groups {
            g.validate()?;
            if !seen.insert(g.name.as_str()) {
                return Err(PromfanError::BadRequest(format!("duplicate group name: {}", g.name)));
            }
        }

        self.gateway.validate()?;

        Ok(())
    }

    /// Group scraped when `/metrics` carries no selector.
    pub fn default_group(&self) -> &str {
        self.groups.first().map(|g| g.name.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Deadline for one scatter-gather operation.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Outbound queue depth per worker connection.
    #[serde(default = "default_worker_queue")]
    pub worker_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_ms: default_request_timeout_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            worker_queue: default_worker_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.request_timeout_ms) {
            return Err(PromfanError::BadRequest(
                "gateway.request_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(PromfanError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(PromfanError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(PromfanError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.worker_queue == 0 {
            return Err(PromfanError::BadRequest("gateway.worker_queue must be at least 1".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9209".into()
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_worker_queue() -> usize {
    64
}

/// Logical worker group: every connected worker whose app name is listed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
    pub apps: Vec<String>,
}

impl GroupConfig {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PromfanError::BadRequest("group name must not be empty".into()));
        }
        if self.apps.is_empty() {
            return Err(PromfanError::BadRequest(format!(
                "group {} must list at least one app",
                self.name
            )));
        }
        Ok(())
    }
}
