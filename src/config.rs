use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::trace;

use crate::{
    actors::{
        discovery::DiscoveryPlan,
        monitor::{DEFAULT_MONITOR_INTERVAL, MonitorSettings},
    },
    error::{MonitorError, MonitorResult},
    monitors::{
        liveness::DEFAULT_FAIL_THRESHOLD,
        probe::{COMMON_PORTS, DEFAULT_CONNECT_TIMEOUT},
        subnet::SubnetPrefix,
    },
};

/// Prefix used when no interface yields a usable subnet
pub const DEFAULT_SUBNET: SubnetPrefix = SubnetPrefix::new(192, 168, 1);

/// Target of the synthetic internet reachability entry
pub const DEFAULT_INTERNET_CHECK: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

pub const DEFAULT_WORKERS: usize = 50;
pub const DEFAULT_FIRST_HOST: u8 = 1;
pub const DEFAULT_LAST_HOST: u8 = 254;

/// Configuration as read from the JSON file, every field optional
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Subnet to scan instead of the detected one
    pub subnet: Option<SubnetPrefix>,
    pub fallback_subnet: Option<SubnetPrefix>,
    pub internet_check: Option<Ipv4Addr>,
    pub discovery: Option<DiscoveryConfig>,
    pub monitor: Option<MonitorConfig>,
    pub probe: Option<ProbeConfig>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DiscoveryConfig {
    pub workers: Option<usize>,
    pub first_host: Option<u8>,
    pub last_host: Option<u8>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct MonitorConfig {
    /// Seconds between rounds
    pub interval: Option<u64>,
    pub fail_threshold: Option<u32>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProbeConfig {
    pub timeout_ms: Option<u64>,
    pub ports: Option<Vec<u16>>,
}

/// Validated configuration with all defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub subnet: Option<SubnetPrefix>,
    pub fallback_subnet: SubnetPrefix,
    pub internet_check: Ipv4Addr,
    pub workers: usize,
    pub first_host: u8,
    pub last_host: u8,
    pub interval: Duration,
    pub fail_threshold: u32,
    pub connect_timeout: Duration,
    pub ports: Vec<u16>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            subnet: None,
            fallback_subnet: DEFAULT_SUBNET,
            internet_check: DEFAULT_INTERNET_CHECK,
            workers: DEFAULT_WORKERS,
            first_host: DEFAULT_FIRST_HOST,
            last_host: DEFAULT_LAST_HOST,
            interval: DEFAULT_MONITOR_INTERVAL,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ports: COMMON_PORTS.to_vec(),
        }
    }
}

impl Config {
    /// Apply defaults and check every value
    pub fn resolve(self) -> MonitorResult<ResolvedConfig> {
        let defaults = ResolvedConfig::default();
        let discovery = self.discovery.unwrap_or_default();
        let monitor = self.monitor.unwrap_or_default();
        let probe = self.probe.unwrap_or_default();

        let resolved = ResolvedConfig {
            subnet: self.subnet,
            fallback_subnet: self.fallback_subnet.unwrap_or(defaults.fallback_subnet),
            internet_check: self.internet_check.unwrap_or(defaults.internet_check),
            workers: discovery.workers.unwrap_or(defaults.workers),
            first_host: discovery.first_host.unwrap_or(defaults.first_host),
            last_host: discovery.last_host.unwrap_or(defaults.last_host),
            interval: monitor
                .interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            fail_threshold: monitor.fail_threshold.unwrap_or(defaults.fail_threshold),
            connect_timeout: probe
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            ports: probe.ports.unwrap_or(defaults.ports),
        };

        resolved.validate()?;
        Ok(resolved)
    }
}

impl ResolvedConfig {
    fn validate(&self) -> MonitorResult<()> {
        let invalid = |message: String| Err(MonitorError::InvalidConfig(message));

        if !(1..=254).contains(&self.first_host) || !(1..=254).contains(&self.last_host) {
            return invalid(format!(
                "host range {}-{} must lie within 1-254",
                self.first_host, self.last_host
            ));
        }
        if self.first_host > self.last_host {
            return invalid(format!(
                "first_host {} is greater than last_host {}",
                self.first_host, self.last_host
            ));
        }
        if self.workers == 0 {
            return invalid("discovery needs at least one worker".to_string());
        }
        if self.fail_threshold == 0 {
            return invalid("fail_threshold must be at least 1".to_string());
        }
        if self.ports.is_empty() {
            return invalid("at least one probe port is required".to_string());
        }
        if self.ports.contains(&0) {
            return invalid("port 0 cannot be probed".to_string());
        }
        if self.connect_timeout.is_zero() {
            return invalid("probe timeout must be greater than zero".to_string());
        }
        if self.interval.is_zero() {
            return invalid("monitor interval must be greater than zero".to_string());
        }
        for subnet in self.subnet.iter().chain([&self.fallback_subnet]) {
            if subnet.contains(self.internet_check) {
                return invalid(format!(
                    "internet_check {} lies inside subnet {subnet}0/24",
                    self.internet_check
                ));
            }
        }

        Ok(())
    }

    pub fn discovery_plan(&self, subnet: SubnetPrefix) -> DiscoveryPlan {
        DiscoveryPlan {
            subnet,
            first_host: self.first_host,
            last_host: self.last_host,
            workers: self.workers,
            ports: self.ports.clone(),
            internet_check: self.internet_check,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: self.interval,
            fail_threshold: self.fail_threshold,
            ports: self.ports.clone(),
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
