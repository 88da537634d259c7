use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::rules::RuleTable;

const DEFAULT_API_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_SIGN_URL: &str = "http://127.0.0.1:5000/detected_sign";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8081/violations/add";
const DEFAULT_VEHICLE_ID: &str = "Simulator-Car-001";
const DEFAULT_THROTTLE_SECS: f64 = 2.0;
const DEFAULT_REPORT_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_SIGN_TIMEOUT_SECS: f64 = 5.0;

#[derive(Debug, Deserialize, Default)]
struct SignwatchConfigFile {
    api: Option<ApiConfigFile>,
    relay: Option<RelayConfigFile>,
    backend: Option<BackendConfigFile>,
    vehicle_id: Option<String>,
    /// sign name → action code → violation description
    rules: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RelayConfigFile {
    sign_url: Option<String>,
    throttle_secs: Option<f64>,
    timeout_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    url: Option<String>,
    timeout_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SignwatchConfig {
    pub api_addr: String,
    pub vehicle_id: String,
    pub relay: RelaySettings,
    pub backend: BackendSettings,
    pub rules: RuleTable,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub sign_url: String,
    pub throttle: Duration,
    /// Bound on one `/detected_sign` post.
    pub timeout: Duration,
}

/// Command-line values. Applied after env, before validation.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_addr: Option<String>,
    pub backend_url: Option<String>,
    pub sign_url: Option<String>,
    pub vehicle_id: Option<String>,
    pub throttle_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub timeout: Duration,
}

impl SignwatchConfig {
    /// Loads the file named by `SIGNWATCH_CONFIG` (if any), then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGNWATCH_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, &ConfigOverrides::default())
    }

    pub fn load_with(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SignwatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.apply_overrides(overrides)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SignwatchConfigFile) -> Result<Self> {
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let vehicle_id = file
            .vehicle_id
            .unwrap_or_else(|| DEFAULT_VEHICLE_ID.to_string());
        let relay = RelaySettings {
            sign_url: file
                .relay
                .as_ref()
                .and_then(|relay| relay.sign_url.clone())
                .unwrap_or_else(|| DEFAULT_SIGN_URL.to_string()),
            throttle: seconds(
                "relay.throttle_secs",
                file.relay
                    .as_ref()
                    .and_then(|relay| relay.throttle_secs)
                    .unwrap_or(DEFAULT_THROTTLE_SECS),
            )?,
            timeout: seconds(
                "relay.timeout_secs",
                file.relay
                    .and_then(|relay| relay.timeout_secs)
                    .unwrap_or(DEFAULT_SIGN_TIMEOUT_SECS),
            )?,
        };
        let backend = BackendSettings {
            url: file
                .backend
                .as_ref()
                .and_then(|backend| backend.url.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            timeout: seconds(
                "backend.timeout_secs",
                file.backend
                    .and_then(|backend| backend.timeout_secs)
                    .unwrap_or(DEFAULT_REPORT_TIMEOUT_SECS),
            )?,
        };
        let rules = match file.rules {
            Some(raw) => RuleTable::from_codes(&raw)?,
            None => RuleTable::standard(),
        };
        Ok(Self {
            api_addr,
            vehicle_id,
            relay,
            backend,
            rules,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = non_empty_env("SIGNWATCH_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(url) = non_empty_env("SIGNWATCH_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(url) = non_empty_env("SIGNWATCH_SIGN_URL") {
            self.relay.sign_url = url;
        }
        if let Some(id) = non_empty_env("SIGNWATCH_VEHICLE_ID") {
            self.vehicle_id = id;
        }
        if let Some(raw) = non_empty_env("SIGNWATCH_THROTTLE_SECS") {
            let secs: f64 = raw
                .parse()
                .map_err(|_| anyhow!("SIGNWATCH_THROTTLE_SECS must be a number of seconds"))?;
            self.relay.throttle = seconds("SIGNWATCH_THROTTLE_SECS", secs)?;
        }
        if let Some(raw) = non_empty_env("SIGNWATCH_SIGN_TIMEOUT_SECS") {
            let secs: f64 = raw.parse().map_err(|_| {
                anyhow!("SIGNWATCH_SIGN_TIMEOUT_SECS must be a number of seconds")
            })?;
            self.relay.timeout = seconds("SIGNWATCH_SIGN_TIMEOUT_SECS", secs)?;
        }
        if let Some(raw) = non_empty_env("SIGNWATCH_REPORT_TIMEOUT_SECS") {
            let secs: f64 = raw.parse().map_err(|_| {
                anyhow!("SIGNWATCH_REPORT_TIMEOUT_SECS must be a number of seconds")
            })?;
            self.backend.timeout = seconds("SIGNWATCH_REPORT_TIMEOUT_SECS", secs)?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(addr) = &overrides.api_addr {
            self.api_addr = addr.clone();
        }
        if let Some(url) = &overrides.backend_url {
            self.backend.url = url.clone();
        }
        if let Some(url) = &overrides.sign_url {
            self.relay.sign_url = url.clone();
        }
        if let Some(id) = &overrides.vehicle_id {
            self.vehicle_id = id.clone();
        }
        if let Some(secs) = overrides.throttle_secs {
            self.relay.throttle = seconds("--throttle-secs", secs)?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        validate_http_url("backend url", &self.backend.url)?;
        validate_http_url("sign update url", &self.relay.sign_url)?;
        self.vehicle_id = self.vehicle_id.trim().to_string();
        if self.vehicle_id.is_empty() {
            return Err(anyhow!("vehicle_id must not be empty"));
        }
        if self.backend.timeout.is_zero() {
            return Err(anyhow!("backend timeout must be greater than zero"));
        }
        if self.relay.timeout.is_zero() {
            return Err(anyhow!("sign update timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SignwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(anyhow!("{} must be a finite, non-negative number", field));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_http_url(what: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| anyhow!("invalid {} '{}': {}", what, raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("{} '{}' must use http or https, not {}", what, raw, other)),
    }
}
