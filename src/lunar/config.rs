use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub delay_min_secs: f64,
    pub delay_max_secs: f64,
    pub timeout_secs: u64,
    pub max_retries: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            delay_min_secs: 1.0,
            delay_max_secs: 2.0,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub primary_base_url: String,
    pub secondary_base_url: String,
    pub secondary_enabled: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary_base_url: "https://lichngaytot.com".to_string(),
            secondary_base_url: "https://xemngay.com".to_string(),
            secondary_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub node_bin: String,
    pub timeout_secs: u64,
    pub enabled: bool,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            node_bin: "node".to_string(),
            timeout_secs: 30,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub strict_month: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FengshuiConfig {
    pub fetch: FetchConfig,
    pub sources: SourcesConfig,
    pub reference: ReferenceConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialFengshuiConfig {
    fetch: Option<FetchConfig>,
    sources: Option<SourcesConfig>,
    reference: Option<ReferenceConfig>,
    validation: Option<ValidationConfig>,
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn validate(cfg: &FengshuiConfig) -> Result<()> {
    let fetch = &cfg.fetch;
    if fetch.delay_min_secs < 0.0 || fetch.delay_max_secs < 0.0 {
        return Err(anyhow!("invalid fetch delay: delays cannot be negative"));
    }
    if fetch.delay_min_secs > fetch.delay_max_secs {
        return Err(anyhow!(
            "invalid fetch delay: require delay_min_secs <= delay_max_secs"
        ));
    }
    if fetch.timeout_secs == 0 {
        return Err(anyhow!("invalid fetch timeout: must be >= 1 second"));
    }
    if fetch.max_retries == 0 {
        return Err(anyhow!("invalid fetch max retries: must be >= 1"));
    }
    if cfg.sources.primary_base_url.trim().is_empty() {
        return Err(anyhow!("invalid primary base url: cannot be empty"));
    }
    if cfg.sources.secondary_base_url.trim().is_empty() {
        return Err(anyhow!("invalid secondary base url: cannot be empty"));
    }
    if cfg.reference.timeout_secs == 0 {
        return Err(anyhow!("invalid reference timeout: must be >= 1 second"));
    }
    if cfg.reference.node_bin.trim().is_empty() {
        return Err(anyhow!("invalid reference node bin: cannot be empty"));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("FENGSHUI_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".fengshui").join("fengshui.toml"))
}

fn merge_file_config(base: &mut FengshuiConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialFengshuiConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse fengshui config {}: {err}", path.display()))?;
    if let Some(fetch) = parsed.fetch {
        base.fetch = fetch;
    }
    if let Some(sources) = parsed.sources {
        base.sources = sources;
    }
    if let Some(reference) = parsed.reference {
        base.reference = reference;
    }
    if let Some(validation) = parsed.validation {
        base.validation = validation;
    }
    Ok(())
}

pub fn load_config() -> Result<FengshuiConfig> {
    let mut cfg = FengshuiConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.fetch.delay_min_secs = env_or_f64("FENGSHUI_FETCH_DELAY_MIN_SECS", cfg.fetch.delay_min_secs);
    cfg.fetch.delay_max_secs = env_or_f64("FENGSHUI_FETCH_DELAY_MAX_SECS", cfg.fetch.delay_max_secs);
    cfg.fetch.timeout_secs = env_or_u64("FENGSHUI_FETCH_TIMEOUT_SECS", cfg.fetch.timeout_secs);
    cfg.fetch.max_retries = env_or_u64("FENGSHUI_FETCH_MAX_RETRIES", cfg.fetch.max_retries);
    cfg.fetch.user_agent = env_or_string("FENGSHUI_USER_AGENT", &cfg.fetch.user_agent);
    cfg.sources.primary_base_url =
        env_or_string("FENGSHUI_PRIMARY_BASE_URL", &cfg.sources.primary_base_url);
    cfg.sources.secondary_base_url =
        env_or_string("FENGSHUI_SECONDARY_BASE_URL", &cfg.sources.secondary_base_url);
    cfg.sources.secondary_enabled =
        env_or_bool("FENGSHUI_SECONDARY_ENABLED", cfg.sources.secondary_enabled);
    cfg.reference.node_bin = env_or_string("FENGSHUI_NODE_BIN", &cfg.reference.node_bin);
    cfg.reference.timeout_secs =
        env_or_u64("FENGSHUI_REFERENCE_TIMEOUT_SECS", cfg.reference.timeout_secs);
    cfg.reference.enabled = env_or_bool("FENGSHUI_REFERENCE_ENABLED", cfg.reference.enabled);
    cfg.validation.strict_month =
        env_or_bool("FENGSHUI_STRICT_MONTH", cfg.validation.strict_month);

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = FengshuiConfig::default();
        validate(&cfg).expect("defaults validate");
        assert_eq!(cfg.reference.timeout_secs, 30);
        assert!(!cfg.validation.strict_month);
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let mut cfg = FengshuiConfig::default();
        cfg.fetch.delay_min_secs = 3.0;
        cfg.fetch.delay_max_secs = 1.0;
        let err = validate(&cfg).expect_err("inverted range");
        assert!(err.to_string().contains("delay_min_secs"));
    }

    #[test]
    fn zero_retries_and_empty_urls_are_rejected() {
        let mut cfg = FengshuiConfig::default();
        cfg.fetch.max_retries = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = FengshuiConfig::default();
        cfg.sources.primary_base_url = "  ".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn partial_sections_keep_defaults_for_missing_keys() {
        let parsed: PartialFengshuiConfig = toml::from_str(
            "[fetch]\ndelay_max_secs = 4.5\n\n[validation]\nstrict_month = true\n",
        )
        .expect("parse");
        let fetch = parsed.fetch.expect("fetch section");
        assert_eq!(fetch.delay_max_secs, 4.5);
        assert_eq!(fetch.max_retries, 3);
        assert!(parsed.sources.is_none());
        assert!(parsed.validation.expect("validation").strict_month);
    }
}
