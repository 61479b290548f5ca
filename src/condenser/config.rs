use crate::condenser::paths::CondenserPaths;
use crate::condenser::rules::{Blacklist, RuleSet};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

pub const DEFAULT_SUMMARY_PROMPT: &str =
    "请用简洁的中文总结以上对话的主要内容，保留关键信息和角色行为。";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            temperature: 0.7,
            max_tokens: 2000,
            request_timeout_secs: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    pub prompt: String,
    pub max_messages: usize,
    pub auto_summarize: bool,
    pub trigger_interval: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
            max_messages: 20,
            auto_summarize: false,
            trigger_interval: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HideConfig {
    pub auto_hide: bool,
    pub keep_visible: usize,
}

impl Default for HideConfig {
    fn default() -> Self {
        Self {
            auto_hide: false,
            keep_visible: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub enabled: bool,
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub blacklist: Blacklist,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rules: RuleSet::default(),
            blacklist: Blacklist::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    pub settle_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            settle_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldInfoConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: String,
    pub book_name: String,
    /// When set, the book is bound to this chat after each successful
    /// write so the host injects its entries into future prompts.
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CondenserConfig {
    pub api: ApiConfig,
    pub summarize: SummarizeConfig,
    pub hide: HideConfig,
    pub extraction: ExtractionConfig,
    pub watch: WatchConfig,
    pub world_info: WorldInfoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCondenserConfig {
    api: Option<ApiConfig>,
    summarize: Option<SummarizeConfig>,
    hide: Option<HideConfig>,
    extraction: Option<ExtractionConfig>,
    watch: Option<WatchConfig>,
    world_info: Option<WorldInfoConfig>,
}

/// Endpoint and key mirrored into a separate file so the main config can
/// be shared or committed without credentials in it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
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

fn validate(cfg: &CondenserConfig) -> Result<()> {
    if cfg.summarize.max_messages == 0 {
        return Err(anyhow!("invalid max messages: must be >= 1"));
    }
    if cfg.summarize.trigger_interval == 0 {
        return Err(anyhow!("invalid trigger interval: must be >= 1"));
    }
    if !(cfg.api.temperature >= 0.0 && cfg.api.temperature <= 2.0) {
        return Err(anyhow!("invalid temperature: require 0.0 <= t <= 2.0"));
    }
    if cfg.api.max_tokens == 0 {
        return Err(anyhow!("invalid max tokens: must be >= 1"));
    }
    if cfg.api.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.watch.poll_interval_secs == 0 {
        return Err(anyhow!("invalid watch poll interval: must be >= 1 second"));
    }
    if cfg.world_info.enabled && cfg.world_info.endpoint.trim().is_empty() {
        return Err(anyhow!("world info enabled but endpoint is empty"));
    }
    Ok(())
}

fn merge_file_config(paths: &CondenserPaths, base: &mut CondenserConfig) -> Result<()> {
    let path = &paths.config_file;
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PartialCondenserConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(api) = parsed.api {
        base.api = api;
    }
    if let Some(summarize) = parsed.summarize {
        base.summarize = summarize;
    }
    if let Some(hide) = parsed.hide {
        base.hide = hide;
    }
    if let Some(extraction) = parsed.extraction {
        base.extraction = extraction;
    }
    if let Some(watch) = parsed.watch {
        base.watch = watch;
    }
    if let Some(world_info) = parsed.world_info {
        base.world_info = world_info;
    }
    Ok(())
}

fn overlay_credentials(paths: &CondenserPaths, base: &mut CondenserConfig) {
    let Some(creds) = load_credentials(paths) else {
        return;
    };
    if !creds.endpoint.trim().is_empty() {
        base.api.endpoint = creds.endpoint;
    }
    if !creds.api_key.trim().is_empty() {
        base.api.api_key = creds.api_key;
    }
}

pub fn load_credentials(paths: &CondenserPaths) -> Option<Credentials> {
    let raw = fs::read_to_string(&paths.credentials_file).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_credentials(paths: &CondenserPaths, creds: &Credentials) -> Result<()> {
    if let Some(parent) = paths.credentials_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(creds)?;
    fs::write(&paths.credentials_file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", paths.credentials_file.display()))?;
    Ok(())
}

/// Defaults plus the TOML file only, without env overrides or the
/// credentials overlay. Commands that mutate and re-save the config use
/// this so session-local env values never leak into the file.
pub fn load_file_config(paths: &CondenserPaths) -> Result<CondenserConfig> {
    let mut cfg = CondenserConfig::default();
    merge_file_config(paths, &mut cfg)?;
    Ok(cfg)
}

pub fn load_config(paths: &CondenserPaths) -> Result<CondenserConfig> {
    let mut cfg = CondenserConfig::default();
    merge_file_config(paths, &mut cfg)?;
    overlay_credentials(paths, &mut cfg);

    cfg.api.endpoint = env_or_string("CONDENSER_API_ENDPOINT", &cfg.api.endpoint);
    cfg.api.api_key = env_or_string("CONDENSER_API_KEY", &cfg.api.api_key);
    cfg.api.model = env_or_string("CONDENSER_MODEL", &cfg.api.model);
    cfg.api.temperature = env_or_f64("CONDENSER_TEMPERATURE", cfg.api.temperature);
    cfg.api.request_timeout_secs = env_or_u64(
        "CONDENSER_REQUEST_TIMEOUT_SECS",
        cfg.api.request_timeout_secs,
    );
    cfg.summarize.max_messages =
        env_or_usize("CONDENSER_MAX_MESSAGES", cfg.summarize.max_messages);
    cfg.summarize.auto_summarize =
        env_or_bool("CONDENSER_AUTO_SUMMARIZE", cfg.summarize.auto_summarize);
    cfg.summarize.trigger_interval =
        env_or_usize("CONDENSER_TRIGGER_INTERVAL", cfg.summarize.trigger_interval);
    cfg.hide.auto_hide = env_or_bool("CONDENSER_AUTO_HIDE", cfg.hide.auto_hide);
    cfg.hide.keep_visible = env_or_usize("CONDENSER_KEEP_VISIBLE", cfg.hide.keep_visible);
    cfg.extraction.enabled = env_or_bool("CONDENSER_USE_EXTRACTION", cfg.extraction.enabled);
    cfg.watch.poll_interval_secs =
        env_or_u64("CONDENSER_POLL_INTERVAL_SECS", cfg.watch.poll_interval_secs);
    cfg.watch.settle_delay_ms =
        env_or_u64("CONDENSER_SETTLE_DELAY_MS", cfg.watch.settle_delay_ms);
    cfg.world_info.enabled = env_or_bool("CONDENSER_WORLD_INFO_ENABLED", cfg.world_info.enabled);

    validate(&cfg)?;
    Ok(cfg)
}

pub fn save_config(paths: &CondenserPaths, cfg: &CondenserConfig) -> Result<()> {
    if let Some(parent) = paths.config_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg)?;
    fs::write(&paths.config_file, data)
        .with_context(|| format!("failed to write {}", paths.config_file.display()))?;
    Ok(())
}
