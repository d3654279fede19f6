//! TOML configuration parsing.
//!
//! Every section has defaults, so an empty file (or [`Config::minimal`])
//! yields a working dashboard for the built-in brand. The per-run values the
//! user types into the dashboard form override `[brand]` and `[analysis]`
//! for that run only; nothing here is written back.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Smallest and largest accepted queries-per-category values.
pub const MIN_QUERIES_PER_CATEGORY: usize = 2;
pub const MAX_QUERIES_PER_CATEGORY: usize = 5;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub brand: BrandConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fallback credential used when the form field is left blank.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted after `api_key`.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrandConfig {
    #[serde(default = "default_brand_name")]
    pub name: String,
    #[serde(default = "default_brand_domain")]
    pub domain: String,
    /// Extra spellings that also count as a mention (e.g. "Masaba").
    #[serde(default = "default_brand_aliases")]
    pub aliases: Vec<String>,
    #[serde(default = "default_market")]
    pub market: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            domain: default_brand_domain(),
            aliases: default_brand_aliases(),
            market: default_market(),
        }
    }
}

fn default_brand_name() -> String {
    "House of Masaba".to_string()
}
fn default_brand_domain() -> String {
    "houseofmasaba.com".to_string()
}
fn default_brand_aliases() -> Vec<String> {
    vec!["Masaba".to_string()]
}
fn default_market() -> String {
    "India".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_preset_categories")]
    pub preset_categories: String,
    #[serde(default = "default_queries_per_category")]
    pub queries_per_category: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            preset_categories: default_preset_categories(),
            queries_per_category: default_queries_per_category(),
        }
    }
}

fn default_preset_categories() -> String {
    "designer print sarees, luxury silk kaftans, quirky bridal lehengas, \
     fusion pret wear for women, gold foil print anarkalis, luxury resort wear India, \
     designer fine jewellery, celebrity-inspired ethnic wear"
        .to_string()
}
fn default_queries_per_category() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Resolve the credential for a run: form value, then `llm.api_key`,
    /// then the `llm.api_key_env` variable. Blank values are skipped.
    pub fn resolve_api_key(&self, form_value: Option<&str>) -> Option<String> {
        let env_key = std::env::var(&self.llm.api_key_env).ok();
        let key = [form_value, self.llm.api_key.as_deref(), env_key.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
            .map(str::to_string);
        key
    }
}

pub fn is_valid_queries_per_category(n: usize) -> bool {
    (MIN_QUERIES_PER_CATEGORY..=MAX_QUERIES_PER_CATEGORY).contains(&n)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate a TOML document.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }

    if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://")
    {
        anyhow::bail!(
            "llm.base_url must start with http:// or https:// (got '{}')",
            config.llm.base_url
        );
    }

    if config.brand.name.trim().is_empty() {
        anyhow::bail!("brand.name must not be empty");
    }

    if !is_valid_queries_per_category(config.analysis.queries_per_category) {
        anyhow::bail!(
            "analysis.queries_per_category must be in [{}, {}]",
            MIN_QUERIES_PER_CATEGORY,
            MAX_QUERIES_PER_CATEGORY
        );
    }

    Ok(config)
}

/// Example configuration written by `aeo init`.
pub const EXAMPLE_CONFIG: &str = r#"# AEO visibility dashboard configuration.

[llm]
model = "gpt-4o-mini"
base_url = "https://api.openai.com"
timeout_secs = 60
# api_key = "sk-..."   # optional; the api_key_env variable is used when unset
api_key_env = "OPENAI_API_KEY"

[brand]
name = "House of Masaba"
domain = "houseofmasaba.com"
aliases = ["Masaba"]
market = "India"

[analysis]
preset_categories = "designer print sarees, luxury silk kaftans, quirky bridal lehengas, fusion pret wear for women, gold foil print anarkalis, luxury resort wear India, designer fine jewellery, celebrity-inspired ethnic wear"
queries_per_category = 3

[server]
bind = "127.0.0.1:8501"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.brand.name, "House of Masaba");
        assert_eq!(cfg.brand.aliases, vec!["Masaba".to_string()]);
        assert_eq!(cfg.analysis.queries_per_category, 3);
        assert_eq!(cfg.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn example_config_parses() {
        let cfg = parse_config(EXAMPLE_CONFIG).unwrap();
        assert_eq!(cfg.brand.market, "India");
        assert!(cfg.analysis.preset_categories.contains("luxury silk kaftans"));
    }

    #[test]
    fn rejects_out_of_range_queries_per_category() {
        let err = parse_config("[analysis]\nqueries_per_category = 6\n").unwrap_err();
        assert!(err.to_string().contains("queries_per_category"));
        assert!(parse_config("[analysis]\nqueries_per_category = 1\n").is_err());
        assert!(parse_config("[analysis]\nqueries_per_category = 5\n").is_ok());
    }

    #[test]
    fn rejects_zero_timeout_and_bad_url() {
        assert!(parse_config("[llm]\ntimeout_secs = 0\n").is_err());
        assert!(parse_config("[llm]\nbase_url = \"api.openai.com\"\n").is_err());
    }

    #[test]
    fn form_key_wins_over_config_key() {
        let mut cfg = Config::minimal();
        cfg.llm.api_key = Some("from-config".to_string());
        assert_eq!(
            cfg.resolve_api_key(Some("  from-form ")).as_deref(),
            Some("from-form")
        );
        assert_eq!(cfg.resolve_api_key(Some("   ")).as_deref(), Some("from-config"));
    }

    #[test]
    fn no_credential_anywhere_resolves_to_none() {
        let mut cfg = Config::minimal();
        cfg.llm.api_key_env = "AEO_CONFIG_TEST_KEY_NEVER_SET".to_string();
        assert_eq!(cfg.resolve_api_key(None), None);
        assert_eq!(cfg.resolve_api_key(Some("")), None);
    }

    #[test]
    fn env_variable_is_last_resort() {
        let mut cfg = Config::minimal();
        cfg.llm.api_key_env = "AEO_CONFIG_TEST_KEY_FROM_ENV".to_string();
        std::env::set_var("AEO_CONFIG_TEST_KEY_FROM_ENV", " from-env ");

        assert_eq!(cfg.resolve_api_key(None).as_deref(), Some("from-env"));
        assert_eq!(cfg.resolve_api_key(Some("from-form")).as_deref(), Some("from-form"));

        cfg.llm.api_key = Some("from-config".to_string());
        assert_eq!(cfg.resolve_api_key(Some(" ")).as_deref(), Some("from-config"));
    }
}
