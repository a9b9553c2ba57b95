//! Loader for webpilot configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: an optional `webpilot.yaml`, environment
//! variables prefixed with `WEBPILOT__` (double underscore separates
//! sections, e.g. `WEBPILOT__AGENT__MAX_ITERATIONS`), then the documented
//! plain variables (`LLM_PROVIDER`, `GLM_API_KEY`, `OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `MAX_ITERATIONS`, `WEBPILOT_WEBDRIVER_URL`).
//! String values support recursive `${VAR}` expansion.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// How many times one string may be re-expanded before we assume a cycle.
const ENV_EXPANSION_PASSES: usize = 8;

/// Top-level runtime configuration.
#[derive(Debug, Deserialize)]
pub struct WebpilotConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub browser: BrowserSection,
}

/// Which LLM backend answers the agent's tool-call requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Glm,
    #[serde(rename = "openai")]
    OpenAi,
    /// Reserved; selecting it is a configuration error for now.
    Claude,
}

impl ProviderKind {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "glm" => Ok(Self::Glm),
            "openai" => Ok(Self::OpenAi),
            "claude" => Ok(Self::Claude),
            other => Err(ConfigError::Message(format!(
                "unknown LLM provider '{other}' (expected glm, openai or claude)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    /// Provider default is used when unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub glm_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Raw-message window width for the conversation context.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    /// Token budget for the conversation context before compression.
    #[serde(default = "default_context_token_budget")]
    pub context_token_budget: usize,
    /// Token budget for one page snapshot.
    #[serde(default = "default_snapshot_token_budget")]
    pub snapshot_token_budget: usize,
}

#[derive(Debug, Deserialize)]
pub struct BrowserSection {
    /// Browser profile directory persisted across runs (cookies, sessions).
    #[serde(default = "default_user_data_dir")]
    pub user_data_dir: PathBuf,
    /// Chromedriver endpoint.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Glm
}
fn default_max_iterations() -> usize {
    50
}
fn default_max_history_messages() -> usize {
    10
}
fn default_context_token_budget() -> usize {
    8000
}
fn default_snapshot_token_budget() -> usize {
    6000
}
fn default_user_data_dir() -> PathBuf {
    PathBuf::from(".webpilot-profile")
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            glm_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_history_messages: default_max_history_messages(),
            context_token_budget: default_context_token_budget(),
            snapshot_token_budget: default_snapshot_token_budget(),
        }
    }
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            user_data_dir: default_user_data_dir(),
            webdriver_url: default_webdriver_url(),
        }
    }
}

impl WebpilotConfig {
    /// The API key that belongs to the selected provider, if any was given.
    pub fn active_api_key(&self) -> Option<&str> {
        match self.llm.provider {
            ProviderKind::Glm => self.llm.glm_api_key.as_deref(),
            ProviderKind::OpenAi => self.llm.openai_api_key.as_deref(),
            ProviderKind::Claude => self.llm.anthropic_api_key.as_deref(),
        }
    }
}

/// Walk the merged config tree and expand `${VAR}` placeholders in every
/// string leaf. Iterative with an explicit worklist; config trees are
/// user-supplied and their depth should not dictate our stack depth.
fn expand_env_in_tree(root: &mut Value) {
    let mut pending = vec![root];
    while let Some(value) = pending.pop() {
        match value {
            Value::String(s) => expand_env_in_str(s),
            Value::Array(items) => pending.extend(items.iter_mut()),
            Value::Object(map) => pending.extend(map.values_mut()),
            _ => {}
        }
    }
}

/// Re-expand until the string stops changing. Values that reference other
/// `${VAR}` placeholders get multiple passes; unknown variables (and
/// cycles, via the pass cap) leave the string as it stands.
fn expand_env_in_str(s: &mut String) {
    if !s.contains('$') {
        return;
    }
    for _ in 0..ENV_EXPANSION_PASSES {
        let expanded = match shellexpand::env(s.as_str()) {
            Ok(cow) => cow.into_owned(),
            Err(_) => return,
        };
        if expanded == *s {
            return;
        }
        *s = expanded;
    }
}

/// The documented plain environment variables win over every file source.
fn apply_plain_env(cfg: &mut WebpilotConfig) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var("LLM_PROVIDER") {
        cfg.llm.provider = ProviderKind::parse(&raw)?;
    }
    if let Ok(key) = std::env::var("GLM_API_KEY") {
        cfg.llm.glm_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        cfg.llm.openai_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        cfg.llm.anthropic_api_key = Some(key);
    }
    if let Ok(raw) = std::env::var("MAX_ITERATIONS") {
        cfg.agent.max_iterations = raw.trim().parse().map_err(|_| {
            ConfigError::Message(format!("MAX_ITERATIONS is not a number: '{raw}'"))
        })?;
    }
    if let Ok(url) = std::env::var("WEBPILOT_WEBDRIVER_URL") {
        cfg.browser.webdriver_url = url;
    }
    Ok(())
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct WebpilotConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for WebpilotConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WebpilotConfigLoader {
    /// Start with the default sources: `WEBPILOT__` env overrides only.
    ///
    /// ```
    /// use webpilot_config::WebpilotConfigLoader;
    ///
    /// let config = WebpilotConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.agent.max_iterations, 50);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("WEBPILOT").separator("__"));
        Self { builder }
    }

    /// Attach a config file; missing files are tolerated so a bare
    /// environment-only deployment works.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded before typing, and the documented
    /// plain environment variables are applied last.
    ///
    /// ```
    /// use webpilot_config::{ProviderKind, WebpilotConfigLoader};
    ///
    /// temp_env::with_var("MY_KEY", Some("injected-from-env"), || {
    ///     let config = WebpilotConfigLoader::new()
    ///         .with_yaml_str(
    ///             r#"
    /// llm:
    ///   provider: "openai"
    ///   openai_api_key: "${MY_KEY}"
    /// "#,
    ///         )
    ///         .load()
    ///         .expect("valid configuration");
    ///
    ///     assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    ///     assert_eq!(config.llm.openai_api_key.as_deref(), Some("injected-from-env"));
    /// });
    /// ```
    pub fn load(self) -> Result<WebpilotConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_tree(&mut v);

        let mut typed: WebpilotConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        apply_plain_env(&mut typed)?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expansion_reaches_every_string_leaf() {
        temp_env::with_var("WP_TOKEN", Some("tok-123"), || {
            let mut v = json!({
                "llm": { "glm_api_key": "${WP_TOKEN}" },
                "extras": ["${WP_TOKEN}", 42, null, { "deep": "x-${WP_TOKEN}" }]
            });
            expand_env_in_tree(&mut v);
            assert_eq!(v["llm"]["glm_api_key"], json!("tok-123"));
            assert_eq!(v["extras"][0], json!("tok-123"));
            assert_eq!(v["extras"][3]["deep"], json!("x-tok-123"));
        });
    }

    #[test]
    fn chained_references_need_multiple_passes() {
        temp_env::with_vars(
            [
                ("WP_INNER", Some("qux")),
                ("WP_OUTER", Some("mid-${WP_INNER}")),
            ],
            || {
                let mut s = "start-${WP_OUTER}-end".to_string();
                expand_env_in_str(&mut s);
                assert_eq!(s, "start-mid-qux-end");
            },
        );
    }

    #[test]
    fn cyclic_references_terminate_unresolved() {
        temp_env::with_vars([("WP_A", Some("${WP_B}")), ("WP_B", Some("${WP_A}"))], || {
            let mut s = "x=${WP_A}-y".to_string();
            expand_env_in_str(&mut s);
            // The pass cap ends the chase; the placeholder survives.
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut s = "hi-${DOES_NOT_EXIST}".to_string();
        expand_env_in_str(&mut s);
        assert_eq!(s, "hi-${DOES_NOT_EXIST}");
    }

    #[test]
    fn defaults_apply_with_empty_sources() {
        temp_env::with_vars(
            [
                ("LLM_PROVIDER", None::<&str>),
                ("MAX_ITERATIONS", None),
                ("WEBPILOT_WEBDRIVER_URL", None),
            ],
            || {
                let cfg = WebpilotConfigLoader::new()
                    .with_yaml_str("version: '1'")
                    .load()
                    .unwrap();
                assert_eq!(cfg.llm.provider, ProviderKind::Glm);
                assert_eq!(cfg.agent.max_iterations, 50);
                assert_eq!(cfg.agent.max_history_messages, 10);
                assert_eq!(cfg.agent.context_token_budget, 8000);
                assert_eq!(cfg.agent.snapshot_token_budget, 6000);
                assert_eq!(cfg.browser.webdriver_url, "http://localhost:9515");
                assert_eq!(
                    cfg.browser.user_data_dir,
                    PathBuf::from(".webpilot-profile")
                );
            },
        );
    }

    #[test]
    fn plain_env_wins_over_yaml() {
        temp_env::with_vars(
            [
                ("LLM_PROVIDER", Some("openai")),
                ("OPENAI_API_KEY", Some("sk-test")),
                ("MAX_ITERATIONS", Some("7")),
            ],
            || {
                let cfg = WebpilotConfigLoader::new()
                    .with_yaml_str(
                        r#"
llm:
  provider: "glm"
agent:
  max_iterations: 50
"#,
                    )
                    .load()
                    .unwrap();
                assert_eq!(cfg.llm.provider, ProviderKind::OpenAi);
                assert_eq!(cfg.active_api_key(), Some("sk-test"));
                assert_eq!(cfg.agent.max_iterations, 7);
            },
        );
    }

    #[test]
    fn bad_provider_is_a_config_error() {
        temp_env::with_var("LLM_PROVIDER", Some("grok"), || {
            let err = WebpilotConfigLoader::new()
                .with_yaml_str("version: '1'")
                .load()
                .unwrap_err();
            assert!(err.to_string().contains("unknown LLM provider"));
        });
    }

    #[test]
    fn bad_max_iterations_is_a_config_error() {
        temp_env::with_vars(
            [("LLM_PROVIDER", None::<&str>), ("MAX_ITERATIONS", Some("lots"))],
            || {
                let err = WebpilotConfigLoader::new()
                    .with_yaml_str("version: '1'")
                    .load()
                    .unwrap_err();
                assert!(err.to_string().contains("MAX_ITERATIONS"));
            },
        );
    }
}
