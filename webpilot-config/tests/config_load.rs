use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use webpilot_config::{ProviderKind, WebpilotConfigLoader};

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_yaml_file_with_env_expansion() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
llm:
  provider: openai
  model: "gpt-4o-mini"
  openai_api_key: "${WEBPILOT_TEST_KEY}"
agent:
  max_iterations: 25
browser:
  webdriver_url: "http://localhost:4444"
  "#;
    let p = write_yaml(&tmp, "webpilot.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("WEBPILOT_TEST_KEY", Some("sk-from-env")),
            ("LLM_PROVIDER", None),
            ("MAX_ITERATIONS", None),
            ("WEBPILOT_WEBDRIVER_URL", None),
        ],
        || {
            let config = WebpilotConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.llm.provider, ProviderKind::OpenAi);
            assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
            assert_eq!(config.active_api_key(), Some("sk-from-env"));
            assert_eq!(config.agent.max_iterations, 25);
            assert_eq!(config.browser.webdriver_url, "http://localhost:4444");
        },
    );
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    temp_env::with_vars(
        [
            ("LLM_PROVIDER", None::<&str>),
            ("MAX_ITERATIONS", None),
            ("WEBPILOT_WEBDRIVER_URL", None),
        ],
        || {
            let config = WebpilotConfigLoader::new()
                .with_file("does-not-exist.yaml")
                .load()
                .expect("env-only deployments are fine");

            assert_eq!(config.llm.provider, ProviderKind::Glm);
            assert_eq!(config.agent.max_iterations, 50);
        },
    );
}
