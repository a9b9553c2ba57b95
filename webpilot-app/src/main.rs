use std::io::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use webpilot_agent::{Agent, AgentConfig, BrowserSurface, UserPrompt};
use webpilot_browser::{BrowserConfig, BrowserManager};
use webpilot_common::observability::{init_logging, LogConfig};
use webpilot_config::{ProviderKind, WebpilotConfig, WebpilotConfigLoader};
use webpilot_llm::traits::LlmClient;
use webpilot_llm::{client_from_config, ProviderConfig};

const SEPARATOR: &str = "────────────────────────────────────────────────────────";

/// Line-oriented console shared by the REPL, ask_user relays and
/// destructive-action confirmations.
struct Console {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        self.lines.lock().await.next_line().await.ok().flatten()
    }
}

#[async_trait]
impl UserPrompt for Console {
    async fn confirm(&self, prompt: &str) -> String {
        self.read_line(&format!("\n{prompt}")).await.unwrap_or_default()
    }

    async fn ask(&self, question: &str) -> String {
        self.read_line(&format!("\n[agent asks] {question}\n> "))
            .await
            .unwrap_or_default()
    }
}

fn provider_config(cfg: &WebpilotConfig) -> Result<ProviderConfig> {
    let model = cfg.llm.model.clone();
    match cfg.llm.provider {
        ProviderKind::Glm => {
            let api_key = cfg
                .llm
                .glm_api_key
                .clone()
                .context("GLM_API_KEY is required when LLM_PROVIDER=glm")?;
            Ok(ProviderConfig::Glm { api_key, model })
        }
        ProviderKind::OpenAi => {
            let api_key = cfg
                .llm
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required when LLM_PROVIDER=openai")?;
            Ok(ProviderConfig::OpenAi {
                api_key,
                model,
                base_url: None,
            })
        }
        ProviderKind::Claude => {
            if cfg.llm.anthropic_api_key.is_none() {
                bail!("ANTHROPIC_API_KEY is required when LLM_PROVIDER=claude");
            }
            Ok(ProviderConfig::Claude)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = WebpilotConfigLoader::new().with_file("webpilot.yaml").load()?;
    let log_path = init_logging(LogConfig::default())?;

    let llm = client_from_config(&provider_config(&cfg)?)?;

    let browser = Arc::new(
        BrowserManager::launch(&BrowserConfig {
            webdriver_url: cfg.browser.webdriver_url.clone(),
            user_data_dir: cfg.browser.user_data_dir.clone(),
        })
        .await?,
    );

    println!("{SEPARATOR}");
    println!("webpilot - natural-language browser automation");
    println!("model: {}   log: {}", llm.model_name(), log_path.display());
    println!("Type a task, or quit/exit (or an empty line) to leave.");
    println!("{SEPARATOR}");

    let console = Arc::new(Console::new());
    let agent_config = AgentConfig {
        max_iterations: cfg.agent.max_iterations,
        max_history_messages: cfg.agent.max_history_messages,
        context_token_budget: cfg.agent.context_token_budget,
    };

    loop {
        let Some(line) = console.read_line("\ntask> ").await else {
            break;
        };
        let task = line.trim().to_string();
        if task.is_empty() || task == "quit" || task == "exit" {
            break;
        }

        tracing::info!(target: "app.task", task = %task, "starting run");
        println!("{SEPARATOR}");

        let surface = BrowserSurface::new(
            browser.clone(),
            console.clone(),
            cfg.agent.snapshot_token_budget,
        );
        let mut agent = Agent::new(
            llm.clone(),
            Box::new(surface),
            console.clone(),
            agent_config.clone(),
        );

        let summary = agent.run(&task).await;

        println!("{SEPARATOR}");
        println!("{summary}");
        println!("{SEPARATOR}");
    }

    if let Ok(browser) = Arc::try_unwrap(browser) {
        let _ = browser.close().await;
    }
    println!("Bye.");
    Ok(())
}
