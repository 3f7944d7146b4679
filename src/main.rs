mod agent;
mod browser;
mod cli;
mod config;
mod llm;
mod toolgen;
mod tools;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agent::transcript::Transcript;
use agent::Agent;
use cli::{format_goal, Cli, Command};
use config::AppConfig;
use llm::openai_compatible::OpenAiCompatibleClient;
use llm::{ChatClient, LlmSummarizer};
use toolgen::{InstanceArena, ToolRegistry, ToolRegistryBuilder};

async fn build_registry(config: &AppConfig, client: Arc<dyn ChatClient>) -> ToolRegistry {
    let arena = Arc::new(InstanceArena::new());
    let mut builder = ToolRegistryBuilder::new(arena.clone()).sources(tools::default_sources(
        arena,
        config.browser.user_data_dir.clone(),
        config.browser.debug,
    ));
    if config.agent.summarize_descriptions {
        builder = builder.summarizer(Arc::new(LlmSummarizer::new(
            client,
            config.llm.simple_model.clone(),
            config.llm.summary_max_tokens,
        )));
    }
    builder.build().await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    if let Command::InitConfig = cli.command {
        let path = AppConfig::save_default()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = AppConfig::load()?;
    let client: Arc<dyn ChatClient> = Arc::new(OpenAiCompatibleClient::new(
        config.api_key()?,
        config.llm.api_base.clone(),
    ));

    match cli.command {
        Command::Run { recipes, plan_only } => {
            let registry = build_registry(&config, client.clone()).await;
            let agent = Agent::new(client, registry, config);
            let goal = format_goal(&recipes);
            if plan_only {
                let plan = agent.plan(&goal).await?;
                println!("{}", plan);
            } else {
                let mut transcript = Transcript::new();
                agent.run(&goal, &mut transcript).await?;
            }
        }
        Command::Tools => {
            let registry = build_registry(&config, client).await;
            let mut names: Vec<&String> = registry.descriptions().keys().collect();
            names.sort();
            for name in names {
                println!("{}\n    {}\n", name, registry.descriptions()[name]);
            }
        }
        Command::InitConfig => unreachable!("handled above"),
    }

    Ok(())
}
