//! Models command handler.

use clap::Args;
use heyrag_core::{config::AppConfig, AppResult};

use crate::services;

/// List installed chat models
#[derive(Args, Debug)]
pub struct ModelsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing models command");

        let client = services::chat_model(config)?;
        let mut models = Vec::new();
        for name in client.list_models().await? {
            models.push(client.model_info(&name).await?);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&models)?);
            return Ok(());
        }

        if models.is_empty() {
            println!("No chat models installed at {}", config.ollama.url);
            return Ok(());
        }

        for model in &models {
            let marker = if model.name == config.ollama.model { "*" } else { " " };
            println!("{} {:<40} {:>8}", marker, model.name, model.num_ctx);
        }

        Ok(())
    }
}
