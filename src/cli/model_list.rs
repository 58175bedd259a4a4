//! Model listing functionality
//!
//! Prints the models installed on the resolved Ollama host.

use std::error::Error;

use chrono::DateTime;

use crate::api::models::{fetch_models, sort_models};
use crate::api::ModelInfo;
use crate::core::app::listing_failure_message;
use crate::core::config::Config;

pub async fn list_models(host: Option<String>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let host = config.resolve_host(host.as_deref());

    println!("🤖 Available Models on {host}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Default model: {default_model} (from config)");
        println!();
    }

    let client = reqwest::Client::new();
    let response = fetch_models(&client, &host)
        .await
        .map_err(|err| listing_failure_message(&host, &err.to_string()))?;

    if response.models.is_empty() {
        println!("No models installed. Pull one with 'ollama pull <model>'.");
        return Ok(());
    }

    println!(
        "Found {} models (sorted newest first):",
        response.models.len()
    );
    println!();

    let mut models = response.models;
    sort_models(&mut models);
    for model in &models {
        for line in describe_model(model) {
            println!("{line}");
        }
        println!();
    }

    Ok(())
}

fn describe_model(model: &ModelInfo) -> Vec<String> {
    let mut lines = vec![format!("  • {}", model.id())];
    if let Some(details) = &model.details {
        let summary: Vec<&str> = [
            details.family.as_deref(),
            details.parameter_size.as_deref(),
            details.quantization_level.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
        if !summary.is_empty() {
            lines.push(format!("    Details: {}", summary.join(", ")));
        }
    }
    if let Some(size) = model.size.filter(|size| *size > 0) {
        lines.push(format!("    Size: {}", format_size(size)));
    }
    if let Some(modified) = model.modified_at.as_deref().filter(|m| !m.is_empty()) {
        let shown = DateTime::parse_from_rfc3339(modified)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| modified.to_string());
        lines.push(format!("    Modified: {shown}"));
    }
    lines
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
