//! `tutorbridge config`: Configuration management commands.

use tutorbridge_config::{AppConfig, ConfigError};

pub fn validate(loaded: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");
    println!("   File: {}", AppConfig::config_path().display());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Model:      {}", config.model.name);
    println!("   Server:     {}", config.bind_addr());
    println!("   Depth:      {}", config.context.max_depth);
    println!("   Resources:  {} keywords", config.resources.len());

    Ok(())
}

/// Problems that do not stop the server from starting.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (GEMINI_API_KEY or GOOGLE_API_KEY); /ask will answer 503");
    }
    if config.resources.is_empty() {
        warnings.push("Resource table is empty; no study links will be appended");
    }
    if config.server.allowed_origins.iter().any(|o| o == "*") {
        warnings.push("CORS allows any origin");
    }
    warnings
}

pub fn show(config: &AppConfig, defaults: bool) -> Result<(), Box<dyn std::error::Error>> {
    if defaults {
        println!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
