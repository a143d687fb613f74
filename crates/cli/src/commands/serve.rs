//! `tutorbridge serve`: Start the HTTP webhook server.

use tutorbridge_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("📚 TutorBridge");
    println!("   Listening: {}", config.bind_addr());
    println!("   Model:     {}", config.model.name);
    if !config.has_api_key() {
        println!("   ⚠️  No API key set (GEMINI_API_KEY); /ask will answer 503");
    }

    tutorbridge_gateway::start(config).await?;

    Ok(())
}
