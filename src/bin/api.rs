use finance_assistant::{
    api::start_server, gemini::GeminiClient, market::YahooFinanceClient,
    orchestrator::Orchestrator, voice::ElevenLabsClient,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Finance Assistant - API Server");
    info!("Port: {}", api_port);

    // Provider clients; API credentials arrive per request.
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(GeminiClient::from_env()),
        Arc::new(YahooFinanceClient::from_env()),
        Arc::new(ElevenLabsClient::from_env()),
    ));

    info!("Orchestrator initialized");

    start_server(orchestrator, api_port).await?;

    Ok(())
}
