//! REST API server for the assistant
//!
//! Exposes the orchestration pipeline via HTTP endpoints. Credentials for
//! the model and voice providers arrive with each request; the server
//! holds none. Audio is carried base64-encoded in JSON.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::models::{AssistantRequest, OrchestrationResult};
use crate::orchestrator::Orchestrator;
use crate::voice::DEFAULT_VOICE_ID;

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub query: String,
    pub gemini_api_key: String,
    #[serde(default)]
    pub elevenlabs_api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub text: String,
    pub audio_b64: String,
    pub logs: Vec<String>,
    pub plan: Vec<Value>,
    pub data: Map<String, Value>,
}

impl From<OrchestrationResult> for QueryResponse {
    fn from(result: OrchestrationResult) -> Self {
        let audio_b64 = result
            .audio_bytes
            .map(|bytes| BASE64.encode(bytes))
            .unwrap_or_default();

        Self {
            text: result.text,
            audio_b64,
            logs: result.logs,
            plan: result.plan,
            data: result.data,
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Text Query Endpoint
/// =============================

async fn process_query(State(state): State<ApiState>, Form(form): Form<QueryForm>) -> Response {
    info!("Received text query: {}", form.query);

    let request = AssistantRequest {
        query: form.query,
        gemini_api_key: form.gemini_api_key,
        elevenlabs_api_key: form.elevenlabs_api_key,
        voice_id: form.voice_id,
    };

    run_pipeline(&state, request).await
}

/// =============================
/// Voice Query Endpoint
/// =============================

async fn process_voice(State(state): State<ApiState>, mut multipart: Multipart) -> Response {
    let mut audio: Vec<u8> = Vec::new();
    let mut gemini_api_key = String::new();
    let mut elevenlabs_api_key = String::new();
    let mut voice_id = default_voice_id();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                audio = field.bytes().await.unwrap_or_default().to_vec();
            }
            "gemini_api_key" => {
                gemini_api_key = field.text().await.unwrap_or_default();
            }
            "elevenlabs_api_key" => {
                elevenlabs_api_key = field.text().await.unwrap_or_default();
            }
            "voice_id" => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    voice_id = value;
                }
            }
            _ => {}
        }
    }

    if audio.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No audio file provided" })),
        )
            .into_response();
    }

    // Fail-soft transcription: an empty transcript still runs the pipeline.
    let query = state
        .orchestrator
        .transcribe(&elevenlabs_api_key, audio)
        .await;
    info!("Transcribed voice query: {}", query);

    let request = AssistantRequest {
        query,
        gemini_api_key,
        elevenlabs_api_key,
        voice_id,
    };

    run_pipeline(&state, request).await
}

async fn run_pipeline(state: &ApiState, request: AssistantRequest) -> Response {
    match state.orchestrator.run(request).await {
        Ok(result) => (StatusCode::OK, Json(QueryResponse::from(result))).into_response(),
        Err(e) => {
            error!("Orchestration failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/process-query", post(process_query))
        .route("/process-voice", post(process_voice))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
