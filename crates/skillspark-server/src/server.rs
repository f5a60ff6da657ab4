//! Actix Web HTTP server.
//!
//! Exposes the SkillSpark AI endpoints:
//! - `POST /api/ai/generate-text`
//! - `POST /api/ai/generate-image`
//! - `POST /api/ai/chat` (SSE)
//! - `GET /api/ai/jobs/{job_id}`
//! - `GET /`, `GET /health`

use std::sync::Arc;

use crate::{
    config::ServerConfig,
    persona, streaming,
    types::{
        ChatRequest, ErrorDetail, GenerateImageRequest, GenerateTextRequest, GenerationResponse,
        JobStatus, ServiceInfo,
    },
};
use actix_cors::Cors;
use actix_web::{
    http::header::{CACHE_CONTROL, CONNECTION},
    web, App, HttpResponse, HttpServer,
};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::json;
use skillspark_providers::{DashScopeClient, GenerationClient, ProviderError};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn GenerationClient>,
}

impl AppState {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr();

    let client = DashScopeClient::new(config.provider_config())
        .context("failed to build DashScope client")?;
    if config.api_key.is_none() {
        warn!("ALICLOUD_API_KEY is not set; AI endpoints will fail until it is configured");
    }

    let state = web::Data::new(AppState::new(Arc::new(client)));
    info!(addr = %addr, "skillspark-server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(routes)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

/// Route table, shared by `serve` and the tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health_check))
        .route("/api/ai/generate-text", web::post().to(handle_generate_text))
        .route("/api/ai/generate-image", web::post().to(handle_generate_image))
        .route("/api/ai/chat", web::post().to(handle_chat))
        .route("/api/ai/jobs/{job_id}", web::get().to(handle_job_status));
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo {
        message: "SkillSpark API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health_check() -> &'static str {
    "OK"
}

fn envelope(provider: &str, result: Result<serde_json::Value, ProviderError>) -> HttpResponse {
    let body = match result {
        Ok(data) => GenerationResponse::ok(data),
        Err(e) => {
            error!(provider, error = %e, status = ?e.status(), "generation failed");
            GenerationResponse::failed(e.to_string())
        }
    };
    HttpResponse::Ok().json(body)
}

async fn handle_generate_text(
    state: web::Data<AppState>,
    body: web::Json<GenerateTextRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    debug!(
        job_type = ?req.job_type,
        target_type = ?req.target_type,
        target_id = ?req.target_id,
        "generate-text request"
    );

    let result = state.client.generate_text(req.to_params()).await;
    envelope(state.client.provider(), result.map(|content| json!({ "content": content })))
}

async fn handle_generate_image(
    state: web::Data<AppState>,
    body: web::Json<GenerateImageRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    debug!(width = req.width, height = req.height, style = ?req.style, "generate-image request");

    let result = state.client.generate_image(req.to_params()).await;
    envelope(state.client.provider(), result.map(|image_url| json!({ "image_url": image_url })))
}

async fn handle_chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> HttpResponse {
    let req = body.into_inner();

    if req.messages.is_empty() {
        return HttpResponse::BadRequest().json(ErrorDetail::new("messages must not be empty"));
    }

    // The only failure reported through the HTTP status. Once the body starts
    // streaming, errors travel as SSE events.
    if let Err(e) = state.client.ensure_configured() {
        error!(provider = state.client.provider(), error = %e, "chat request rejected");
        return HttpResponse::InternalServerError().json(ErrorDetail::new(e.to_string()));
    }

    req.log_pass_through();
    debug!(
        model = %req.model,
        language = ?req.language,
        messages = req.messages.len(),
        "chat request"
    );

    let params = persona::chat_params(req);
    let events = streaming::chat_events(state.client.clone(), params)
        .map(|event| Ok::<_, actix_web::Error>(web::Bytes::from(event)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header((CONNECTION, "keep-alive"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(events)
}

async fn handle_job_status(path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(JobStatus {
        status: "completed".to_string(),
        job_id: path.into_inner(),
    })
}
