// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_secret_header, with_security_headers},
    models::{DeleteResponse, FileListResponse, FileSummary, UploadForm, UploadResponse},
    state::AppState,
};

pub mod files;
pub mod health;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_file_size.saturating_add(files::MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route(
            "/upload",
            post(files::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(files::list_files))
        .route("/files/{id}", delete(files::delete_file))
        .route("/download/{id}", get(files::download_file))
        .with_state(state.clone());

    let mut gated = Router::new().nest("/api", api_routes);
    if let Some(dir) = &state.static_dir {
        gated = gated.fallback_service(ServeDir::new(dir));
    }
    let gated = gated.layer(from_fn_with_state(
        state.gate.clone(),
        require_secret_header,
    ));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let app = Router::new()
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(gated);

    with_security_headers(app).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        files::upload_file,
        files::list_files,
        files::download_file,
        files::delete_file,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            FileSummary,
            UploadForm,
            UploadResponse,
            FileListResponse,
            DeleteResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Files", description = "Encrypted file upload, listing, download and deletion"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
