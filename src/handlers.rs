// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the map share service.
//!
//! Three endpoints compose the codec, validator, limiter and store:
//! draft saves (rate limited, raw body), share stores (validated,
//! write-once) and share loads (id verified before storage is touched).

use crate::config::Config;
use crate::limiter::{DraftRateLimiter, RateLimitResult};
use crate::share_id::{ShareIdCodec, ShareIdError};
use crate::storage::{ShareStore, StoreError};
use crate::validator::ShareValidator;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: DraftRateLimiter,
    pub validator: ShareValidator,
    pub codec: ShareIdCodec,
    pub store: ShareStore,
    pub config: Config,
}

/// Error body for the share endpoints.
#[derive(Debug, Serialize)]
pub struct ShareFailure {
    pub status: bool,
    pub error: String,
}

/// Error body for the draft endpoint.
#[derive(Debug, Serialize)]
pub struct DraftFailure {
    pub error: &'static str,
}

/// Success body for `POST /save-draft`.
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub url: String,
}

/// Success body for `POST /share/store`.
#[derive(Debug, Serialize)]
pub struct StoreShareResponse {
    pub status: bool,
    #[serde(rename = "shareID")]
    pub share_id: String,
    pub url: String,
}

/// Success body for `GET /share/load`.
#[derive(Debug, Serialize)]
pub struct LoadShareResponse {
    pub status: bool,
    pub data: Value,
}

/// Query parameters for `GET /share/load`.
#[derive(Debug, Deserialize)]
pub struct LoadQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "map-share-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Save a raw draft body under a fresh id.
///
/// Drafts skip schema validation: they are a private save-for-later channel
/// addressed only by an unguessable fresh id. They still pass the capacity
/// check and land via the write-once path.
pub async fn save_draft(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = addr.ip();

    match state.limiter.check(ip).await {
        RateLimitResult::Allowed { remaining } => {
            debug!(%ip, remaining, "draft save admitted");
        }
        RateLimitResult::Limited { retry_after } => {
            info!(%ip, retry_after_secs = retry_after.as_secs(), "draft save rate limited");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
                Json(DraftFailure {
                    error: "Too many requests",
                }),
            )
                .into_response();
        }
    }

    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(DraftFailure {
                error: "No data provided",
            }),
        )
            .into_response();
    }

    let id = state.codec.generate();
    match state.store.store_draft(&id, &body).await {
        Ok(()) => {
            info!(%ip, %id, bytes = body.len(), "draft saved");
            let url = format!("{}/save/{id}", base_url(&state.config, &headers));
            (StatusCode::OK, Json(DraftResponse { url })).into_response()
        }
        Err(StoreError::InsufficientCapacity {
            available,
            required,
        }) => {
            warn!(available, required, "draft rejected, storage headroom below threshold");
            (
                StatusCode::INSUFFICIENT_STORAGE,
                Json(DraftFailure {
                    error: "Cannot accept new drafts due to low disk space",
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!(%id, error = %err, "draft store failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DraftFailure {
                    error: "Failed to store draft",
                }),
            )
                .into_response()
        }
    }
}

/// Validate and persist a share, write-once.
pub async fn store_share(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let record = match state.validator.validate(&body) {
        Ok(record) => record,
        Err(err) => {
            info!(error = %err, path = ?err.path(), "share payload rejected");
            return share_failure(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    match state.store.store_share(&record).await {
        Ok(()) => {
            info!(id = %record.share_id, "share stored");
            let url = format!(
                "{}/view?id={}",
                base_url(&state.config, &headers),
                record.share_id
            );
            (
                StatusCode::OK,
                Json(StoreShareResponse {
                    status: true,
                    share_id: record.share_id,
                    url,
                }),
            )
                .into_response()
        }
        Err(StoreError::Conflict(id)) => {
            info!(%id, "share id already taken");
            share_failure(
                StatusCode::CONFLICT,
                "Cannot overwrite existing shareID".to_string(),
            )
        }
        Err(StoreError::InsufficientCapacity {
            available,
            required,
        }) => {
            warn!(available, required, "share rejected, storage headroom below threshold");
            share_failure(
                StatusCode::INSUFFICIENT_STORAGE,
                "Cannot accept new shares due to low disk space".to_string(),
            )
        }
        Err(err @ StoreError::Encode(_)) => {
            error!(id = %record.share_id, error = %err, "share encode failed");
            share_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode data to JSON".to_string(),
            )
        }
        Err(err) => {
            error!(id = %record.share_id, error = %err, "share store failed");
            share_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store share data".to_string(),
            )
        }
    }
}

/// Load a share by its checksum-verified id.
pub async fn load_share(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoadQuery>,
) -> Response {
    let Some(id) = query.id else {
        return share_failure(StatusCode::BAD_REQUEST, "$.shareID missing".to_string());
    };

    // The id is verified before it is ever used as a storage key.
    if let Err(err) = state.codec.check(&id) {
        debug!(id = %id, error = %err, "share load rejected");
        let message = match err {
            ShareIdError::WrongLength(_) => "$.shareID must be exactly 18 characters long",
            ShareIdError::NotHex | ShareIdError::BadChecksum => "$.shareID checksum is invalid",
        };
        return share_failure(StatusCode::BAD_REQUEST, message.to_string());
    }

    let record = match state.store.load_share(&id).await {
        Ok(record) => record,
        Err(StoreError::NotFound(_)) => {
            return share_failure(StatusCode::NOT_FOUND, "ShareID not found".to_string());
        }
        Err(err) => {
            error!(%id, error = %err, "share load failed");
            return share_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read share data".to_string(),
            );
        }
    };

    if record.share_id != id {
        let err = StoreError::IdentityMismatch {
            requested: id,
            stored: record.share_id,
        };
        error!(error = %err, "share integrity violation");
        return share_failure(
            StatusCode::BAD_REQUEST,
            "shareID in URL does not match shareID in data".to_string(),
        );
    }

    (
        StatusCode::OK,
        Json(LoadShareResponse {
            status: true,
            data: record.data,
        }),
    )
        .into_response()
}

fn share_failure(code: StatusCode, error: String) -> Response {
    (
        code,
        Json(ShareFailure {
            status: false,
            error,
        }),
    )
        .into_response()
}

/// Base URL for retrieval links: the configured public URL, or the
/// request's Host header over plain http.
fn base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(public_url) = &config.public_url {
        return public_url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}
