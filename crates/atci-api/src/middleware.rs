//! API middleware.
//!
//! The password gate: when a password is configured, every request from
//! a non-loopback origin must present it, either as the password half of
//! HTTP Basic credentials (any username) or as an `atci_password`
//! cookie. Loopback clients always pass.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{AUTHORIZATION, COOKIE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tracing::debug;

use atci_models::AtciConfig;

/// Cookie carrying the shared password.
pub const PASSWORD_COOKIE: &str = "atci_password";

/// Request gate for the protected routes.
pub async fn password_gate(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response<Body> {
    let cfg = AtciConfig::load().unwrap_or_default();
    if cfg.password.is_empty() || addr.ip().is_loopback() {
        return next.run(request).await;
    }

    if request_has_password(request.headers(), &cfg.password) {
        return next.run(request).await;
    }

    debug!("rejecting unauthenticated request from {addr}");
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, "Basic realm=\"atci\"")],
        Json(json!({ "detail": "password required" })),
    )
        .into_response()
}

/// Whether the request carries the configured password.
pub fn request_has_password(headers: &HeaderMap, password: &str) -> bool {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(encoded) = value.strip_prefix("Basic ") {
            if let Ok(decoded) = BASE64.decode(encoded.trim()) {
                if let Ok(text) = String::from_utf8(decoded) {
                    // Any username; only the password half matters.
                    if let Some((_, pass)) = text.split_once(':') {
                        if pass == password {
                            return true;
                        }
                    }
                }
            }
        }
    }

    if let Some(value) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in value.split(';') {
            if let Some((name, pass)) = pair.trim().split_once('=') {
                if name == PASSWORD_COOKIE && pass == password {
                    return true;
                }
            }
        }
    }

    false
}
