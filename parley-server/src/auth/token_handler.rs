//! HTTP surface of the credential service: `POST /auth/token` and
//! `GET /auth/validate`.

use crate::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Query string accepted wherever a credential may be presented.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialQuery {
    pub token: Option<String>,
}

impl CredentialQuery {
    /// The `token` query parameter, else an `Authorization: Bearer` header.
    pub fn credential<'a>(&'a self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.token.as_deref().or_else(|| bearer_token(headers))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// What `/auth/validate` reports about a valid credential.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub sub: String,
    pub session_id: String,
    /// Unix seconds.
    pub expires_at: i64,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub async fn issue_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let user_id = match body {
        Ok(Json(request)) if !request.user_id.trim().is_empty() => request.user_id,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "userId required"),
        Err(e) => {
            debug!("Rejected token request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "userId required");
        }
    };

    match state.credentials.issue(&user_id) {
        Ok(token) => {
            info!(subject = %user_id, "Issued credential");
            Json(TokenResponse { token }).into_response()
        }
        Err(e) => {
            warn!(subject = %user_id, "Failed to issue credential: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "token generation failed")
        }
    }
}

pub async fn validate_token(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = query
        .credential(&headers)
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return error_response(StatusCode::UNAUTHORIZED, "token required");
    };

    match state.credentials.claims(token) {
        Ok(claims) => Json(TokenInfo {
            sub: claims.sub,
            session_id: claims.session_id,
            expires_at: claims.exp,
        })
        .into_response(),
        Err(e) => {
            debug!("Credential failed validation: {}", e);
            error_response(StatusCode::UNAUTHORIZED, "invalid token")
        }
    }
}
