use crate::domain::checkout::err;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sha2::{Digest, Sha256};

pub const ADMIN_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Guards operator routes. An unset key locks the admin surface entirely.
pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if !expected.is_empty() && keys_match(key, &expected) => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "admin request rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(err("UNAUTHORIZED", "missing or invalid internal api key")),
            )
                .into_response()
        }
    }
}

// Constant-time over fixed-length digests.
fn keys_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::keys_match;

    #[test]
    fn matches_only_identical_keys() {
        assert!(keys_match("dev-internal-key", "dev-internal-key"));
        assert!(!keys_match("dev-internal-kez", "dev-internal-key"));
        assert!(!keys_match("", "dev-internal-key"));
    }
}
