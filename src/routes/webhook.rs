//! Webhook gateway: verification handshake and signed event delivery.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::engine::MessagingEvent;
use crate::errors::{BotError, BotResult};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    object: String,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

/// `GET /webhook` — platform verification handshake.
///
/// Answers 200 with the challenge echoed verbatim, or 403. Never silent.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let accepted = params.mode.as_deref() == Some("subscribe")
        && params.verify_token.as_deref() == Some(state.config.verify_token.as_str());

    if accepted {
        tracing::info!("webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!(mode = ?params.mode, "webhook verification rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

/// `POST /webhook` — signed event delivery.
///
/// Dispatch is fire-and-continue: the 200 goes back without waiting for
/// per-event processing, so a slow downstream send never stalls the platform.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BotError> {
    match &state.config.app_secret {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|value| value.to_str().ok());
            check_signature(secret, &body, signature)?;
        }
        None => tracing::warn!("app secret not configured, accepting unsigned delivery"),
    }

    let delivery: WebhookBody = serde_json::from_slice(&body)?;
    if delivery.object != "page" {
        tracing::warn!(object = %delivery.object, "ignoring delivery for unknown object");
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    for entry in delivery.entry {
        for event in entry.messaging {
            state.engine.spawn_dispatch(event);
        }
    }

    Ok((StatusCode::OK, "EVENT_RECEIVED").into_response())
}

/// HMAC-SHA256 over the exact raw body, hex-encoded with the platform's
/// `sha256=` prefix.
fn expected_signature(app_secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn check_signature(app_secret: &str, body: &[u8], signature: Option<&str>) -> BotResult<()> {
    let Some(received) = signature else {
        return Err(BotError::SignatureInvalid);
    };
    let expected = expected_signature(app_secret, body);

    // Constant-time comparison.
    if expected.as_bytes().ct_eq(received.as_bytes()).into() {
        Ok(())
    } else {
        Err(BotError::SignatureInvalid)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::engine::{Engine, Pacing};
    use crate::messenger::testing::RecordingMessenger;
    use crate::scheduler::Scheduler;
    use crate::store::Store;

    const SECRET: &str = "test_app_secret";

    fn test_state(app_secret: Option<&str>) -> Arc<AppState> {
        let store = Store::open(":memory:").expect("in-memory store");
        let messenger = Arc::new(RecordingMessenger::default());
        let engine = Engine::new(store, messenger, Scheduler::new(), Pacing::immediate());
        Arc::new(AppState {
            config: AppConfig {
                app_secret: app_secret.map(Into::into),
                ..Default::default()
            },
            engine,
        })
    }

    fn signed_post(body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    #[test]
    fn signature_roundtrip() {
        let body = b"{\"object\":\"page\"}";
        let signature = expected_signature(SECRET, body);
        assert!(signature.starts_with("sha256="));

        assert!(check_signature(SECRET, body, Some(&signature)).is_ok());
        assert!(check_signature("wrong_secret", body, Some(&signature)).is_err());
        assert!(check_signature(SECRET, b"tampered", Some(&signature)).is_err());
        assert!(check_signature(SECRET, body, None).is_err());
    }

    #[tokio::test]
    async fn handshake_echoes_challenge() {
        let app = crate::router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=duet_verify_token_123&hub.challenge=1158201444")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"1158201444");
    }

    #[tokio::test]
    async fn handshake_rejects_bad_token() {
        let app = crate::router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=guess&hub.challenge=x")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn handshake_answers_definitively_without_params() {
        let app = crate::router(test_state(None));
        let response = app
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delivery_rejects_missing_or_bad_signature() {
        let body = "{\"object\":\"page\",\"entry\":[]}";

        let app = crate::router(test_state(Some(SECRET)));
        let response = app.oneshot(signed_post(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let app = crate::router(test_state(Some(SECRET)));
        let response = app
            .oneshot(signed_post(body, Some("sha256=deadbeef".into())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delivery_acknowledges_signed_events() {
        let body = "{\"object\":\"page\",\"entry\":[{\"messaging\":[{\"sender\":{\"id\":\"sub-1\"},\"message\":{\"text\":\"hello\"}}]}]}";
        let signature = expected_signature(SECRET, body.as_bytes());

        let app = crate::router(test_state(Some(SECRET)));
        let response = app
            .oneshot(signed_post(body, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"EVENT_RECEIVED");
    }

    #[tokio::test]
    async fn delivery_rejects_unknown_object() {
        let body = "{\"object\":\"payments\",\"entry\":[]}";
        let signature = expected_signature(SECRET, body.as_bytes());

        let app = crate::router(test_state(Some(SECRET)));
        let response = app
            .oneshot(signed_post(body, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delivery_fails_on_malformed_json() {
        let body = "this is not json";
        let signature = expected_signature(SECRET, body.as_bytes());

        let app = crate::router(test_state(Some(SECRET)));
        let response = app
            .oneshot(signed_post(body, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
