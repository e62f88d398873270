//! HTTP response sanitization and truncation tests.

use fasilbot::providers::{check_http_response, sanitize_http_error_body, ProviderError};

use crate::http::serve_once;

async fn checked(status_line: &str, body: &str) -> Result<String, ProviderError> {
    let url = serve_once(status_line, "text/plain", body).await;
    let response = match reqwest::get(url).await {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };
    check_http_response(response).await
}

#[tokio::test]
async fn check_http_response_redacts_api_keys() {
    let raw_key = "sk-abcdefghijklmnopqrstuvwxyz0123456789ABCD";
    let body = format!("{{\"error\": \"Incorrect API key provided: {raw_key}\"}}");

    match checked("401 Unauthorized", &body).await {
        Err(ProviderError::HttpStatus { status, body }) => {
            assert_eq!(status, 401);
            assert!(!body.contains(raw_key));
            assert!(body.contains("[REDACTED]"));
        }
        other => panic!("expected http status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn check_http_response_truncates_long_error_body() {
    let body = "x".repeat(400);

    match checked("500 Internal Server Error", &body).await {
        Err(ProviderError::HttpStatus { body, .. }) => {
            assert!(body.ends_with("...[truncated]"));
        }
        other => panic!("expected http status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn check_http_response_passes_success_body_through() {
    let body = checked("200 OK", "{\"ok\":true}").await;
    assert!(matches!(body, Ok(ref b) if b == "{\"ok\":true}"));
}

#[test]
fn sanitize_collapses_whitespace_and_redacts_bot_tokens() {
    let raw = "bad\n\n  token   123456789:AAAbbbCCCdddEEEfffGGGhhhIIIjjjKKKlll";
    let clean = sanitize_http_error_body(raw);
    assert_eq!(clean, "bad token [REDACTED]");
}
