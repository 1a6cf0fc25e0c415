// Echo upstream: answers with the request body it received

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::IntoResponse,
};

pub const RECEIVED_LENGTH_HEADER: HeaderName =
    HeaderName::from_static("x-received-content-length");

/// Stand-in for the proxied service. Reflects the body, its content type,
/// and the `Content-Length` it was declared with.
pub async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let received_length = headers
        .get(header::CONTENT_LENGTH)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("none"));

    (
        [
            (header::CONTENT_TYPE, content_type),
            (RECEIVED_LENGTH_HEADER, received_length),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_reflects_body_and_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(2usize));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = echo(headers, Bytes::from_static(b"{}")).await.into_response();
        assert_eq!(
            response.headers().get(RECEIVED_LENGTH_HEADER).unwrap(),
            "2"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn test_echo_without_length() {
        let response = echo(HeaderMap::new(), Bytes::new()).await.into_response();
        assert_eq!(
            response.headers().get(RECEIVED_LENGTH_HEADER).unwrap(),
            "none"
        );
    }
}
