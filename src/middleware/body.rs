// Lenient request body reading

use axum::body::{Body, Bytes};
use http_body_util::BodyExt;
use std::sync::Arc;
use tracing::warn;

/// Observer for body read errors, which are otherwise swallowed
pub type ReadErrorHook = Arc<dyn Fn(&axum::Error) + Send + Sync>;

/// Read the whole body, frame by frame.
///
/// A read error stops the read but is not fatal: the bytes received so far
/// are returned (possibly none). The body is dropped before returning.
pub async fn read_body_lenient(mut body: Body, on_error: Option<&ReadErrorHook>) -> Bytes {
    let mut buf = Vec::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    buf.extend_from_slice(data);
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    bytes_read = buf.len(),
                    "Request body read failed, continuing with partial body"
                );
                if let Some(hook) = on_error {
                    hook(&err);
                }
                break;
            }
        }
    }

    drop(body);
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing_body(prefix: &'static str) -> Body {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(prefix.as_bytes())),
            Err(std::io::Error::other("connection reset")),
        ];
        Body::from_stream(futures_util::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_reads_full_body() {
        let bytes = read_body_lenient(Body::from("{\"a\": 1}"), None).await;
        assert_eq!(&bytes[..], b"{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let bytes = read_body_lenient(Body::empty(), None).await;
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial_bytes() {
        let bytes = read_body_lenient(failing_body("{\"a\""), None).await;
        assert_eq!(&bytes[..], b"{\"a\"");
    }

    #[tokio::test]
    async fn test_read_error_reaches_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let hook: ReadErrorHook = Arc::new(move |_err: &axum::Error| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let bytes = read_body_lenient(failing_body(""), Some(&hook)).await;
        assert!(bytes.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
