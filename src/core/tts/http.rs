//! HTTP plumbing shared by the REST providers.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use tracing::error;

use super::base::{TTSError, TTSResult};
use super::features::AudioStream;

/// Default request timeout for REST providers
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build an HTTP client with a request timeout and optional default headers.
pub(crate) fn build_client(
    timeout_secs: u64,
    default_headers: Option<HeaderMap>,
) -> TTSResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(headers) = default_headers {
        builder = builder.default_headers(headers);
    }

    builder.build().map_err(|e| {
        TTSError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
    })
}

/// Map a transport failure into an API error.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> TTSError {
    error!(provider = provider, error = %err, "TTS request failed");
    TTSError::api_with_source(format!("{provider} TTS request failed: {err}"), err)
}

/// Pass successful responses through, classify the rest.
///
/// HTTP 429 becomes [`TTSError::RateLimited`] with the `Retry-After` seconds when
/// present. Any other non-2xx status becomes an API error carrying the status
/// and the response body verbatim.
pub(crate) async fn ensure_success(provider: &str, response: Response) -> TTSResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    error!(
        provider = provider,
        status = %status,
        body = %body,
        "TTS API returned error"
    );

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TTSError::RateLimited {
            message: format!("{provider} API error ({status}): {body}"),
            retry_after,
        });
    }

    Err(TTSError::api(format!("{provider} API error ({status}): {body}")))
}

/// Read a full response body.
pub(crate) async fn read_body(provider: &str, response: Response) -> TTSResult<Bytes> {
    response.bytes().await.map_err(|e| {
        error!(provider = provider, error = %e, "Failed to read audio response");
        TTSError::api_with_source(format!("Failed to read {provider} audio response: {e}"), e)
    })
}

/// Re-slice a byte stream so no chunk exceeds `chunk_size`.
///
/// Chunks are split, never merged. Read errors end the stream after being
/// yielded once.
pub(crate) fn rechunk<S, E>(provider: &'static str, source: S, chunk_size: usize) -> AudioStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let chunk_size = chunk_size.max(1);

    Box::pin(async_stream::stream! {
        let mut source = Box::pin(source);
        while let Some(item) = source.next().await {
            match item {
                Ok(mut chunk) => {
                    while chunk.len() > chunk_size {
                        yield Ok::<Bytes, TTSError>(chunk.split_to(chunk_size));
                    }
                    if !chunk.is_empty() {
                        yield Ok(chunk);
                    }
                }
                Err(e) => {
                    error!(provider = provider, error = %e, "Audio stream read failed");
                    yield Err(TTSError::api_with_source(
                        format!("{provider} audio stream failed: {e}"),
                        e,
                    ));
                    break;
                }
            }
        }
    })
}

/// Stream a successful response body in chunks of at most `chunk_size` bytes.
pub(crate) fn response_stream(
    provider: &'static str,
    response: Response,
    chunk_size: usize,
) -> AudioStream {
    rechunk(provider, response.bytes_stream(), chunk_size)
}
