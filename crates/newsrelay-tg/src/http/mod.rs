mod basic_ext;
mod json;

use crate::observability::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::prelude::*;
use async_trait::async_trait;
use reqwest_middleware::RequestBuilder;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::time::{Duration, Instant};

pub(crate) use json::decode_json;

pub(crate) mod prelude {
    pub(crate) use super::basic_ext::RequestBuilderBasicExt;
}

pub(crate) type Client = reqwest_middleware::ClientWithMiddleware;

pub(crate) fn default_retry_policy() -> ExponentialBackoff {
    // Retry exponentially increasing intervals between attempts.
    ExponentialBackoff::builder()
        .backoff_exponent(2)
        .retry_bounds(Duration::from_millis(100), Duration::from_secs(3))
        .build_with_total_retry_duration(Duration::from_secs(30))
}

pub(crate) fn create_client() -> Client {
    reqwest_middleware::ClientBuilder::new(teloxide::net::client_from_env())
        .with(ObservingMiddleware)
        .with(RetryTransientMiddleware::new_with_policy(
            default_retry_policy(),
        ))
        .with_init(|request_builder: RequestBuilder| {
            request_builder.header(
                "User-Agent",
                concat!("NewsRelayTelegramBot/", env!("CARGO_PKG_VERSION")),
            )
        })
        .build()
}

/// Logs and measures each request. It wraps the retry middleware, so the
/// measured duration covers all the retries of the request.
struct ObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for ObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let host = request.url().host_str().unwrap_or("{unknown}").to_owned();
        let method = request.method().to_string();

        let span = info_span!(
            "request",
            version = ?request.version(),
            %method,
            // Don't log the query, because it may contain secrets
            url = format_args!("{}{}", host, request.url().path()),
        );

        async move {
            let start = Instant::now();
            let result = next.run(request, extensions).await;
            let duration = start.elapsed();

            let status = match &result {
                Ok(response) => response.status().as_u16().to_string(),
                Err(_) => "{fatal}".to_owned(),
            };

            metrics::histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                duration.as_secs_f64(),
                "method" => method,
                "host" => host,
                "status" => status
            );

            let duration = tracing_duration(duration);

            let response = match &result {
                Ok(response) => response,
                Err(err) => {
                    error!(duration, err = tracing_err(err), "Network request failed");
                    return result;
                }
            };

            let status = response.status();

            let Err(err) = response.error_for_status_ref() else {
                debug!(duration, %status, "Network request succeeded");
                return result;
            };

            warn!(
                err = tracing_err(&err),
                duration,
                %status,
                "Network request failed (error status)"
            );

            result
        }
        .instrument(span)
        .await
    }
}

/// Errors at the layer of the HTTP API
#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpClientError {
    #[error("HTTP request failed")]
    Request { source: reqwest_middleware::Error },

    #[error("Failed to read HTTP response")]
    ReadPayload { source: reqwest::Error },

    #[error("HTTP request has failed (HTTP status code: {status}):\n{body}")]
    BadResponseStatusCode {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Received an unexpected response JSON object")]
    UnexpectedResponseJsonShape { source: serde_json::Error },
}
