use super::HttpClientError;
use crate::prelude::*;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use easy_ext::ext;
use reqwest::StatusCode;
use reqwest_middleware::RequestBuilder;

#[ext(RequestBuilderBasicExt)]
#[async_trait]
pub(crate) impl RequestBuilder {
    /// Sends the request and collects the whole response body. Unlike
    /// [`RequestBuilder::send`] + [`reqwest::Response::error_for_status`]
    /// it doesn't reject error status codes, because some APIs describe
    /// the error in the body, so it's up to the caller to interpret them.
    async fn read_bytes_any_status(self) -> Result<(StatusCode, Bytes)> {
        let response = self
            .send()
            .await
            .map_err(err_ctx!(HttpClientError::Request))?;

        let status = response.status();

        let body = response
            .bytes()
            .await
            .map_err(err_ctx!(HttpClientError::ReadPayload))?;

        Ok((status, body))
    }
}
