use super::HttpClientError;
use crate::prelude::*;
use crate::Result;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Decodes the JSON body for any status code, because some APIs describe the
/// errors in the body. Error status codes with a body that isn't the expected
/// JSON are reported as [`HttpClientError::BadResponseStatusCode`].
pub(crate) fn decode_json<Res: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<Res> {
    let err = match serde_json::from_slice(bytes) {
        Ok(response) => return Ok(response),
        Err(err) => err,
    };

    let body = String::from_utf8_lossy(bytes);

    if status.is_client_error() || status.is_server_error() {
        return Err(err!(HttpClientError::BadResponseStatusCode {
            status,
            body: body.into_owned(),
        }));
    }

    warn!(response_body = %body, "Bad JSON response");

    Err(err!(HttpClientError::UnexpectedResponseJsonShape { source: err }))
}
