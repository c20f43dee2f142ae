//! Remote call contract and response decoding.
//!
//! Remote collaborators are plain async traits per slice returning
//! [`RemoteResult`]. The network fetch itself lives outside this crate;
//! [`decode_response`] and [`decode_failure`] normalise whatever the
//! transport produced into the `Ok` / `Fail` shape handlers expect.

use serde::de::DeserializeOwned;

use crate::error::RemoteFailure;

/// Outcome of a remote call: the value, or a structured failure.
pub type RemoteResult<T> = Result<T, RemoteFailure>;

/// Decode a non-success response body into a [`RemoteFailure`].
///
/// A JSON object carrying a string `code` (and optionally `parameters`) is
/// taken as-is. Anything else (HTML error pages, plain text, empty bodies)
/// becomes [`SYSTEM_ERROR`](crate::error::SYSTEM_ERROR) with the raw body
/// as its only parameter.
///
/// # Examples
///
/// ```
/// use opstate::decode_failure;
///
/// let failure = decode_failure(r#"{"code":"DUPLICATE_CODE","parameters":["USD"]}"#);
/// assert_eq!(failure.code, "DUPLICATE_CODE");
/// assert_eq!(failure.parameters, vec!["USD"]);
///
/// let failure = decode_failure("Service Unavailable");
/// assert_eq!(failure.code, "SYSTEM_ERROR");
/// assert_eq!(failure.parameters, vec!["Service Unavailable"]);
/// ```
pub fn decode_failure(body: &str) -> RemoteFailure {
    match serde_json::from_str::<RemoteFailure>(body) {
        Ok(failure) => failure,
        Err(_) => RemoteFailure::system(body),
    }
}

/// Decode a transport response into a [`RemoteResult`].
///
/// # Arguments
///
/// * `status` - HTTP-style status code of the response.
/// * `body` - Raw response body.
///
/// # Returns
///
/// `Ok(T)` when `status` is 2xx and the body deserializes into `T`.
/// A non-2xx status is decoded with [`decode_failure`]. A 2xx body that
/// does not match `T` is reported as a system failure carrying the body.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> RemoteResult<T> {
    if !(200..300).contains(&status) {
        let failure = decode_failure(body);
        tracing::debug!(status, code = %failure.code, "remote call returned failure");
        return Err(failure);
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(status, error = %e, "remote success body did not decode");
        RemoteFailure::system(body)
    })
}
