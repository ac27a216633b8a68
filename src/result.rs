use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{RestError, Result};

/// Final outcome of [`Request::execute`](crate::Request::execute).
///
/// Holds either the response status and body or the error that ended the
/// call. Status codes are not interpreted here: a `404` with a JSON body
/// decodes like a `200`. Use [`RestResult::ensure_success`] to reject
/// non-2xx responses.
#[derive(Clone, Debug)]
pub struct RestResult {
    status: Option<StatusCode>,
    body: Bytes,
    error: Option<RestError>,
}

impl RestResult {
    pub(crate) fn success(status: StatusCode, body: Bytes) -> Self {
        Self {
            status: Some(status),
            body,
            error: None,
        }
    }

    pub(crate) fn failed(error: RestError) -> Self {
        Self {
            status: None,
            body: Bytes::new(),
            error: Some(error),
        }
    }

    /// Parses the response body as JSON into `T`.
    ///
    /// Each call re-parses the stored bytes, so repeated calls agree.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.check()?;
        if self.body.is_empty() {
            return Err(RestError::EmptyBody);
        }
        serde_json::from_slice(&self.body).map_err(|err| RestError::Decode {
            source: Arc::new(err),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }

    /// Surfaces the terminal error, if any, without decoding the body.
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Like [`RestResult::check`], but also fails on a non-2xx status.
    pub fn ensure_success(&self) -> Result<()> {
        self.check()?;
        match self.status {
            Some(status) if !status.is_success() => Err(RestError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&self.body).into_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// HTTP status, absent when the call failed.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Raw response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use reqwest::StatusCode;
    use serde::Deserialize;

    use super::RestResult;
    use crate::RestError;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    fn ok(body: &'static str) -> RestResult {
        RestResult::success(StatusCode::OK, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn decode_populates_target() {
        let result = ok(r#"{"id":7,"name":"kit"}"#);
        let user: User = result.decode().expect("body must decode");
        assert_eq!(
            user,
            User {
                id: 7,
                name: "kit".to_owned()
            }
        );
    }

    #[test]
    fn decode_is_repeatable() {
        let result = ok(r#"{"id":7,"name":"kit"}"#);
        let first: User = result.decode().expect("first decode must succeed");
        let second: User = result.decode().expect("second decode must succeed");
        assert_eq!(first, second);

        let broken = ok("{oops");
        assert!(matches!(broken.decode::<User>(), Err(RestError::Decode { .. })));
        assert!(matches!(broken.decode::<User>(), Err(RestError::Decode { .. })));
    }

    #[test]
    fn decode_error_carries_raw_body() {
        let err = ok("<html>bad gateway</html>")
            .decode::<User>()
            .expect_err("html must not decode");
        match err {
            RestError::Decode { body, .. } => assert_eq!(body, "<html>bad gateway</html>"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_with_requested_decode_is_error() {
        let result = RestResult::success(StatusCode::NO_CONTENT, Bytes::new());
        assert!(matches!(result.decode::<User>(), Err(RestError::EmptyBody)));
        result.check().expect("check must ignore empty body");
    }

    #[test]
    fn stored_error_surfaces_unchanged() {
        let result = RestResult::failed(RestError::Cancelled);
        assert!(matches!(result.decode::<User>(), Err(RestError::Cancelled)));
        assert!(matches!(result.check(), Err(RestError::Cancelled)));
        assert!(result.status().is_none());
        assert!(!result.is_ok());
    }

    #[test]
    fn non_success_status_still_decodes() {
        let result = RestResult::success(
            StatusCode::NOT_FOUND,
            Bytes::from_static(br#"{"id":0,"name":"missing"}"#),
        );
        let user: User = result.decode().expect("status must not affect decode");
        assert_eq!(user.name, "missing");

        match result.ensure_success() {
            Err(RestError::Http { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("missing"));
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }
}
