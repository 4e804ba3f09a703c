use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, UNEXPECTED_ERROR};
use crate::session::Session;

/// Status and body of a response that got past the authentication check.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    /// Turn a non-success status into an [`ApiError`].
    pub fn error_for_status(self) -> Result<Bytes, ApiError> {
        if self.status.is_success() {
            Ok(self.body)
        } else {
            Err(status_error(self.status, &self.body))
        }
    }
}

/// Map a failed status to an error, taking the message from the body when
/// there is one.
pub fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        _ => ApiError::Status {
            status: status.as_u16(),
            message: error_message(body).unwrap_or_else(|| UNEXPECTED_ERROR.to_owned()),
        },
    }
}

/// The `message` field of a JSON error body.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

/// REST client for the PropX API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, session: Session) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request with the bearer credential attached.
    ///
    /// A 401 clears the session, fires its hook and comes back as
    /// [`ApiError::Unauthorized`]; every other status is returned as is.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<RawResponse, ApiError> {
        let request = match self.session.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(status = status.as_u16(), len = body.len(), "api response");

        if status == StatusCode::UNAUTHORIZED {
            self.session.reject().await;
            return Err(ApiError::Unauthorized);
        }
        Ok(RawResponse { status, body })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self
            .send(self.client.get(self.url(path)))
            .await?
            .error_for_status()?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> Result<Bytes, ApiError> {
        self.send(self.client.post(self.url(path)).json(payload))
            .await?
            .error_for_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, b""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, br#"{"message":"nope"}"#),
            ApiError::Forbidden
        ));

        let err = status_error(StatusCode::UNPROCESSABLE_ENTITY, br#"{"message":"Title is required"}"#);
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(err.status(), Some(422));

        let err = status_error(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(err.to_string(), UNEXPECTED_ERROR);
    }

    #[test]
    fn test_url_joins_single_slash() {
        let client = ApiClient::new("https://api.test/api/", Session::anonymous());
        assert_eq!(
            client.url("/legal-documents/privacy-policy"),
            "https://api.test/api/legal-documents/privacy-policy"
        );
    }
}
