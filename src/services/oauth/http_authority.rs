use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

use crate::services::oauth::authority::{AuthorityError, AuthorityResponse, TokenAuthority};

/// HTTP token authority client (`GET {base}/oauth/access_token/{id}`).
///
/// Built once at startup. `reqwest::Client` pools connections internally and
/// is cheap to clone, so one instance serves every request task.
#[derive(Clone, Debug)]
pub struct HttpTokenAuthority {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTokenAuthority {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AuthorityError> {
        if base_url.cannot_be_a_base() {
            return Err(AuthorityError::InvalidUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the lookup URL. The token id is pushed as one percent-encoded
    /// path segment, so `/` or `?` inside it cannot change the target.
    ///
    /// `.` and `..` are rejected: URL parsing normalises them (and their
    /// `%2E` spellings) away, which would target the collection path.
    pub fn access_token_url(&self, access_token_id: &str) -> Result<Url, AuthorityError> {
        if matches!(access_token_id, "." | "..") {
            return Err(AuthorityError::UnaddressableTokenId);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthorityError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["oauth", "access_token", access_token_id]);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error) -> AuthorityError {
    if e.is_timeout() {
        AuthorityError::Timeout
    } else {
        // The URL carries the token id; keep it out of error messages.
        AuthorityError::Transport(e.without_url().to_string())
    }
}

#[async_trait]
impl TokenAuthority for HttpTokenAuthority {
    fn authority_name(&self) -> &'static str {
        "http"
    }

    async fn get_access_token(
        &self,
        access_token_id: &str,
    ) -> Result<AuthorityResponse, AuthorityError> {
        let url = self.access_token_url(access_token_id)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(AuthorityResponse::new(status, body.to_vec()))
    }
}
