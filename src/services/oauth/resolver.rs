//! Request identity resolution: `?access_token=` → token authority → identity headers.
//!
//! Flow of `authenticate_request`:
//! - no request            → Ok (nothing to do)
//! - strip identity headers (forged values never survive)
//! - no / blank token      → Ok, unauthenticated
//! - authority lookup
//!   - `.` / `..` token id → Ok, unauthenticated (no lookup possible)
//!   - transport failure   → UpstreamUnavailable
//!   - non-2xx, 404        → Ok, unauthenticated
//!   - non-2xx, other      → Upstream (verbatim)
//!   - non-2xx, bad body   → UpstreamProtocol
//!   - 2xx, bad body       → UpstreamProtocol
//!   - 2xx                 → X-Caller-Id / X-Client-Id set
//!
//! No retries. The single attempt is bounded by the authority client's timeout.

use std::{fmt, sync::Arc, time::Duration};

use axum::http::Request;

use crate::services::oauth::access_token::AccessTokenRecord;
use crate::services::oauth::authority::{AuthorityError, TokenAuthority};
use crate::services::oauth::error::{
    AuthError, MSG_INVALID_ERROR_BODY, MSG_INVALID_TOKEN_BODY, RestError,
};
use crate::services::oauth::headers;

/// `true` when the request is explicitly marked public (`X-Public: true`).
///
/// An absent request counts as public. Hosts must make sure a real
/// unauthenticated request can never reach this as `None`.
pub fn is_public<B>(request: Option<&Request<B>>) -> bool {
    match request {
        None => true,
        Some(req) => headers::is_public_marked(req.headers()),
    }
}

/// Verified caller (end-user) id, if the request was resolved.
pub fn caller_id<B>(request: Option<&Request<B>>) -> Option<i64> {
    request.and_then(|req| headers::header_id(req.headers(), &headers::X_CALLER_ID))
}

/// Verified client (application) id, if the request was resolved.
pub fn client_id<B>(request: Option<&Request<B>>) -> Option<i64> {
    request.and_then(|req| headers::header_id(req.headers(), &headers::X_CLIENT_ID))
}

/// Sentinel form of [`caller_id`]: `0` means "no verified identity".
///
/// Indistinguishable from a caller legitimately assigned id 0; prefer
/// [`caller_id`] when that matters.
pub fn get_caller_id<B>(request: Option<&Request<B>>) -> i64 {
    caller_id(request).unwrap_or(0)
}

/// Sentinel form of [`client_id`]: `0` means "no verified identity".
pub fn get_client_id<B>(request: Option<&Request<B>>) -> i64 {
    client_id(request).unwrap_or(0)
}

/// Resolves access tokens against the token authority and stamps identity headers.
///
/// Holds no per-request state; clone the `Arc` it lives in freely.
#[derive(Clone)]
pub struct IdentityResolver {
    authority: Arc<dyn TokenAuthority>,
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("authority", &self.authority.authority_name())
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(authority: Arc<dyn TokenAuthority>) -> Self {
        Self { authority }
    }

    /// Resolve the request's access token and attach identity headers.
    ///
    /// On `Ok(())` the request either carries both identity headers or neither.
    pub async fn authenticate_request<B>(
        &self,
        request: Option<&mut Request<B>>,
    ) -> Result<(), AuthError> {
        let Some(req) = request else {
            return Ok(());
        };

        headers::clear_identity(req.headers_mut());

        let Some(access_token_id) = headers::access_token_param(req.uri()) else {
            tracing::debug!("no access token supplied; request stays unauthenticated");
            return Ok(());
        };

        let Some(record) = self.get_access_token(&access_token_id).await? else {
            return Ok(());
        };

        headers::set_identity(req.headers_mut(), record.user_id, record.client_id);

        tracing::debug!(
            caller_id = record.user_id,
            client_id = record.client_id,
            "request identity resolved"
        );

        Ok(())
    }

    /// [`authenticate_request`](Self::authenticate_request) under a caller deadline.
    ///
    /// An elapsed deadline is reported as `UpstreamUnavailable`, the same as a
    /// transport failure. Headers are only written after the lookup returns,
    /// so a timed-out request carries no identity.
    pub async fn authenticate_request_within<B>(
        &self,
        request: Option<&mut Request<B>>,
        deadline: Duration,
    ) -> Result<(), AuthError> {
        match tokio::time::timeout(deadline, self.authenticate_request(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?deadline, "access token resolution exceeded deadline");
                Err(AuthError::UpstreamUnavailable)
            }
        }
    }

    // `Ok(None)` means the authority does not know the token.
    async fn get_access_token(
        &self,
        access_token_id: &str,
    ) -> Result<Option<AccessTokenRecord>, AuthError> {
        let response = match self.authority.get_access_token(access_token_id).await {
            Ok(response) => response,
            Err(AuthorityError::UnaddressableTokenId) => {
                tracing::debug!("access token id is not addressable; request stays unauthenticated");
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!(
                    authority = self.authority.authority_name(),
                    error = %err,
                    "token authority unreachable"
                );
                return Err(AuthError::UpstreamUnavailable);
            }
        };

        if response.status.as_u16() > 299 {
            let rest = match serde_json::from_slice::<RestError>(&response.body) {
                Ok(rest) => rest,
                Err(err) => {
                    tracing::warn!(
                        status = %response.status,
                        error = %err,
                        "undecodable error body from token authority"
                    );
                    return Err(AuthError::UpstreamProtocol(MSG_INVALID_ERROR_BODY));
                }
            };

            if rest.is_not_found() {
                tracing::debug!("access token not found; request stays unauthenticated");
                return Ok(None);
            }

            tracing::info!(
                status = rest.status,
                message = %rest.message,
                "token authority rejected access token"
            );
            return Err(AuthError::Upstream(rest));
        }

        match serde_json::from_slice::<AccessTokenRecord>(&response.body) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(error = %err, "undecodable access token from token authority");
                Err(AuthError::UpstreamProtocol(MSG_INVALID_TOKEN_BODY))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::services::oauth::authority::AuthorityResponse;

    enum Reply {
        Respond(StatusCode, &'static str),
        Fail,
        Hang(Duration),
    }

    struct StubAuthority {
        reply: Reply,
        calls: AtomicUsize,
        last_id: Mutex<Option<String>>,
    }

    impl StubAuthority {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_id: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenAuthority for StubAuthority {
        fn authority_name(&self) -> &'static str {
            "stub"
        }

        async fn get_access_token(
            &self,
            access_token_id: &str,
        ) -> Result<AuthorityResponse, AuthorityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_id.lock().unwrap() = Some(access_token_id.to_string());

            match &self.reply {
                Reply::Respond(status, body) => Ok(AuthorityResponse::new(*status, *body)),
                Reply::Fail => Err(AuthorityError::Transport("connection refused".into())),
                Reply::Hang(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(AuthorityResponse::new(StatusCode::OK, "{}"))
                }
            }
        }
    }

    const TOKEN_42_7: &str = r#"{"id": "abc123", "user_id": 42, "client_id": 7}"#;

    fn resolver(stub: &Arc<StubAuthority>) -> IdentityResolver {
        IdentityResolver::new(stub.clone())
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn has_identity(req: &Request<Body>) -> bool {
        req.headers().contains_key(headers::X_CALLER_ID)
            || req.headers().contains_key(headers::X_CLIENT_ID)
    }

    #[test]
    fn absent_request_is_public() {
        assert!(is_public::<Body>(None));
    }

    #[test]
    fn public_requires_exact_marker() {
        let mut req = request("/users/1");
        assert!(!is_public(Some(&req)));

        req.headers_mut()
            .insert(headers::X_PUBLIC, HeaderValue::from_static("true"));
        assert!(is_public(Some(&req)));

        req.headers_mut()
            .insert(headers::X_PUBLIC, HeaderValue::from_static("TRUE"));
        assert!(!is_public(Some(&req)));
    }

    #[tokio::test]
    async fn absent_request_is_a_no_op() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, TOKEN_42_7));

        resolver(&stub)
            .authenticate_request::<Body>(None)
            .await
            .unwrap();

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_or_blank_token_stays_unauthenticated() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, TOKEN_42_7));
        let resolver = resolver(&stub);

        for uri in ["/users/1", "/users/1?access_token=", "/users/1?access_token=%20%20"] {
            let mut req = request(uri);
            resolver.authenticate_request(Some(&mut req)).await.unwrap();
            assert!(!has_identity(&req), "{uri}");
        }

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn resolved_token_sets_identity() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, TOKEN_42_7));
        let mut req = request("/users/1?access_token=%20abc123%20");

        resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap();

        assert_eq!(get_caller_id(Some(&req)), 42);
        assert_eq!(get_client_id(Some(&req)), 7);
        assert_eq!(stub.last_id.lock().unwrap().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn resolved_token_replaces_forged_values() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, TOKEN_42_7));
        let mut req = request("/users/1?access_token=abc123");
        req.headers_mut()
            .append(headers::X_CALLER_ID, HeaderValue::from_static("1"));
        req.headers_mut()
            .append(headers::X_CALLER_ID, HeaderValue::from_static("2"));

        resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap();

        let values: Vec<_> = req.headers().get_all(headers::X_CALLER_ID).iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("42")]);
    }

    #[tokio::test]
    async fn not_found_token_stays_unauthenticated() {
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::NOT_FOUND,
            r#"{"status": 404, "message": "no access token found with given id", "error": "not_found"}"#,
        ));
        let mut req = request("/users/1?access_token=missing");

        resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap();

        assert!(!has_identity(&req));
        assert_eq!(caller_id(Some(&req)), None);
    }

    #[tokio::test]
    async fn upstream_rejection_propagates_verbatim() {
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::BAD_REQUEST,
            r#"{"status": 400, "message": "expired token", "error": "bad_request"}"#,
        ));
        let mut req = request("/users/1?access_token=old");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "expired token");
        assert!(matches!(err, AuthError::Upstream(_)));
        assert!(!has_identity(&req));
    }

    #[tokio::test]
    async fn decoded_status_decides_not_http_status() {
        // the body says 404, so the request is treated as unauthenticated
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status": 404, "message": "gone"}"#,
        ));
        let mut req = request("/?access_token=abc");

        resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap();

        assert!(!has_identity(&req));
    }

    #[tokio::test]
    async fn transport_failure_is_internal() {
        let stub = StubAuthority::new(Reply::Fail);
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamUnavailable));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("fetching access token"));
        assert!(!err.message().contains("connection refused"));
    }

    #[tokio::test]
    async fn undecodable_error_body_is_internal() {
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
        ));
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamProtocol(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn undecodable_token_body_is_internal() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, r#"{"id": "abc"}"#));
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamProtocol(_)));
        assert!(
            err.message()
                .contains("unmarshalling access token response")
        );
        assert!(!has_identity(&req));
    }

    #[tokio::test]
    async fn partial_error_body_propagates_with_zero_status() {
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "expired token"}"#,
        ));
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "expired token");
        match err {
            AuthError::Upstream(rest) => assert_eq!(rest.status, 0),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_error_status_in_error_body_still_fails_the_request() {
        let stub = StubAuthority::new(Reply::Respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status": 200, "message": "all good"}"#,
        ));
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request(Some(&mut req))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Upstream(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!has_identity(&req));
    }

    // A 2xx record without ids is refused rather than stamped as identity 0/0.
    #[tokio::test]
    async fn token_record_without_ids_is_refused_not_zeroed() {
        for body in [
            r#"{"id": "abc"}"#,
            r#"{"id": "abc", "user_id": null, "client_id": 7}"#,
        ] {
            let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, body));
            let mut req = request("/?access_token=abc");

            let err = resolver(&stub)
                .authenticate_request(Some(&mut req))
                .await
                .unwrap_err();

            assert!(matches!(err, AuthError::UpstreamProtocol(_)), "{body}");
            assert!(!has_identity(&req));
        }
    }

    #[tokio::test]
    async fn forged_identity_is_cleared_on_every_call() {
        let stub = StubAuthority::new(Reply::Respond(StatusCode::OK, TOKEN_42_7));
        let resolver = resolver(&stub);
        let mut req = request("/users/1?access_token=");

        for _ in 0..2 {
            req.headers_mut()
                .insert(headers::X_CALLER_ID, HeaderValue::from_static("1"));
            resolver.authenticate_request(Some(&mut req)).await.unwrap();
            assert!(!has_identity(&req));
        }

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn deadline_elapsed_is_unavailable() {
        let stub = StubAuthority::new(Reply::Hang(Duration::from_millis(500)));
        let mut req = request("/?access_token=abc");

        let err = resolver(&stub)
            .authenticate_request_within(Some(&mut req), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UpstreamUnavailable));
        assert!(!has_identity(&req));
    }

    #[test]
    fn non_numeric_identity_reads_as_zero() {
        let mut req = request("/");
        req.headers_mut()
            .insert(headers::X_CALLER_ID, HeaderValue::from_static("abc"));
        req.headers_mut()
            .insert(headers::X_CLIENT_ID, HeaderValue::from_static("7x"));

        assert_eq!(get_caller_id(Some(&req)), 0);
        assert_eq!(get_client_id(Some(&req)), 0);
        assert_eq!(get_caller_id::<Body>(None), 0);
    }

    // Id 0 from the sentinel accessors is ambiguous; the Option accessors are not.
    #[test]
    fn zero_id_is_distinguishable_only_through_option_accessors() {
        let mut req = request("/");
        req.headers_mut()
            .insert(headers::X_CALLER_ID, HeaderValue::from_static("0"));

        assert_eq!(get_caller_id(Some(&req)), 0);
        assert_eq!(caller_id(Some(&req)), Some(0));
        assert_eq!(caller_id(Some(&request("/"))), None);
    }
}
