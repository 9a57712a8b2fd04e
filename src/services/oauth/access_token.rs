use serde::Deserialize;

/// Access token record returned by the token authority on 2xx.
///
/// Fetched per request and dropped once the identity headers are set;
/// never cached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessTokenRecord {
    pub id: String,
    pub user_id: i64,
    pub client_id: i64,
}
