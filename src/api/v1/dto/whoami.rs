use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub caller_id: i64,
    pub client_id: i64,
}
