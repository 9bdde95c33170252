//! Remote responses
//!
//! The completion payload handed back by the environment's transport. The
//! body is expected (but not required) to be JSON; the `remoteAction` field
//! of a JSON body participates in completion routing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response to a remote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Transport-level success: status 0 (local), 2xx, or 304
    pub fn success(&self) -> bool {
        self.status == 0 || (200..300).contains(&self.status) || self.status == 304
    }

    /// Parse the body as JSON, if it is JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// The `remoteAction` name declared by the payload, if any
    pub fn remote_action(&self) -> Option<String> {
        self.json()?
            .get("remoteAction")?
            .as_str()
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        assert!(RemoteResponse::new(200, "").success());
        assert!(RemoteResponse::new(204, "").success());
        assert!(RemoteResponse::new(304, "").success());
        assert!(RemoteResponse::new(0, "").success());
        assert!(!RemoteResponse::new(404, "").success());
        assert!(!RemoteResponse::new(500, "").success());
    }

    #[test]
    fn test_remote_action_from_payload() {
        let response = RemoteResponse::new(200, r#"{"remoteAction":"save","count":3}"#);
        assert_eq!(response.remote_action(), Some("save".to_string()));
    }

    #[test]
    fn test_remote_action_absent() {
        assert_eq!(RemoteResponse::new(200, r#"{"count":3}"#).remote_action(), None);
        assert_eq!(RemoteResponse::new(200, "not json").remote_action(), None);
        assert_eq!(RemoteResponse::new(200, "").remote_action(), None);
    }
}
