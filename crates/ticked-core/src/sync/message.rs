//! Wire types for push/pull reconciliation
//!
//! The backend speaks the sync engine's JSON protocol: push uploads the
//! pending mutation batch, pull downloads a patch against the last seen
//! cookie. Field casing (`clientID`, `lastMutationID`) is fixed by the
//! backend and preserved through serde renames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent with every push request
pub const PUSH_VERSION: u64 = 1;

/// Protocol version sent with every pull request
pub const PULL_VERSION: u64 = 1;

/// A locally applied mutation awaiting server confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationRecord {
    /// Per-client monotonically increasing id
    pub id: u64,
    /// Wire name of the mutator (e.g. `createMessage`)
    pub name: String,
    /// Mutator arguments, exactly as applied locally
    pub args: Value,
}

/// Body of a push request
#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    #[serde(rename = "clientID")]
    pub client_id: &'a str,
    pub mutations: &'a [MutationRecord],
    #[serde(rename = "pushVersion")]
    pub push_version: u64,
}

/// Body of a pull request
#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    #[serde(rename = "clientID")]
    pub client_id: &'a str,
    pub cookie: Option<&'a Value>,
    #[serde(rename = "pullVersion")]
    pub pull_version: u64,
}

/// Body of a pull response
#[derive(Debug, Clone, Deserialize)]
pub struct PullResponse {
    /// Opaque resume point, echoed back on the next pull
    #[serde(default)]
    pub cookie: Option<Value>,
    /// Highest mutation id the server has applied for this client
    #[serde(rename = "lastMutationID")]
    pub last_mutation_id: u64,
    /// Key-value operations bringing the local namespace up to date
    #[serde(default)]
    pub patch: Vec<PatchOp>,
}

/// A single pull patch operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Set a key to a value
    Put { key: String, value: Value },
    /// Remove a key
    Del { key: String },
    /// Drop the entire namespace (sent before a full resync)
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_request_wire_casing() {
        let mutations = vec![MutationRecord {
            id: 1,
            name: "createMessage".to_string(),
            args: json!({"id": "a1", "title": "Buy milk", "order": 1.0}),
        }];
        let request = PushRequest {
            client_id: "client-1",
            mutations: &mutations,
            push_version: PUSH_VERSION,
        };

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["clientID"], "client-1");
        assert_eq!(wire["pushVersion"], 1);
        assert_eq!(wire["mutations"][0]["name"], "createMessage");
        assert_eq!(wire["mutations"][0]["id"], 1);
    }

    #[test]
    fn test_pull_request_wire_casing() {
        let cookie = json!(42);
        let request = PullRequest {
            client_id: "client-1",
            cookie: Some(&cookie),
            pull_version: PULL_VERSION,
        };

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["clientID"], "client-1");
        assert_eq!(wire["cookie"], 42);
        assert_eq!(wire["pullVersion"], 1);
    }

    #[test]
    fn test_pull_response_decoding() {
        let body = json!({
            "cookie": 7,
            "lastMutationID": 3,
            "patch": [
                {"op": "clear"},
                {"op": "put", "key": "message/a1", "value": {"title": "Buy milk", "completed": false, "order": 1.0}},
                {"op": "del", "key": "message/a2"}
            ]
        });

        let response: PullResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.last_mutation_id, 3);
        assert_eq!(response.cookie, Some(json!(7)));
        assert_eq!(response.patch.len(), 3);
        assert_eq!(response.patch[0], PatchOp::Clear);
        assert!(matches!(&response.patch[1], PatchOp::Put { key, .. } if key == "message/a1"));
        assert!(matches!(&response.patch[2], PatchOp::Del { key } if key == "message/a2"));
    }

    #[test]
    fn test_pull_response_defaults() {
        // A minimal response carries no patch and no cookie
        let response: PullResponse =
            serde_json::from_value(json!({"lastMutationID": 0})).unwrap();
        assert!(response.patch.is_empty());
        assert!(response.cookie.is_none());
    }
}
