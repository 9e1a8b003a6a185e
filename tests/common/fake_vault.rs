//! A minimal Vault KV v2 mount served by wiremock.
//!
//! Supports read, write, metadata delete and list on `/v1/<mount>/...`, with
//! secrets kept in memory so tests can inspect what the backend wrote.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const MOUNT: &str = "secret";

#[derive(Clone, Default)]
pub struct FakeVault {
    secrets: Arc<Mutex<BTreeMap<String, Map<String, Value>>>>,
}

impl FakeVault {
    /// Start a mock server answering for the `secret` mount.
    pub async fn start() -> (MockServer, FakeVault) {
        let server = MockServer::start().await;
        let vault = FakeVault::default();

        Mock::given(path_regex(format!("^/v1/{}/(data|metadata)/.*", MOUNT)))
            .respond_with(vault.clone())
            .mount(&server)
            .await;

        (server, vault)
    }

    /// Fields of the secret at `path`.
    pub fn secret(&self, path: &str) -> Option<Map<String, Value>> {
        self.secrets.lock().unwrap().get(path).cloned()
    }

    pub fn insert(&self, path: &str, fields: Value) {
        if let Value::Object(fields) = fields {
            self.secrets.lock().unwrap().insert(path.to_string(), fields);
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.secrets.lock().unwrap().keys().cloned().collect()
    }
}

fn envelope(data: Value) -> Value {
    json!({
        "request_id": "00000000-0000-0000-0000-000000000000",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": data,
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
}

fn version_metadata() -> Value {
    json!({
        "created_time": "2024-01-01T00:00:00.000000Z",
        "custom_metadata": null,
        "deletion_time": "",
        "destroyed": false,
        "version": 1
    })
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"errors": []}))
}

impl Respond for FakeVault {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let url_path = request.url.path();
        let (kind, path) = match url_path
            .strip_prefix(&format!("/v1/{}/", MOUNT))
            .and_then(|rest| rest.split_once('/'))
        {
            Some(split) => split,
            None => return not_found(),
        };
        let path = path.trim_end_matches('/').to_string();
        let mut secrets = self.secrets.lock().unwrap();

        match (request.method.as_str(), kind) {
            ("GET", "data") => match secrets.get(&path) {
                Some(fields) => ResponseTemplate::new(200).set_body_json(envelope(json!({
                    "data": fields,
                    "metadata": version_metadata()
                }))),
                None => not_found(),
            },
            ("POST", "data") | ("PUT", "data") => {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                match body.get("data") {
                    Some(Value::Object(fields)) => {
                        secrets.insert(path, fields.clone());
                        ResponseTemplate::new(200).set_body_json(envelope(version_metadata()))
                    }
                    _ => ResponseTemplate::new(400).set_body_json(json!({"errors": ["no data"]})),
                }
            }
            ("DELETE", "metadata") => {
                if secrets.remove(&path).is_some() {
                    ResponseTemplate::new(204)
                } else {
                    not_found()
                }
            }
            ("LIST", "metadata") | ("GET", "metadata") => {
                let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
                let mut keys: Vec<String> = secrets
                    .keys()
                    .filter_map(|key| key.strip_prefix(&prefix))
                    .map(|rest| match rest.split_once('/') {
                        Some((dir, _)) => format!("{}/", dir),
                        None => rest.to_string(),
                    })
                    .collect();
                keys.dedup();
                if keys.is_empty() {
                    not_found()
                } else {
                    ResponseTemplate::new(200).set_body_json(envelope(json!({"keys": keys})))
                }
            }
            _ => ResponseTemplate::new(405).set_body_json(json!({"errors": ["unsupported"]})),
        }
    }
}
