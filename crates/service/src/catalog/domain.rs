use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema-less record: string keys in insertion order, arbitrary JSON values.
pub type Record = serde_json::Map<String, Value>;

/// Users keyed by identifier (email or explicit id).
pub type UserDirectory = BTreeMap<String, Record>;

/// Per-user lists served to legacy clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub apps: Vec<Value>,
    #[serde(default)]
    pub robots: Vec<Value>,
}

impl UserData {
    /// Pull `apps`/`robots` out of a user record; anything missing or not a list reads as empty.
    pub fn from_record(user: &Record) -> Self {
        let list = |field: &str| user.get(field).and_then(Value::as_array).cloned().unwrap_or_default();
        Self { apps: list("apps"), robots: list("robots") }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub apps_count: usize,
    pub users_count: usize,
}

/// Current UTC time as an RFC 3339 timestamp.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fresh user entry as created by login, registration or a first list update.
pub fn new_user(email: &str, password: Option<&str>) -> Record {
    let mut user = Record::new();
    user.insert("email".into(), Value::String(email.to_string()));
    user.insert("apps".into(), Value::Array(Vec::new()));
    user.insert("robots".into(), Value::Array(Vec::new()));
    let password = password.filter(|p| !p.is_empty()).map(|p| Value::String(p.to_string()));
    user.insert("password".into(), password.unwrap_or(Value::Null));
    user.insert("created_at".into(), Value::String(now_iso()));
    user
}

/// Trimmed, non-empty email or `None`.
pub fn normalize_email(email: &str) -> Option<&str> {
    Some(email.trim()).filter(|e| !e.is_empty())
}
