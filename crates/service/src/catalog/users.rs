use serde_json::Value;
use tracing::{debug, info, instrument};

use super::domain::{new_user, normalize_email, now_iso, Record, UserData, UserDirectory};
use super::{CatalogService, USERS};
use crate::errors::ServiceError;
use crate::storage::Outcome;

/// Directory key for an upserted user: `id`, else `email`.
fn user_key(payload: &Record) -> Option<String> {
    ["id", "email"].iter().find_map(|field| {
        payload
            .get(*field)
            .and_then(Value::as_str)
            .and_then(normalize_email)
            .map(str::to_string)
    })
}

/// Stored password as text. `null` and `""` mean none; other non-string
/// values compare by their JSON rendering.
fn stored_password(user: &Record) -> Option<String> {
    match user.get("password")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn require_email(email: &str) -> Result<&str, ServiceError> {
    normalize_email(email).ok_or_else(|| ServiceError::Validation("email is required".into()))
}

impl CatalogService {
    pub async fn list_users(&self) -> Result<UserDirectory, ServiceError> {
        self.store.load(USERS, UserDirectory::new()).await
    }

    pub async fn get_user(&self, id: &str) -> Result<Record, ServiceError> {
        self.list_users()
            .await?
            .remove(id)
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Store `payload` under its `id` (or `email`), replacing any existing entry wholesale.
    #[instrument(skip(self, payload))]
    pub async fn upsert_user(&self, mut payload: Record) -> Result<Record, ServiceError> {
        let key = user_key(&payload)
            .ok_or_else(|| ServiceError::Validation("user requires an `id` or `email`".into()))?;
        payload.insert("created_at".into(), Value::String(now_iso()));

        let user = self
            .store
            .with_lock(USERS, UserDirectory::new(), |users| {
                users.insert(key.clone(), payload.clone());
                Ok(Outcome::Write(payload))
            })
            .await?;
        info!(user_key = %key, "user_upserted");
        Ok(user)
    }

    /// Log in, registering the email on first sight.
    ///
    /// A stored non-empty password must match exactly; non-string stored
    /// values match their JSON text (`1234` matches `"1234"`). Passwords are kept in
    /// plain text; this is a compatibility shim, not an auth system.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: Option<&str>) -> Result<Record, ServiceError> {
        let email = require_email(email)?;
        self.store
            .with_lock(USERS, UserDirectory::new(), |users| {
                if let Some(user) = users.get(email) {
                    let stored = stored_password(user);
                    if stored.is_some() && stored.as_deref() != password {
                        debug!("password mismatch");
                        return Err(ServiceError::Auth("invalid credentials".into()));
                    }
                    return Ok(Outcome::Keep(user.clone()));
                }
                let user = new_user(email, password);
                users.insert(email.to_string(), user.clone());
                info!("user_registered_on_login");
                Ok(Outcome::Write(user))
            })
            .await
    }

    /// Create a user; `Conflict` when the email is already known.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: Option<&str>) -> Result<Record, ServiceError> {
        let email = require_email(email)?;
        self.store
            .with_lock(USERS, UserDirectory::new(), |users| {
                if users.contains_key(email) {
                    return Err(ServiceError::Conflict("user already exists".into()));
                }
                let user = new_user(email, password);
                users.insert(email.to_string(), user.clone());
                info!("user_registered");
                Ok(Outcome::Write(user))
            })
            .await
    }

    /// Apps and robots of a user. Unknown or blank emails read as empty lists.
    pub async fn get_user_data(&self, email: Option<&str>) -> Result<UserData, ServiceError> {
        let Some(email) = email.and_then(normalize_email) else {
            return Ok(UserData::default());
        };
        let users = self.list_users().await?;
        Ok(users.get(email).map(UserData::from_record).unwrap_or_default())
    }

    /// Replace a user's `apps` and `robots`, leaving other fields alone.
    /// Unknown emails get a fresh entry.
    #[instrument(skip(self, data), fields(apps = data.apps.len(), robots = data.robots.len()))]
    pub async fn update_user_data(&self, email: &str, data: UserData) -> Result<UserData, ServiceError> {
        let email = require_email(email)?;
        self.store
            .with_lock(USERS, UserDirectory::new(), |users| {
                let user = users.entry(email.to_string()).or_insert_with(|| new_user(email, None));
                user.insert("apps".into(), Value::Array(data.apps.clone()));
                user.insert("robots".into(), Value::Array(data.robots.clone()));
                Ok(Outcome::Write(data))
            })
            .await
    }
}
