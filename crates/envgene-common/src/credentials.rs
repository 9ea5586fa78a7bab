use std::collections::HashMap;
use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIELD_USERNAME: &str = "username";
const FIELD_PASSWORD: &str = "password";
const FIELD_SECRET: &str = "secret";

/// Credential shapes understood by the resolvers. Raw credential store
/// entries are decoded into one of these once, at the boundary.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username/password pair. Either half may be empty; callers that need
    /// both check for it.
    UsernamePassword { username: String, password: String },
    /// An opaque provider secret, such as a GCP service account key.
    Secret(SecretPayload),
    /// No usable credential material.
    Anonymous,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }

    /// Username/password halves, if this is a username/password credential
    /// with both halves filled in.
    pub fn username_password(&self) -> Option<(&str, &str)> {
        match self {
            Credentials::UsernamePassword { username, password }
                if !username.is_empty() && !password.is_empty() =>
            {
                Some((username, password))
            }
            _ => None,
        }
    }

    pub fn secret(&self) -> Option<&SecretPayload> {
        match self {
            Credentials::Secret(secret) => Some(secret),
            _ => None,
        }
    }

    /// Decodes a raw credential store entry.
    pub fn from_entry(entry: &CredentialEntry) -> Self {
        let payload = entry.payload();
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        match entry.kind.as_deref() {
            Some("usernamePassword") => {
                Self::username_password_or_anonymous(text(FIELD_USERNAME), text(FIELD_PASSWORD))
            }
            Some("secret") => {
                let secret = payload
                    .get(FIELD_SECRET)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(payload.clone()));
                Self::secret_or_anonymous(SecretPayload(secret))
            }
            _ => {
                let (username, password) = (text(FIELD_USERNAME), text(FIELD_PASSWORD));
                if !username.is_empty() || !password.is_empty() {
                    Self::UsernamePassword { username, password }
                } else if let Some(secret) = payload.get(FIELD_SECRET) {
                    Self::secret_or_anonymous(SecretPayload(secret.clone()))
                } else {
                    Self::Anonymous
                }
            }
        }
    }

    fn username_password_or_anonymous(username: String, password: String) -> Self {
        if username.is_empty() && password.is_empty() {
            Self::Anonymous
        } else {
            Self::UsernamePassword { username, password }
        }
    }

    fn secret_or_anonymous(secret: SecretPayload) -> Self {
        if secret.is_empty() {
            Self::Anonymous
        } else {
            Self::Secret(secret)
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => {
                f.write_fmt(format_args!("UsernamePassword(username={username},password=***)"))
            }
            Self::Secret(_) => f.write_str("Secret(***)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Secret material. Either a JSON string or an inline JSON document.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPayload(Value);

impl SecretPayload {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Object(o) => o.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        }
    }

    /// The secret as text. Inline documents are serialized to JSON.
    pub fn as_json_string(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretPayload(***)")
    }
}

/// One raw entry of the credential store: `{ type, data }`. Entries
/// without `data` are their own payload.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CredentialEntry {
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: Some("usernamePassword".into()),
            data: Some(serde_json::json!({
                "username": username.into(),
                "password": password.into(),
            })),
            rest: Map::new(),
        }
    }

    pub fn secret(secret: impl Into<String>) -> Self {
        Self {
            kind: Some("secret".into()),
            data: Some(serde_json::json!({ "secret": secret.into() })),
            rest: Map::new(),
        }
    }

    fn payload(&self) -> Map<String, Value> {
        match &self.data {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => Map::new(),
            None => self.rest.clone(),
        }
    }
}

impl Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The caller-supplied credential store, keyed by credential id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvCreds(HashMap<String, CredentialEntry>);

impl EnvCreds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, entry: CredentialEntry) -> Self {
        self.0.insert(id.into(), entry);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: CredentialEntry) {
        self.0.insert(id.into(), entry);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decoded credentials for `id`, or `None` if the store has no such
    /// entry.
    pub fn get(&self, id: &str) -> Option<Credentials> {
        self.0.get(id).map(Credentials::from_entry)
    }
}

impl FromIterator<(String, CredentialEntry)> for EnvCreds {
    fn from_iter<T: IntoIterator<Item = (String, CredentialEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
