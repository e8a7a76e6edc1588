use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One tracked account: upstream credentials plus where notifications go.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub username: String,
    pub password: String,
    pub receiver_email: String,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("receiver_email", &self.receiver_email)
            .finish()
    }
}

/// Bearer token returned by the identity provider. Lives for one cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Text keyed by locale code (`en`, `fr`, ...).
pub type LocalizedText = BTreeMap<String, String>;

/// A named sub-step of an application (e.g. "language", "background").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub activity: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of the application's event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Epoch milliseconds. Also the identity of the event when diffing.
    pub time: i64,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub text: LocalizedText,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Snapshot of one application as returned by `get-application-details`.
///
/// Unknown upstream fields are kept in `extra` so the persisted copy is the
/// full snapshot, not just the fields this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub application_number: String,
    pub status: String,
    /// Epoch milliseconds; the authoritative change signal.
    pub last_updated_time: i64,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Identity of a persisted status record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub username: String,
    pub application_number: String,
}

impl StateKey {
    pub fn new(username: impl Into<String>, application_number: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            application_number: application_number.into(),
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.username, self.application_number)
    }
}

/// Rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}
