use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication state of a project. Only `Publish` projects are reachable
/// through the public query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    Private,
    Publish,
}

impl Privacy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Private => "Private",
            Privacy::Publish => "Publish",
        }
    }

    /// Parses the stored text form. Unknown values fall back to `Private`,
    /// the safe default, with an error log.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "Private" => Privacy::Private,
            "Publish" => Privacy::Publish,
            other => {
                tracing::error!("Invalid privacy value in database: '{}'", other);
                Privacy::Private
            }
        }
    }
}

/// A logical tenant: a named, password-protected unit owning exactly one
/// backend database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Operator-chosen secret, stored verbatim. Never serialized.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password: String,
    pub privacy: Privacy,
    /// Backend database name, derived from `name` at creation and immutable
    /// afterwards.
    pub backend_db: String,
    /// Public-path access key. Absent until explicitly generated; a single
    /// active value that is overwritten on regeneration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operator credential. The raw token is shown once at creation; only the
/// argon2 hash and a short lookup prefix are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}
