//! Banking user and TAN method models.

use serde::{Deserialize, Serialize};

/// A user (Benutzer) configured in the banking backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Login / user identifier (Benutzerkennung).
    pub user_id: String,
    /// Display name.
    pub user_name: String,
    /// Bank code (BLZ) the user belongs to.
    pub bank_code: String,
}

/// A TAN method offered by the bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TanMethod {
    /// Numeric-looking method identifier, kept as text.
    pub id: String,
    /// Human-readable method name.
    pub name: String,
}
