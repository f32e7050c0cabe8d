//! Action taxonomy
//!
//! Action identifiers are hierarchical by underscore-separated tokens
//! (`text_encryption` and `encryption_error` both belong to the encryption
//! group). Known identifiers map to a category through an explicit table;
//! unknown ones fall back to token matching, never raw substring search, so
//! `relogin_hint` is not a login and `decryption` is not an encryption.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every action the producers are known to emit, plus an escape hatch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Login,
    Logout,
    Register,
    SessionStart,
    ClientSessionStart,
    AdminSessionStart,
    ClientLogout,
    AdminLogout,
    ClientWindowClosed,
    AdminWindowClosed,
    FileAccess,
    FileAccessError,
    FileClear,
    TextEncryption,
    TextDecryption,
    EncryptionError,
    DecryptionError,
    CopyEncrypted,
    CopyDecrypted,
    AdminToggleRefresh,
    AdminClearLogs,
    AdminClearLogsError,
    AdminExportData,
    AdminExportError,
    AdminCreateBackup,
    AdminBackupError,
    /// Any identifier not in the table above
    Other(String),
}

/// Coarse grouping used by session reconstruction and activity summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Login,
    Logout,
    Registration,
    FileAccess,
    Encryption,
    Decryption,
    Clipboard,
    Admin,
    Other,
}

const KNOWN: &[(&str, Action)] = &[
    ("login", Action::Login),
    ("logout", Action::Logout),
    ("register", Action::Register),
    ("session_start", Action::SessionStart),
    ("client_session_start", Action::ClientSessionStart),
    ("admin_session_start", Action::AdminSessionStart),
    ("client_logout", Action::ClientLogout),
    ("admin_logout", Action::AdminLogout),
    ("client_window_closed", Action::ClientWindowClosed),
    ("admin_window_closed", Action::AdminWindowClosed),
    ("file_access", Action::FileAccess),
    ("file_access_error", Action::FileAccessError),
    ("file_clear", Action::FileClear),
    ("text_encryption", Action::TextEncryption),
    ("text_decryption", Action::TextDecryption),
    ("encryption_error", Action::EncryptionError),
    ("decryption_error", Action::DecryptionError),
    ("copy_encrypted", Action::CopyEncrypted),
    ("copy_decrypted", Action::CopyDecrypted),
    ("admin_toggle_refresh", Action::AdminToggleRefresh),
    ("admin_clear_logs", Action::AdminClearLogs),
    ("admin_clear_logs_error", Action::AdminClearLogsError),
    ("admin_export_data", Action::AdminExportData),
    ("admin_export_error", Action::AdminExportError),
    ("admin_create_backup", Action::AdminCreateBackup),
    ("admin_backup_error", Action::AdminBackupError),
];

impl Action {
    /// Parse an identifier; unknown identifiers become `Other`
    pub fn parse(raw: &str) -> Self {
        KNOWN
            .iter()
            .find(|(id, _)| *id == raw)
            .map(|(_, action)| action.clone())
            .unwrap_or_else(|| Action::Other(raw.to_string()))
    }

    /// The persisted identifier
    pub fn as_str(&self) -> &str {
        if let Action::Other(raw) = self {
            return raw;
        }
        KNOWN
            .iter()
            .find(|(_, action)| action == self)
            .map(|(id, _)| *id)
            .unwrap_or("unknown")
    }

    pub fn category(&self) -> ActionCategory {
        use Action::*;

        match self {
            Login | SessionStart | ClientSessionStart | AdminSessionStart => ActionCategory::Login,
            Logout | ClientLogout | AdminLogout => ActionCategory::Logout,
            Register => ActionCategory::Registration,
            FileAccess | FileAccessError => ActionCategory::FileAccess,
            TextEncryption | EncryptionError => ActionCategory::Encryption,
            TextDecryption | DecryptionError => ActionCategory::Decryption,
            CopyEncrypted | CopyDecrypted => ActionCategory::Clipboard,
            AdminToggleRefresh | AdminClearLogs | AdminClearLogsError | AdminExportData
            | AdminExportError | AdminCreateBackup | AdminBackupError => ActionCategory::Admin,
            ClientWindowClosed | AdminWindowClosed | FileClear => ActionCategory::Other,
            Other(raw) => categorize_tokens(raw),
        }
    }

    /// Whether this identifier records a failure (`*_error`)
    pub fn is_error(&self) -> bool {
        tokens(self.as_str()).last() == Some("error")
    }
}

fn tokens(raw: &str) -> impl DoubleEndedIterator<Item = &str> {
    raw.split(|c: char| c == '_' || c == '.' || c == '-' || c == ':')
        .filter(|t| !t.is_empty())
}

fn categorize_tokens(raw: &str) -> ActionCategory {
    let lowered = raw.to_ascii_lowercase();
    let parts: Vec<&str> = tokens(&lowered).collect();
    let has = |t: &str| parts.iter().any(|p| *p == t);
    let has_pair = |a: &str, b: &str| parts.windows(2).any(|w| w[0] == a && w[1] == b);

    if has("logout") {
        ActionCategory::Logout
    } else if has("login") || has_pair("session", "start") {
        ActionCategory::Login
    } else if has("decryption") {
        ActionCategory::Decryption
    } else if has("encryption") {
        ActionCategory::Encryption
    } else if has_pair("file", "access") {
        ActionCategory::FileAccess
    } else if has("register") {
        ActionCategory::Registration
    } else {
        ActionCategory::Other
    }
}

impl From<String> for Action {
    fn from(raw: String) -> Self {
        match Action::parse(&raw) {
            Action::Other(_) => Action::Other(raw),
            known => known,
        }
    }
}

impl From<&str> for Action {
    fn from(raw: &str) -> Self {
        Action::parse(raw)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
