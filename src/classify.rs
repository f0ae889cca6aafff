use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureStatus {
    Signed,
    Unsigned,
    Cheat,
    /// File missing, unreadable, or never evaluated.
    #[default]
    NotFound,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self { SignatureStatus::Signed => "Signed", SignatureStatus::Unsigned => "Unsigned", SignatureStatus::Cheat => "Cheat", SignatureStatus::NotFound => "NotFound" }
    }

    pub fn is_suspect(&self) -> bool { matches!(self, SignatureStatus::Unsigned | SignatureStatus::Cheat) }
}

/// What a collaborator hands back. `Unavailable` covers missing files, I/O errors and
/// anything else that kept the collaborator from producing an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Outcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self { Outcome::Unavailable(reason.into()) }

    /// Collapses to the value, or to `fallback` when unavailable, logging the reason.
    pub fn or_degrade(self, fallback: T, path: &str) -> T {
        match self {
            Outcome::Available(v) => v,
            Outcome::Unavailable(reason) => {
                log::debug!("classification unavailable for {}: {}", path, reason);
                fallback
            }
        }
    }
}

pub trait SignatureClassifier: Send + Sync {
    fn classify(&self, path: &str) -> Outcome<SignatureStatus>;
}

pub trait ContentScanner: Send + Sync {
    /// Must report `Available(false)` for paths that do not exist.
    fn scan(&self, path: &str) -> Outcome<bool>;
}

pub trait SessionClock {
    fn session_start(&self) -> Option<DateTime<Utc>>;
}

/// Run-mode filters, fixed for the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFilters {
    pub only_after_session: bool,
    pub only_suspect: bool,
}

impl ScanFilters {
    pub fn any(&self) -> bool { self.only_after_session || self.only_suspect }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub execution_time: DateTime<Utc>,
    pub path: String,
    pub signature: SignatureStatus,
    pub matched: bool,
}

impl ClassificationResult {
    pub fn unevaluated(execution_time: DateTime<Utc>, path: String) -> Self {
        Self { execution_time, path, signature: SignatureStatus::NotFound, matched: false }
    }

    pub fn is_flagged(&self) -> bool { self.signature == SignatureStatus::Cheat || self.matched }
}
