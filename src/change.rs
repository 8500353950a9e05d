//! The outcome of reconciling one imported key against the database.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Classification of one imported key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Value and status are the same on both sides.
    NoChange,

    /// The imported master text differs from the database master text.
    MasterValueChanged,

    /// Same value, but the imported status is lower than the database one.
    ImportedStatusOlder,

    /// Same value, but the imported status is higher than the database one.
    ImportedStatusNewer,

    /// The key exists but has no value for the imported language.
    LanguageAddition,

    /// The key exists but has no value for the master language.
    MasterLanguageAddition,

    /// Different value, same status.
    ValueChanged,

    /// Different value and different status.
    ValueAndStatusChanged,

    /// The key does not exist in the database.
    KeyAddition,
}

impl ChangeType {
    /// Additions are developer-only operations and are never applied.
    pub fn is_addition(self) -> bool {
        matches!(
            self,
            ChangeType::KeyAddition
                | ChangeType::LanguageAddition
                | ChangeType::MasterLanguageAddition
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::NoChange => "no_change",
            ChangeType::MasterValueChanged => "master_value_changed",
            ChangeType::ImportedStatusOlder => "imported_status_older",
            ChangeType::ImportedStatusNewer => "imported_status_newer",
            ChangeType::LanguageAddition => "language_addition",
            ChangeType::MasterLanguageAddition => "master_language_addition",
            ChangeType::ValueChanged => "value_changed",
            ChangeType::ValueAndStatusChanged => "value_and_status_changed",
            ChangeType::KeyAddition => "key_addition",
        }
    }

    /// Human readable description for reports.
    pub fn description(self) -> &'static str {
        match self {
            ChangeType::NoChange => "No change",
            ChangeType::MasterValueChanged => "Master value changed",
            ChangeType::ImportedStatusOlder => "Imported status older",
            ChangeType::ImportedStatusNewer => "Imported status newer",
            ChangeType::LanguageAddition => "Language addition",
            ChangeType::MasterLanguageAddition => "Master language addition",
            ChangeType::ValueChanged => "Value changed",
            ChangeType::ValueAndStatusChanged => "Value and status changed",
            ChangeType::KeyAddition => "Key addition",
        }
    }
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Whether a change may be written to the database, and what gets written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ConflictDecision {
    /// The change must not be applied without someone looking at it.
    pub conflicting: bool,

    /// The change may be applied at all.
    pub acceptable: bool,

    /// The change will be applied. Only meaningful when `acceptable`.
    pub accept: bool,

    pub accept_value: String,

    pub accept_status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub accept_master_value: Option<String>,
}

/// One reconciled key: what the import says, what the database says, and
/// the decision taken on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub change_type: ChangeType,

    pub key: String,

    /// Context of the database text node, if the key exists there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    pub language: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_language: Option<String>,

    pub imported_value: String,

    pub imported_status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_master_value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_status: Option<Status>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_master_value: Option<String>,

    #[serde(flatten)]
    decision: ConflictDecision,
}

impl Change {
    /// Creates an undecided change: nothing is conflicting, acceptable or
    /// accepted until a decision is attached.
    pub(crate) fn new(
        change_type: ChangeType,
        key: impl Into<String>,
        language: impl Into<String>,
        imported_value: impl Into<String>,
        imported_status: Status,
    ) -> Self {
        let imported_value = imported_value.into();
        Change {
            change_type,
            key: key.into(),
            context: None,
            language: language.into(),
            master_language: None,
            decision: ConflictDecision {
                accept_value: imported_value.clone(),
                accept_status: imported_status,
                ..ConflictDecision::default()
            },
            imported_value,
            imported_status,
            imported_master_value: None,
            db_value: None,
            db_status: None,
            db_master_value: None,
        }
    }

    /// Attaches a decision. `accept` is cleared when the change is not
    /// acceptable.
    pub fn with_decision(mut self, decision: ConflictDecision) -> Self {
        let accept = decision.acceptable && decision.accept;
        self.decision = ConflictDecision { accept, ..decision };
        self
    }

    pub fn decision(&self) -> &ConflictDecision {
        &self.decision
    }

    pub fn has_master_language(&self) -> bool {
        self.master_language.is_some()
    }

    pub fn is_conflicting(&self) -> bool {
        self.decision.conflicting
    }

    pub fn is_acceptable(&self) -> bool {
        self.decision.acceptable
    }

    pub fn is_accept(&self) -> bool {
        self.decision.acceptable && self.decision.accept
    }

    /// Accepts or rejects the change. Has no effect on a change that is not
    /// acceptable.
    pub fn set_accept(&mut self, accept: bool) {
        self.decision.accept = self.decision.acceptable && accept;
    }

    pub fn accept_value(&self) -> &str {
        &self.decision.accept_value
    }

    pub fn accept_status(&self) -> Status {
        self.decision.accept_status
    }

    pub fn accept_master_value(&self) -> Option<&str> {
        self.decision.accept_master_value.as_deref()
    }

    /// Whether applying this change writes anything.
    pub fn is_applicable(&self) -> bool {
        self.is_accept() && !self.change_type.is_addition()
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Change {{ key: {}, language: {}, type: {}, conflicting: {}, accept: {} }}",
            self.key,
            self.language,
            self.change_type.as_str(),
            self.is_conflicting(),
            self.is_accept()
        )
    }
}
