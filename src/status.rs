//! The status lifecycle of a translated value.
//!
//! Statuses form a closed, totally ordered set. The position of a status is
//! both its identity and its index in the ascending list of all statuses, so
//! positions are zero-based and gap-less:
//!
//! `Initial (0) < Translated (1) < Verified (2) < Special (3) < Undefined (4)`

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Status of a single value in the resource database.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// The value has not been translated yet.
    Initial,

    /// The value has been translated but nobody checked it.
    Translated,

    /// The value has been translated and reviewed.
    Verified,

    /// Developer-owned text that translators must not touch.
    Special,

    /// Fallback for any unrecognised status name.
    #[default]
    Undefined,
}

const ALL: [Status; 5] = [
    Status::Initial,
    Status::Translated,
    Status::Verified,
    Status::Special,
    Status::Undefined,
];

impl Status {
    /// Lowercase name as used in the database and in exported files.
    pub fn name(self) -> &'static str {
        match self {
            Status::Initial => "initial",
            Status::Translated => "translated",
            Status::Verified => "verified",
            Status::Special => "special",
            Status::Undefined => "undefined",
        }
    }

    /// Zero-based position in the ascending order.
    pub fn position(self) -> usize {
        match self {
            Status::Initial => 0,
            Status::Translated => 1,
            Status::Verified => 2,
            Status::Special => 3,
            Status::Undefined => 4,
        }
    }

    /// Compares two statuses by position.
    pub fn compare(a: Status, b: Status) -> Ordering {
        a.position().cmp(&b.position())
    }

    /// Looks a status up by its exact name. Never fails: unknown names map
    /// to [`Status::Undefined`].
    pub fn by_name(name: &str) -> Status {
        ALL.iter()
            .copied()
            .find(|status| status.name() == name)
            .unwrap_or(Status::Undefined)
    }

    /// Looks a status up by its position.
    pub fn by_position(position: usize) -> Option<Status> {
        ALL.get(position).copied()
    }

    /// All statuses in ascending order.
    pub fn all() -> &'static [Status] {
        &ALL
    }

    /// All status names in ascending order of their status.
    pub fn names() -> Vec<&'static str> {
        ALL.iter().map(|status| status.name()).collect()
    }

    /// Parses a comma separated list such as `"translated,verified"`.
    ///
    /// Blank items are skipped, unknown names become `Undefined`.
    pub fn parse_list(list: &str) -> Vec<Status> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Status::by_name)
            .collect()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Status::by_name(s))
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::by_name(&value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.name().to_string()
    }
}
