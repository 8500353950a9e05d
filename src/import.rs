//! In-memory import source shared by all file readers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{status::Status, traits::ImportSource};

/// One imported row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImportRecord {
    pub key: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub master_value: Option<String>,
    pub value: String,
}

/// An insertion-ordered [`ImportSource`].
///
/// Adding a key twice keeps the first position and the last record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportFile {
    language: String,
    master_language: Option<String>,
    records: Vec<ImportRecord>,
    index: HashMap<String, usize>,
}

impl ImportFile {
    pub fn new(language: impl Into<String>, master_language: Option<String>) -> Self {
        ImportFile {
            language: language.into(),
            master_language,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add(
        &mut self,
        key: impl Into<String>,
        status: Status,
        master_value: Option<String>,
        value: impl Into<String>,
    ) {
        let record = ImportRecord {
            key: key.into(),
            status,
            master_value,
            value: value.into(),
        };
        match self.index.get(&record.key) {
            Some(&position) => self.records[position] = record,
            None => {
                self.index.insert(record.key.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Builder form of [`ImportFile::add`].
    pub fn with(
        mut self,
        key: impl Into<String>,
        status: Status,
        master_value: Option<&str>,
        value: impl Into<String>,
    ) -> Self {
        self.add(key, status, master_value.map(str::to_string), value);
        self
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    pub fn record(&self, key: &str) -> Option<&ImportRecord> {
        self.index.get(key).map(|&position| &self.records[position])
    }
}

impl ImportSource for ImportFile {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.key.as_str()).collect()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn master_language(&self) -> Option<&str> {
        self.master_language.as_deref()
    }

    fn status(&self, key: &str) -> Option<Status> {
        self.record(key).map(|r| r.status)
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.record(key).map(|r| r.value.as_str())
    }

    fn master_value(&self, key: &str) -> Option<&str> {
        self.record(key).and_then(|r| r.master_value.as_deref())
    }
}
