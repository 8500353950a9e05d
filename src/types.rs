//! The in-memory resource database.
//!
//! A [`Database`] owns an ordered list of [`TextNode`]s, each holding one
//! [`ValueNode`] per language. The master language's value on a node is the
//! original text the other languages translate.

use std::{
    collections::{BTreeSet, HashSet},
    fmt::Display,
    sync::mpsc::{self, Receiver, Sender},
};

use serde::{Deserialize, Serialize};

use crate::{error::Error, status::Status, traits::Parser};

/// The value of one text in one language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValueNode {
    pub language: String,
    pub status: Status,
    pub value: String,
}

impl ValueNode {
    pub fn new(language: impl Into<String>, status: Status, value: impl Into<String>) -> Self {
        ValueNode {
            language: language.into(),
            status,
            value: value.into(),
        }
    }
}

impl Display for ValueNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.language, self.status, self.value)
    }
}

/// A keyed text with its translations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextNode {
    /// Unique key of the text within its database.
    pub key: String,

    /// Free-form hint for translators. Display only.
    #[serde(default)]
    pub context: String,

    /// One value per language, in insertion order.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueNode>,
}

impl TextNode {
    pub fn new(key: impl Into<String>, context: impl Into<String>) -> Self {
        TextNode {
            key: key.into(),
            context: context.into(),
            values: Vec::new(),
        }
    }

    /// Builder form of [`TextNode::add_value_node`].
    pub fn with_value(
        mut self,
        language: impl Into<String>,
        status: Status,
        value: impl Into<String>,
    ) -> Self {
        self.add_value_node(ValueNode::new(language, status, value));
        self
    }

    /// Adds a value, replacing and returning any value already stored for
    /// the same language.
    pub fn add_value_node(&mut self, value_node: ValueNode) -> Option<ValueNode> {
        match self
            .values
            .iter_mut()
            .find(|v| v.language == value_node.language)
        {
            Some(existing) => Some(std::mem::replace(existing, value_node)),
            None => {
                self.values.push(value_node);
                None
            }
        }
    }

    pub fn value_node(&self, language: &str) -> Option<&ValueNode> {
        self.values.iter().find(|v| v.language == language)
    }

    pub fn value_node_mut(&mut self, language: &str) -> Option<&mut ValueNode> {
        self.values.iter_mut().find(|v| v.language == language)
    }

    pub fn remove_value_node(&mut self, language: &str) -> Option<ValueNode> {
        let index = self.values.iter().position(|v| v.language == language)?;
        Some(self.values.remove(index))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.language.as_str())
    }
}

/// Notification published by a [`Database`] after it was modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    MasterLanguageChanged { language: String },
    TextNodeAdded { key: String },
    TextNodeRemoved { key: String },
    ValueNodeAdded { key: String, language: String },
    ValueNodeChanged { key: String, language: String },
    ValueNodeRemoved { key: String, language: String },
}

/// The text resource database.
///
/// Modifications made through the `Database` methods are published to every
/// receiver obtained from [`Database::subscribe`]. Edits made through a
/// `&mut TextNode` handle are not published.
#[derive(Debug, Deserialize, Serialize)]
pub struct Database {
    master_language: String,

    #[serde(default)]
    text_nodes: Vec<TextNode>,

    #[serde(skip)]
    subscribers: Vec<Sender<DatabaseEvent>>,
}

impl Clone for Database {
    /// Clones the data only; subscribers stay with the original.
    fn clone(&self) -> Self {
        Database {
            master_language: self.master_language.clone(),
            text_nodes: self.text_nodes.clone(),
            subscribers: Vec::new(),
        }
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.master_language == other.master_language && self.text_nodes == other.text_nodes
    }
}

impl Eq for Database {}

impl Database {
    pub fn new(master_language: impl Into<String>) -> Self {
        Database {
            master_language: master_language.into(),
            text_nodes: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn master_language(&self) -> &str {
        &self.master_language
    }

    pub fn set_master_language(&mut self, language: impl Into<String>) {
        let language = language.into();
        if language != self.master_language {
            self.master_language = language.clone();
            self.publish(DatabaseEvent::MasterLanguageChanged { language });
        }
    }

    /// Returns a receiver for every subsequent modification of this database.
    pub fn subscribe(&mut self) -> Receiver<DatabaseEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.text_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_nodes.is_empty()
    }

    pub fn text_nodes(&self) -> &[TextNode] {
        &self.text_nodes
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.text_nodes.iter().map(|node| node.key.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.text_node(key).is_some()
    }

    pub fn text_node(&self, key: &str) -> Option<&TextNode> {
        self.text_nodes.iter().find(|node| node.key == key)
    }

    pub fn text_node_mut(&mut self, key: &str) -> Option<&mut TextNode> {
        self.text_nodes.iter_mut().find(|node| node.key == key)
    }

    /// Value of `key` in `language`, if both exist.
    pub fn value_node(&self, key: &str, language: &str) -> Option<&ValueNode> {
        self.text_node(key)?.value_node(language)
    }

    /// All languages used by any text node, sorted.
    pub fn languages(&self) -> BTreeSet<&str> {
        self.text_nodes
            .iter()
            .flat_map(|node| node.languages())
            .collect()
    }

    /// Appends a text node. Keys are unique within a database.
    pub fn add_text_node(&mut self, text_node: TextNode) -> Result<(), Error> {
        if self.contains_key(&text_node.key) {
            return Err(Error::InvalidResource(format!(
                "duplicate key `{}`",
                text_node.key
            )));
        }
        let key = text_node.key.clone();
        self.text_nodes.push(text_node);
        self.publish(DatabaseEvent::TextNodeAdded { key });
        Ok(())
    }

    pub fn remove_text_node(&mut self, key: &str) -> Option<TextNode> {
        let index = self.text_nodes.iter().position(|node| node.key == key)?;
        let removed = self.text_nodes.remove(index);
        self.publish(DatabaseEvent::TextNodeRemoved {
            key: removed.key.clone(),
        });
        Some(removed)
    }

    /// Adds (or replaces) the value of an existing text node.
    pub fn add_value_node(&mut self, key: &str, value_node: ValueNode) -> Result<(), Error> {
        let Some(node) = self.text_node_mut(key) else {
            return Err(Error::InvalidResource(format!("unknown key `{}`", key)));
        };
        let language = value_node.language.clone();
        let event = match node.add_value_node(value_node) {
            Some(_) => DatabaseEvent::ValueNodeChanged {
                key: key.to_string(),
                language,
            },
            None => DatabaseEvent::ValueNodeAdded {
                key: key.to_string(),
                language,
            },
        };
        self.publish(event);
        Ok(())
    }

    pub fn remove_value_node(&mut self, key: &str, language: &str) -> Option<ValueNode> {
        let removed = self.text_node_mut(key)?.remove_value_node(language)?;
        self.publish(DatabaseEvent::ValueNodeRemoved {
            key: key.to_string(),
            language: language.to_string(),
        });
        Some(removed)
    }

    /// Overwrites value and status of an existing value node.
    ///
    /// Returns `true` when the stored data changed. A missing key or
    /// language leaves the database untouched and returns `false`.
    pub fn set_value_and_status(
        &mut self,
        key: &str,
        language: &str,
        status: Status,
        value: &str,
    ) -> bool {
        let Some(node) = self
            .text_node_mut(key)
            .and_then(|node| node.value_node_mut(language))
        else {
            return false;
        };
        if node.status == status && node.value == value {
            return false;
        }
        node.status = status;
        node.value = value.to_string();
        self.publish(DatabaseEvent::ValueNodeChanged {
            key: key.to_string(),
            language: language.to_string(),
        });
        true
    }

    /// Overwrites the value of an existing value node, keeping its status.
    pub fn set_value(&mut self, key: &str, language: &str, value: &str) -> bool {
        match self.value_node(key, language) {
            Some(node) => {
                let status = node.status;
                self.set_value_and_status(key, language, status, value)
            }
            None => false,
        }
    }

    /// Overwrites the status of an existing value node, keeping its value.
    pub fn set_status(&mut self, key: &str, language: &str, status: Status) -> bool {
        match self.value_node(key, language) {
            Some(node) => {
                let value = node.value.clone();
                self.set_value_and_status(key, language, status, &value)
            }
            None => false,
        }
    }

    /// Overwrites the master-language value of `key`. The status of the
    /// master value is left alone.
    pub fn set_master_value(&mut self, key: &str, value: &str) -> bool {
        let master_language = self.master_language.clone();
        self.set_value(key, &master_language, value)
    }

    fn publish(&mut self, event: DatabaseEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for node in &self.text_nodes {
            if !seen.insert(node.key.as_str()) {
                return Err(Error::InvalidResource(format!(
                    "duplicate key `{}`",
                    node.key
                )));
            }
            let mut languages = HashSet::new();
            for value in &node.values {
                if !languages.insert(value.language.as_str()) {
                    return Err(Error::InvalidResource(format!(
                        "duplicate language `{}` for key `{}`",
                        value.language, node.key
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Parser for Database {
    /// Parse a JSON snapshot from any reader.
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        let db: Database = serde_json::from_reader(reader).map_err(Error::Parse)?;
        db.validate()?;
        Ok(db)
    }

    /// Write a JSON snapshot to any writer (file, memory, etc.).
    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut writer, self).map_err(Error::Parse)?;
        writer.flush()?;
        Ok(())
    }
}
