//! Reconciles an import source against the database.
//!
//! Every imported key is first classified ([`classify`]) by comparing the
//! imported value, status and master value with the database, then decided
//! ([`decide`]): conflicting or not, acceptable or not, accepted by default
//! or not, and which value/status to write. Changes that are accepted can be
//! written back with [`apply_change`].
//!
//! The decision encodes a one-way trust order
//! `Initial < Translated < Verified`. `Special` values belong to developers,
//! and so do additions of keys or languages: they are reported but never
//! applied.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    change::{Change, ChangeType, ConflictDecision},
    error::Error,
    status::Status,
    traits::ImportSource,
    types::{Database, TextNode},
};

/// Options controlling how changes are decided.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalyzerOptions {
    /// When the imported master text differs from the database, write the
    /// imported one (the default) instead of keeping the database text.
    pub use_master_value_from_file: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            use_master_value_from_file: true,
        }
    }
}

impl AnalyzerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_master_value_from_file(mut self, use_master_value_from_file: bool) -> Self {
        self.use_master_value_from_file = use_master_value_from_file;
        self
    }
}

/// What an import source says about one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedKey<'a> {
    pub key: &'a str,
    pub language: &'a str,
    pub master_language: Option<&'a str>,
    pub status: Status,
    /// `None` when the source has no value for the key. A missing value
    /// never equals a database value, not even an empty one.
    pub value: Option<&'a str>,
    pub master_value: Option<&'a str>,
}

impl<'a> ImportedKey<'a> {
    /// Reads `key` from `source`. A missing status reads as `Undefined`.
    pub fn from_source<S: ImportSource + ?Sized>(source: &'a S, key: &'a str) -> Self {
        let master_language = source.master_language();
        ImportedKey {
            key,
            language: source.language(),
            master_language,
            status: source.status(key).unwrap_or_default(),
            value: source.value(key),
            master_value: master_language.and_then(|_| source.master_value(key)),
        }
    }
}

/// Builds the change for one imported key against its database text node
/// (`None` when the key is unknown to the database).
///
/// The returned change carries no decision yet.
pub fn classify(imported: &ImportedKey<'_>, text_node: Option<&TextNode>) -> Change {
    let mut change = Change::new(
        ChangeType::NoChange,
        imported.key,
        imported.language,
        imported.value.unwrap_or_default(),
        imported.status,
    );

    if let Some(master_language) = imported.master_language {
        change.master_language = Some(master_language.to_string());
        change.imported_master_value = imported.master_value.map(str::to_string);
        change.db_master_value = text_node
            .and_then(|node| node.value_node(master_language))
            .map(|v| v.value.clone());
    }

    if let Some(node) = text_node {
        change.context = Some(node.context.clone());
        if let Some(value_node) = node.value_node(imported.language) {
            change.db_value = Some(value_node.value.clone());
            change.db_status = Some(value_node.status);
        }
    }

    change.change_type = change_type(&change, imported.value, text_node.is_some());
    change
}

/// First matching rule wins.
fn change_type(change: &Change, imported_value: Option<&str>, key_exists: bool) -> ChangeType {
    if !key_exists {
        return ChangeType::KeyAddition;
    }

    if change.has_master_language() {
        match change.db_master_value.as_deref() {
            None => return ChangeType::MasterLanguageAddition,
            Some(db_master) if Some(db_master) != change.imported_master_value.as_deref() => {
                return ChangeType::MasterValueChanged;
            }
            Some(_) => {}
        }
    }

    let (Some(db_value), Some(db_status)) = (change.db_value.as_deref(), change.db_status) else {
        return ChangeType::LanguageAddition;
    };

    if Some(db_value) == imported_value {
        match Status::compare(change.imported_status, db_status) {
            Ordering::Less => ChangeType::ImportedStatusOlder,
            Ordering::Greater => ChangeType::ImportedStatusNewer,
            Ordering::Equal => ChangeType::NoChange,
        }
    } else if db_status == change.imported_status {
        ChangeType::ValueChanged
    } else {
        ChangeType::ValueAndStatusChanged
    }
}

/// Decides what to do with a classified change.
pub fn decide(change: &Change, options: &AnalyzerOptions) -> ConflictDecision {
    let accept_master_value = if options.use_master_value_from_file {
        change.imported_master_value.clone()
    } else {
        change.db_master_value.clone()
    };
    let mut decision = ConflictDecision {
        conflicting: false,
        acceptable: false,
        accept: false,
        accept_value: change.imported_value.clone(),
        accept_status: change.imported_status,
        accept_master_value,
    };

    match change.change_type {
        ChangeType::NoChange => {}
        ChangeType::MasterValueChanged => {
            decision.conflicting = true;
            decision.acceptable = true;
            decision.accept = false;
        }
        ChangeType::ImportedStatusOlder => {
            decision.conflicting = true;
            decision.acceptable = true;
            decision.accept = true;
        }
        ChangeType::ImportedStatusNewer => {
            decision.conflicting = false;
            decision.acceptable = true;
            decision.accept = true;
        }
        // Only developers add keys or languages.
        ChangeType::LanguageAddition
        | ChangeType::MasterLanguageAddition
        | ChangeType::KeyAddition => {
            decision.conflicting = true;
            decision.acceptable = false;
        }
        ChangeType::ValueChanged | ChangeType::ValueAndStatusChanged => {
            decision.conflicting = false;
            decision.acceptable = true;
            decision.accept = true;

            match (change.db_status, change.imported_status) {
                (Some(Status::Special), _) => {
                    decision.conflicting = true;
                    decision.acceptable = false;
                }
                (Some(Status::Initial), Status::Initial) => {
                    decision.accept_status = Status::Translated;
                }
                (Some(Status::Initial), Status::Special) => {
                    decision.conflicting = true;
                    decision.acceptable = false;
                    decision.accept_status = Status::Translated;
                }
                (Some(Status::Translated), Status::Initial | Status::Special) => {
                    decision.conflicting = true;
                    decision.accept_status = Status::Translated;
                }
                (Some(Status::Verified), imported) => {
                    decision.conflicting = true;
                    // Two verified but different values are never merged silently.
                    if imported == Status::Verified {
                        decision.accept = false;
                    }
                }
                _ => {}
            }
        }
    }

    decision.accept = decision.acceptable && decision.accept;
    decision
}

/// Counters over a set of changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub conflicting: usize,
    pub non_conflicting: usize,
    pub acceptable: usize,
    pub accepted: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl AnalysisSummary {
    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a Change>) -> Self {
        let mut summary = AnalysisSummary::default();
        for change in changes {
            summary.total += 1;
            if change.is_conflicting() {
                summary.conflicting += 1;
            } else {
                summary.non_conflicting += 1;
            }
            if change.is_acceptable() {
                summary.acceptable += 1;
            }
            if change.is_accept() {
                summary.accepted += 1;
            }
            *summary
                .by_type
                .entry(change.change_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary
    }
}

/// The output of an analysis, detached from the database it was computed
/// against so that the database can be modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Analysis {
    pub conflicting: Vec<Change>,
    pub non_conflicting: Vec<Change>,
}

impl Analysis {
    /// Conflicting changes first, then the non-conflicting ones.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.conflicting.iter().chain(self.non_conflicting.iter())
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::from_changes(self.changes())
    }

    pub fn is_empty(&self) -> bool {
        self.conflicting.is_empty() && self.non_conflicting.is_empty()
    }

    /// Applies every accepted change, conflicting ones first. Returns the
    /// number of changes applied.
    pub fn apply(&self, db: &mut Database) -> usize {
        apply_all(db, self.changes())
    }

    /// Applies only the accepted non-conflicting changes.
    pub fn apply_non_conflicting(&self, db: &mut Database) -> usize {
        apply_all(db, &self.non_conflicting)
    }
}

/// Determines the changes between an import source and a database and
/// sorts them into conflicting and non-conflicting ones.
///
/// # Example
///
/// ```rust
/// use trema::{Analyzer, Database, ImportFile, Status, TextNode, apply_change};
///
/// let mut db = Database::new("de");
/// db.add_text_node(TextNode::new("greeting", "").with_value("de", Status::Translated, "Hallo"))?;
///
/// let import = ImportFile::new("de", None).with("greeting", Status::Verified, None, "Hallo");
/// let mut analyzer = Analyzer::new(&import, &db)?;
/// analyzer.analyze();
/// let analysis = analyzer.into_analysis();
///
/// for change in analysis.changes() {
///     apply_change(&mut db, change);
/// }
/// assert_eq!(db.value_node("greeting", "de").unwrap().status, Status::Verified);
/// # Ok::<(), trema::Error>(())
/// ```
#[derive(Debug)]
pub struct Analyzer<'a, S: ImportSource + ?Sized> {
    source: &'a S,
    db: &'a Database,
    options: AnalyzerOptions,
    analysis: Analysis,
}

impl<'a, S: ImportSource + ?Sized> Analyzer<'a, S> {
    /// Creates an analyzer with default options.
    ///
    /// Fails when the languages of `source` cannot be reconciled with the
    /// database: a source without master language must supply the database
    /// master language, and a source with master language must declare the
    /// database master language.
    pub fn new(source: &'a S, db: &'a Database) -> Result<Self, Error> {
        Self::with_options(source, db, AnalyzerOptions::default())
    }

    pub fn with_options(
        source: &'a S,
        db: &'a Database,
        options: AnalyzerOptions,
    ) -> Result<Self, Error> {
        let database = db.master_language();
        match source.master_language() {
            None if source.language() != database => {
                warn!(
                    imported = source.language(),
                    database, "imported language does not match the master language"
                );
                return Err(Error::LanguageMismatch {
                    imported: source.language().to_string(),
                    database: database.to_string(),
                });
            }
            Some(master) if master != database => {
                warn!(
                    imported = master,
                    database, "imported master language does not match the master language"
                );
                return Err(Error::MasterLanguageMismatch {
                    imported: master.to_string(),
                    database: database.to_string(),
                });
            }
            _ => {}
        }

        Ok(Analyzer {
            source,
            db,
            options,
            analysis: Analysis::default(),
        })
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Classifies every key of the import source, in source order.
    /// Keys without any change are dropped. Running it again starts over.
    pub fn analyze(&mut self) {
        let mut analysis = Analysis::default();

        for key in self.source.keys() {
            let imported = ImportedKey::from_source(self.source, key);
            let change = classify(&imported, self.db.text_node(key));
            if change.change_type == ChangeType::NoChange {
                continue;
            }

            let decision = decide(&change, &self.options);
            let change = change.with_decision(decision);
            debug!(
                key,
                change_type = change.change_type.as_str(),
                conflicting = change.is_conflicting(),
                accept = change.is_accept(),
                "classified imported key"
            );

            if change.is_conflicting() {
                analysis.conflicting.push(change);
            } else {
                analysis.non_conflicting.push(change);
            }
        }

        info!(
            language = self.source.language(),
            keys = self.source.len(),
            conflicting = analysis.conflicting.len(),
            non_conflicting = analysis.non_conflicting.len(),
            "analysis finished"
        );
        self.analysis = analysis;
    }

    pub fn conflicting_changes(&self) -> &[Change] {
        &self.analysis.conflicting
    }

    pub fn non_conflicting_changes(&self) -> &[Change] {
        &self.analysis.non_conflicting
    }

    /// Mutable access, to accept or reject conflicting changes.
    pub fn conflicting_changes_mut(&mut self) -> &mut [Change] {
        &mut self.analysis.conflicting
    }

    pub fn non_conflicting_changes_mut(&mut self) -> &mut [Change] {
        &mut self.analysis.non_conflicting
    }

    /// Conflicting changes first, then the non-conflicting ones.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.analysis.changes()
    }

    pub fn summary(&self) -> AnalysisSummary {
        self.analysis.summary()
    }

    /// Releases the database borrow, keeping the results.
    pub fn into_analysis(self) -> Analysis {
        self.analysis
    }
}

/// Whether [`apply_change`] would write `change`: it must be accepted and
/// must not add a key or a language.
pub fn is_applicable(change: &Change) -> bool {
    change.is_applicable()
}

/// Writes an accepted change into the database.
///
/// Sets status and value of the change's language to the accepted ones and,
/// for sources carrying a master language, the master value to the accepted
/// master value. The status of the master value is never touched. Does
/// nothing for changes that are not applicable. Applying the same change
/// twice leaves the database as applying it once.
///
/// Returns whether the change was applicable.
pub fn apply_change(db: &mut Database, change: &Change) -> bool {
    if !change.is_applicable() {
        return false;
    }

    db.set_value_and_status(
        &change.key,
        &change.language,
        change.accept_status(),
        change.accept_value(),
    );

    if let (Some(master_language), Some(master_value)) = (
        change.master_language.as_deref(),
        change.accept_master_value(),
    ) {
        db.set_value(&change.key, master_language, master_value);
    }

    debug!(
        key = change.key.as_str(),
        language = change.language.as_str(),
        status = change.accept_status().name(),
        "applied change"
    );
    true
}

/// Applies changes in order and returns how many were applicable.
pub fn apply_all<'a>(db: &mut Database, changes: impl IntoIterator<Item = &'a Change>) -> usize {
    let applied = changes
        .into_iter()
        .filter(|change| apply_change(db, change))
        .count();
    info!(applied, "applied changes");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportFile;

    fn imported<'a>(
        key: &'a str,
        language: &'a str,
        status: Status,
        value: &'a str,
    ) -> ImportedKey<'a> {
        ImportedKey {
            key,
            language,
            master_language: None,
            status,
            value: Some(value),
            master_value: None,
        }
    }

    fn with_master<'a>(imported: ImportedKey<'a>, master_value: &'a str) -> ImportedKey<'a> {
        ImportedKey {
            master_language: Some("de"),
            master_value: Some(master_value),
            ..imported
        }
    }

    fn node(language: &str, status: Status, value: &str) -> TextNode {
        TextNode::new("k", "ctx").with_value(language, status, value)
    }

    fn decided(change_type: ChangeType, db_status: Status, imported_status: Status) -> Change {
        let mut change = Change::new(change_type, "k", "fr", "new", imported_status);
        change.db_value = Some("old".to_string());
        change.db_status = Some(db_status);
        let decision = decide(&change, &AnalyzerOptions::default());
        change.with_decision(decision)
    }

    #[test]
    fn test_classify_key_addition() {
        let change = classify(&imported("k", "de", Status::Translated, "v"), None);
        assert_eq!(change.change_type, ChangeType::KeyAddition);
        assert!(change.context.is_none());
        assert!(change.db_value.is_none());
        assert!(change.db_status.is_none());
    }

    #[test]
    fn test_classify_master_checks_come_before_language() {
        // No master value and no fr value: master language addition wins.
        let text_node = node("jp", Status::Translated, "v");
        let change = classify(
            &with_master(imported("k", "fr", Status::Translated, "v"), "m"),
            Some(&text_node),
        );
        assert_eq!(change.change_type, ChangeType::MasterLanguageAddition);

        // Differing master and no fr value: master value changed wins.
        let text_node = node("de", Status::Translated, "old master");
        let change = classify(
            &with_master(imported("k", "fr", Status::Translated, "v"), "new master"),
            Some(&text_node),
        );
        assert_eq!(change.change_type, ChangeType::MasterValueChanged);
        assert_eq!(change.db_master_value.as_deref(), Some("old master"));
        assert_eq!(change.imported_master_value.as_deref(), Some("new master"));

        // Matching master falls through to the language check.
        let change = classify(
            &with_master(imported("k", "fr", Status::Translated, "v"), "old master"),
            Some(&text_node),
        );
        assert_eq!(change.change_type, ChangeType::LanguageAddition);
        assert_eq!(change.context.as_deref(), Some("ctx"));
    }

    #[test]
    fn test_classify_value_and_status_comparisons() {
        let text_node = node("de", Status::Translated, "same");
        let cases = [
            (Status::Initial, "same", ChangeType::ImportedStatusOlder),
            (Status::Verified, "same", ChangeType::ImportedStatusNewer),
            (Status::Translated, "same", ChangeType::NoChange),
            (Status::Translated, "other", ChangeType::ValueChanged),
            (Status::Special, "other", ChangeType::ValueAndStatusChanged),
        ];
        for (status, value, expected) in cases {
            let change = classify(&imported("k", "de", status, value), Some(&text_node));
            assert_eq!(change.change_type, expected, "{status} {value}");
            assert_eq!(change.db_status, Some(Status::Translated));
        }
    }

    #[test]
    fn test_classify_undefined_is_newest() {
        let text_node = node("de", Status::Special, "same");
        let change = classify(
            &imported("k", "de", Status::Undefined, "same"),
            Some(&text_node),
        );
        assert_eq!(change.change_type, ChangeType::ImportedStatusNewer);
    }

    #[test]
    fn test_classify_missing_value_differs_from_empty() {
        let text_node = node("de", Status::Translated, "");
        let missing = ImportedKey {
            value: None,
            ..imported("k", "de", Status::Translated, "")
        };
        let change = classify(&missing, Some(&text_node));
        assert_eq!(change.change_type, ChangeType::ValueChanged);
        assert_eq!(change.imported_value, "");

        let empty = imported("k", "de", Status::Translated, "");
        let change = classify(&empty, Some(&text_node));
        assert_eq!(change.change_type, ChangeType::NoChange);
    }

    #[test]
    fn test_decide_fixed_rows() {
        let change = decided(ChangeType::MasterValueChanged, Status::Translated, Status::Translated);
        assert!(change.is_conflicting() && change.is_acceptable() && !change.is_accept());

        let change = decided(ChangeType::ImportedStatusOlder, Status::Verified, Status::Translated);
        assert!(change.is_conflicting() && change.is_acceptable() && change.is_accept());

        let change = decided(ChangeType::ImportedStatusNewer, Status::Initial, Status::Translated);
        assert!(!change.is_conflicting() && change.is_acceptable() && change.is_accept());

        for addition in [
            ChangeType::LanguageAddition,
            ChangeType::MasterLanguageAddition,
            ChangeType::KeyAddition,
        ] {
            let change = decided(addition, Status::Initial, Status::Translated);
            assert!(change.is_conflicting());
            assert!(!change.is_acceptable());
            assert!(!change.is_accept());
        }
    }

    #[test]
    fn test_decide_value_change_matrix() {
        use Status::*;
        // (db, imported, conflicting, acceptable, accept, accept status)
        let rows = [
            (Initial, Initial, false, true, true, Translated),
            (Initial, Translated, false, true, true, Translated),
            (Initial, Verified, false, true, true, Verified),
            (Initial, Special, true, false, false, Translated),
            (Translated, Initial, true, true, true, Translated),
            (Translated, Translated, false, true, true, Translated),
            (Translated, Verified, false, true, true, Verified),
            (Translated, Special, true, true, true, Translated),
            (Verified, Initial, true, true, true, Initial),
            (Verified, Translated, true, true, true, Translated),
            (Verified, Verified, true, true, false, Verified),
            (Verified, Special, true, true, true, Special),
            (Special, Initial, true, false, false, Initial),
            (Special, Translated, true, false, false, Translated),
            (Special, Special, true, false, false, Special),
            (Undefined, Translated, false, true, true, Translated),
        ];
        for (db, imp, conflicting, acceptable, accept, accept_status) in rows {
            for change_type in [ChangeType::ValueChanged, ChangeType::ValueAndStatusChanged] {
                let change = decided(change_type, db, imp);
                let context = format!("db {db}, imported {imp}");
                assert_eq!(change.is_conflicting(), conflicting, "{context}");
                assert_eq!(change.is_acceptable(), acceptable, "{context}");
                assert_eq!(change.is_accept(), accept, "{context}");
                assert_eq!(change.accept_status(), accept_status, "{context}");
                assert_eq!(change.accept_value(), "new");
            }
        }
    }

    #[test]
    fn test_master_value_preference() {
        let text_node = TextNode::new("k", "")
            .with_value("de", Status::Verified, "db master")
            .with_value("fr", Status::Translated, "v");
        let change = classify(
            &with_master(imported("k", "fr", Status::Translated, "v"), "file master"),
            Some(&text_node),
        );

        let from_file = decide(&change, &AnalyzerOptions::default());
        assert_eq!(from_file.accept_master_value.as_deref(), Some("file master"));

        let options = AnalyzerOptions::new().with_master_value_from_file(false);
        let from_db = decide(&change, &options);
        assert_eq!(from_db.accept_master_value.as_deref(), Some("db master"));
        assert_eq!(from_db.conflicting, from_file.conflicting);
        assert_eq!(from_db.acceptable, from_file.acceptable);
        assert_eq!(from_db.accept, from_file.accept);
    }

    #[test]
    fn test_analyzer_rejects_language_mismatch() {
        let db = Database::new("de");
        let source = ImportFile::new("fr", None);
        let err = Analyzer::new(&source, &db).unwrap_err();
        assert!(matches!(err, Error::LanguageMismatch { .. }));

        let source = ImportFile::new("fr", Some("en".to_string()));
        let err = Analyzer::new(&source, &db).unwrap_err();
        assert!(matches!(err, Error::MasterLanguageMismatch { .. }));

        let source = ImportFile::new("fr", Some("de".to_string()));
        assert!(Analyzer::new(&source, &db).is_ok());
    }

    #[test]
    fn test_analyze_twice_starts_over() {
        let mut db = Database::new("de");
        db.add_text_node(node("de", Status::Translated, "old")).unwrap();
        let source = ImportFile::new("de", None).with("k", Status::Translated, None, "new");

        let mut analyzer = Analyzer::new(&source, &db).unwrap();
        analyzer.analyze();
        analyzer.analyze();
        assert_eq!(analyzer.non_conflicting_changes().len(), 1);
        assert!(analyzer.conflicting_changes().is_empty());
    }

    #[test]
    fn test_apply_writes_accepted_values_and_master() {
        let mut db = Database::new("de");
        db.add_text_node(
            TextNode::new("k", "")
                .with_value("de", Status::Verified, "alt")
                .with_value("fr", Status::Translated, "ancien"),
        )
        .unwrap();
        let source = ImportFile::new("fr", Some("de".to_string())).with(
            "k",
            Status::Translated,
            Some("neu"),
            "nouveau",
        );

        let mut analyzer = Analyzer::new(&source, &db).unwrap();
        analyzer.analyze();
        let mut analysis = analyzer.into_analysis();
        assert_eq!(analysis.conflicting.len(), 1);
        let change = &mut analysis.conflicting[0];
        assert_eq!(change.change_type, ChangeType::MasterValueChanged);
        assert!(!apply_change(&mut db, change));

        change.set_accept(true);
        assert!(apply_change(&mut db, change));
        let master = db.value_node("k", "de").unwrap();
        assert_eq!(master.value, "neu");
        assert_eq!(master.status, Status::Verified);
        assert_eq!(db.value_node("k", "fr").unwrap().value, "nouveau");
    }

    #[test]
    fn test_summary_counts() {
        let mut db = Database::new("de");
        db.add_text_node(node("de", Status::Special, "old")).unwrap();
        let source = ImportFile::new("de", None)
            .with("k", Status::Translated, None, "new")
            .with("extra", Status::Translated, None, "x");

        let mut analyzer = Analyzer::new(&source, &db).unwrap();
        analyzer.analyze();
        let summary = analyzer.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.conflicting, 2);
        assert_eq!(summary.acceptable, 0);
        assert_eq!(summary.by_type.get("key_addition"), Some(&1));
        assert_eq!(summary.by_type.get("value_and_status_changed"), Some(&1));
    }
}
