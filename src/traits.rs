//! Traits shared by the database snapshot, import readers and the analyzer.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Cursor, Write},
    path::Path,
};

use crate::{error::Error, status::Status};

/// A trait for parsing and writing a value from/to one file.
///
/// # Example
///
/// ```rust,no_run
/// use trema::{Database, traits::Parser};
/// let db = Database::read_from("texts.json")?;
/// db.write_to("texts_copy.json")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path).map_err(Error::Io)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to file path.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        self.to_writer(writer)
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}

/// A read-only view of one language's translations coming from outside the
/// database (a spreadsheet a translator edited, for instance).
///
/// When the source carries a master language it is the round trip of a
/// non-master export, which also shipped the master text for reference.
pub trait ImportSource {
    /// Number of keys in the source.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, in source order.
    fn keys(&self) -> Vec<&str>;

    fn contains_key(&self, key: &str) -> bool;

    /// The language this source supplies values for.
    fn language(&self) -> &str;

    fn master_language(&self) -> Option<&str>;

    fn has_master_language(&self) -> bool {
        self.master_language().is_some()
    }

    fn status(&self, key: &str) -> Option<Status>;

    fn value(&self, key: &str) -> Option<&str>;

    fn master_value(&self, key: &str) -> Option<&str>;
}
