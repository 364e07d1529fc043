//! Verse dataset loading
//!
//! Each source is a CSV file with a header row. The `verse` column is
//! required; `meaning` and `chapter` are optional and any other columns are
//! ignored. Loading is all-or-nothing across sources: if one file is missing,
//! empty or malformed, no dataset is returned at all.


use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

const VERSE_COLUMN: &str = "verse";

/// A named CSV file holding the verses of one book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetSource {
    pub book: String,
    pub path: PathBuf,
}

impl DatasetSource {
    #[inline]
    pub fn new(book: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            book: book.into(),
            path: path.into(),
        }
    }
}

/// Chapter reference as found in the source file
///
/// Most sources number their chapters but some use names, so anything that
/// does not parse as an integer is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Chapter {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Chapter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChapterVisitor)
    }
}

struct ChapterVisitor;

impl Visitor<'_> for ChapterVisitor {
    type Value = Chapter;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a chapter number or name")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Chapter, E> {
        Ok(Chapter::Number(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Chapter, E> {
        Ok(i64::try_from(v).map_or_else(|_| Chapter::Text(v.to_string()), Chapter::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Chapter, E> {
        Ok(Chapter::from_text(v))
    }
}

impl Chapter {
    /// Classify a chapter cell; only plain integers become numbers
    #[inline]
    pub fn from_text(text: &str) -> Self {
        text.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Text(text.to_string()), Self::Number)
    }
}

impl fmt::Display for Chapter {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One row of a source file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerseRow {
    pub verse: String,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default, deserialize_with = "chapter_cell")]
    pub chapter: Option<Chapter>,
}

// CSV cells are read as text so that `3.10` is not inferred as a float
fn chapter_cell<'de, D>(deserializer: D) -> Result<Option<Chapter>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<String>::deserialize(deserializer)?;
    Ok(cell.map(|text| Chapter::from_text(&text)))
}

/// A verse tagged with the book it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub book: String,
    pub verse: String,
    pub meaning: Option<String>,
    pub chapter: Option<Chapter>,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("CSV file is empty: {}", path.display())]
    Empty { path: PathBuf },

    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Malformed record {record} in {}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        record: usize,
        message: String,
    },

    #[error("Empty verse text in record {record} of {}", path.display())]
    EmptyVerse { path: PathBuf, record: usize },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load dataset '{book}': {source}")]
    Source {
        book: String,
        #[source]
        source: Box<DatasetError>,
    },
}

/// All loaded sources, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Datasets {
    books: Vec<(String, Vec<VerseRow>)>,
}

impl Datasets {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, book: impl Into<String>, rows: Vec<VerseRow>) {
        self.books.push((book.into(), rows));
    }

    /// Book names in load order
    #[inline]
    pub fn books(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(|(book, _)| book.as_str())
    }

    #[inline]
    pub fn rows(&self, book: &str) -> Option<&[VerseRow]> {
        self.books
            .iter()
            .find(|(name, _)| name == book)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Total number of verses across every book
    #[inline]
    pub fn len(&self) -> usize {
        self.books.iter().map(|(_, rows)| rows.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every verse as a record, books in load order and rows in file order
    #[inline]
    pub fn records(&self) -> impl Iterator<Item = VerseRecord> + '_ {
        self.books.iter().flat_map(|(book, rows)| {
            rows.iter().map(move |row| VerseRecord {
                book: book.clone(),
                verse: row.verse.clone(),
                meaning: row.meaning.clone(),
                chapter: row.chapter.clone(),
            })
        })
    }
}

/// Load a single CSV file into verse rows
#[inline]
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<VerseRow>, DatasetError> {
    let path = path.as_ref();
    debug!("Loading dataset from {}", path.display());

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DatasetError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| DatasetError::Malformed {
            path: path.to_path_buf(),
            record: 0,
            message: e.to_string(),
        })?
        .clone();

    if headers.iter().all(str::is_empty) {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }

    if !headers.iter().any(|h| h == VERSE_COLUMN) {
        return Err(DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column: VERSE_COLUMN,
        });
    }

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<VerseRow>().enumerate() {
        let record = i + 1;
        let row = result.map_err(|e| DatasetError::Malformed {
            path: path.to_path_buf(),
            record,
            message: e.to_string(),
        })?;

        if row.verse.is_empty() {
            return Err(DatasetError::EmptyVerse {
                path: path.to_path_buf(),
                record,
            });
        }

        rows.push(row);
    }

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Load every source, failing the whole batch if any one source fails
#[inline]
pub fn load_all_datasets(sources: &[DatasetSource]) -> Result<Datasets, DatasetError> {
    let mut datasets = Datasets::new();

    for source in sources {
        match load_dataset(&source.path) {
            Ok(rows) => {
                info!("Loaded {} verses for {}", rows.len(), source.book);
                datasets.push(source.book.clone(), rows);
            }
            Err(e) => {
                error!("Failed to load dataset {}: {}", source.book, e);
                return Err(DatasetError::Source {
                    book: source.book.clone(),
                    source: Box::new(e),
                });
            }
        }
    }

    Ok(datasets)
}
