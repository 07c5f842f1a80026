use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use fxhash::FxHashMap;
use time::PrimitiveDateTime;

use super::channel::ChannelName;
use super::error::RegistryError;
use super::parser::ParsedFile;

/// Minimum number of data rows for a file to be accepted
const MIN_DATA_ROWS: usize = 2;

/// Short unique name of a registered file, derived from its path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey(String);

impl FileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of trimming one file to the time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedRows {
    /// Parsed timestamp of every row of the file
    pub timestamps: Vec<PrimitiveDateTime>,
    /// Sorted row positions (relative to the file) inside the time window
    pub valid_idx: Vec<usize>,
}

/// A file accepted into the registry
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub key: FileKey,
    pub path: PathBuf,
    /// Rows of the logical dataset held by this file
    pub range: Range<usize>,
    pub time_channel: ChannelName,
    pub channels: FxHashMap<ChannelName, Vec<String>>,
    /// Set by the TimeWindowTrimmer
    pub trim: Option<TrimmedRows>,
}

impl FileEntry {
    pub fn row_count(&self) -> usize {
        self.range.len()
    }

    pub fn channel(&self, name: &ChannelName) -> Option<&[String]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// Raw timestamps of the file
    pub fn time_values(&self) -> &[String] {
        self.channel(&self.time_channel).unwrap_or_default()
    }

    /// First and last raw timestamp, used to spot duplicate files
    fn time_bounds(&self) -> Option<(&str, &str)> {
        let times = self.time_values();
        Some((times.first()?.as_str(), times.last()?.as_str()))
    }
}

/// SeriesRegistry accumulates parsed files into one logical dataset.
///
/// Files are laid end to end in the order they are appended; each file owns a half-open range of
/// rows of the dataset and the ranges never overlap.
#[derive(Debug, Clone, Default)]
pub struct SeriesRegistry {
    entries: Vec<FileEntry>,
    data_size: usize,
    channels: BTreeSet<ChannelName>,
}

impl SeriesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed file to the dataset.
    ///
    /// Empty files, files with fewer than two data rows, files without a Time channel, and
    /// duplicates of an already registered file are rejected. All of these only exclude the file
    /// and callers are expected to continue with the next one.
    pub fn append(&mut self, path: &Path, parsed: ParsedFile) -> Result<&FileEntry, RegistryError> {
        if parsed.is_empty() {
            return Err(RegistryError::EmptyFile(path.to_path_buf()));
        }
        let row_count = parsed.row_count();
        if row_count < MIN_DATA_ROWS {
            return Err(RegistryError::HeaderOnlyFile(path.to_path_buf()));
        }
        let time_column = parsed
            .time_column()
            .ok_or_else(|| RegistryError::MissingTimeChannel(path.to_path_buf()))?;
        let time_channel = time_column.name.clone();

        // Decide on the duplicate using only already accepted files, then mutate
        let duplicate_of = {
            let index = self.duplicate_index();
            match (time_column.values.first(), time_column.values.last()) {
                (Some(first), Some(last)) => index
                    .get(&(first.as_str(), last.as_str()))
                    .map(|key| key.to_string()),
                _ => None,
            }
        };
        if let Some(existing) = duplicate_of {
            return Err(RegistryError::DuplicateFile {
                path: path.to_path_buf(),
                existing,
            });
        }

        let key = self.unique_key(path);
        let range = self.data_size..(self.data_size + row_count);
        let mut channels = FxHashMap::default();
        for column in parsed.columns {
            self.channels.insert(column.name.clone());
            channels.insert(column.name, column.values);
        }
        self.data_size = range.end;

        log::debug!(
            "Registered {} as {key} with rows {}..{}",
            path.to_string_lossy(),
            range.start,
            range.end
        );
        self.entries.push(FileEntry {
            key,
            path: path.to_path_buf(),
            range,
            time_channel,
            channels,
            trim: None,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Read-only index of (first time, last time) -> key over the accepted files
    fn duplicate_index(&self) -> FxHashMap<(&str, &str), &FileKey> {
        let mut index = FxHashMap::default();
        for entry in self.entries.iter() {
            if let Some(bounds) = entry.time_bounds() {
                index.entry(bounds).or_insert(&entry.key);
            }
        }
        index
    }

    /// Derive a key from the file stem, prepending parent directories until it is unique
    fn unique_key(&self, path: &Path) -> FileKey {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut parents = path
            .parent()
            .into_iter()
            .flat_map(|p| p.components().rev())
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            });

        let mut candidate = stem;
        while self.contains_key(&candidate) {
            match parents.next() {
                Some(parent) => candidate = format!("{parent}/{candidate}"),
                None => break,
            }
        }
        if self.contains_key(&candidate) {
            let base = candidate;
            let mut n = 2;
            candidate = format!("{base}#{n}");
            while self.contains_key(&candidate) {
                n += 1;
                candidate = format!("{base}#{n}");
            }
        }
        FileKey(candidate)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key.as_str() == key)
    }

    /// Fail if no file was accepted
    pub fn ensure_usable(&self) -> Result<(), RegistryError> {
        if self.entries.is_empty() {
            Err(RegistryError::NoUsableFiles)
        } else {
            Ok(())
        }
    }

    /// The accepted files in dataset order
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [FileEntry] {
        &mut self.entries
    }

    pub fn get(&self, key: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.key.as_str() == key)
    }

    /// Total number of rows in the logical dataset
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Every channel name seen in an accepted file
    pub fn channels(&self) -> &BTreeSet<ChannelName> {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
