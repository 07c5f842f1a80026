use std::path::PathBuf;
use thiserror::Error;

use super::channel::ChannelName;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("FileLocator failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("FileLocator could not search {0:?} because it does not exist")]
    BadFilePath(PathBuf),
    #[error("FileLocator did not find any matching input files in {0:?}")]
    NoInputFiles(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Channel header is empty")]
    EmptyLabel,
    #[error("Channel header {0:?} has an unclosed bracket")]
    Unclosed(String),
    #[error("Channel header {0:?} has an unmatched closing bracket")]
    Unmatched(String),
    #[error("Channel header {0:?} declares an empty unit")]
    EmptyUnit(String),
    #[error("Channel header {0:?} has trailing text after its unit")]
    TrailingText(String),
    #[error("Channel header {0:?} has a display unit but no measurement unit")]
    MissingUnit(String),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("RecordParser failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("RecordParser found irregular rows in file; row {row} has {found} fields, expected {expected}")]
    MalformedFile {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("RecordParser found a malformed channel header: {0}")]
    BadHeader(#[from] HeaderError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("SeriesRegistry skipped empty file {0:?}")]
    EmptyFile(PathBuf),
    #[error("SeriesRegistry skipped file {0:?} because it has fewer than 2 data rows")]
    HeaderOnlyFile(PathBuf),
    #[error("SeriesRegistry skipped file {0:?} because it has no Time channel")]
    MissingTimeChannel(PathBuf),
    #[error("SeriesRegistry skipped file {path:?} as a duplicate of {existing}")]
    DuplicateFile { path: PathBuf, existing: String },
    #[error("SeriesRegistry did not accept any usable files")]
    NoUsableFiles,
}

impl RegistryError {
    /// Skip conditions exclude a single file; anything else aborts the run
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::NoUsableFiles)
    }
}

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("TimeWindowTrimmer could not parse timestamp {value:?} at row {row} of {file}: {source}")]
    BadTimestamp {
        file: String,
        row: usize,
        value: String,
        source: time::error::Parse,
    },
    #[error("Time window bound {value:?} is not in the format YYYY-MM-DD HH:MM: {source}")]
    BadWindowBound {
        value: String,
        source: time::error::Parse,
    },
    #[error("TimeWindowTrimmer found no valid data in the time range")]
    EmptyTimeRange,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("ChannelMerger found a sparse merge for channel {channel}: index {end} ({end_time}) is not adjacent to index {start} ({start_time})")]
    SparseMerge {
        channel: ChannelName,
        end: usize,
        start: usize,
        end_time: String,
        start_time: String,
    },
    #[error("ChannelMerger could not parse value {value:?} of channel {channel} at row {row} of {file}")]
    BadValue {
        channel: ChannelName,
        file: String,
        row: usize,
        value: String,
    },
    #[error("ChannelMerger requires trimmed data but file {0} was never trimmed")]
    Untrimmed(String),
}

#[derive(Debug, Error)]
pub enum ChannelConfigError {
    #[error("ChannelConfig failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ChannelConfig was given a file with the incorrect format at line {0}; most likely the number of columns is incorrect")]
    BadFileFormat(usize),
    #[error("ChannelConfig found a malformed channel name: {0}")]
    BadHeader(#[from] HeaderError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config delimiter {0:?} must be exactly one character")]
    BadDelimiter(String),
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("GroupWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("GroupWriter failed to format a timestamp: {0}")]
    FormatError(#[from] time::error::Format),
    #[error("GroupWriter failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("GroupWriter requires a single byte delimiter, found {0:?}")]
    BadDelimiter(char),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to FileLocator error: {0}")]
    LocatorError(#[from] LocatorError),
    #[error("Processor failed due to SeriesRegistry error: {0}")]
    RegistryError(#[from] RegistryError),
    #[error("Processor failed due to TimeWindowTrimmer error: {0}")]
    TrimError(#[from] TrimError),
    #[error("Processor failed due to ChannelMerger error: {0}")]
    MergeError(#[from] MergeError),
    #[error("Processor failed due to ChannelConfig error: {0}")]
    ChannelConfigError(#[from] ChannelConfigError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to GroupWriter error: {0}")]
    WriterError(#[from] WriterError),
}
