use std::path::PathBuf;

use super::channel_config::ChannelConfig;
use super::config::Config;
use super::error::ProcessorError;
use super::group_writer::GroupWriter;
use super::locator::FileLocator;
use super::merger::{ChannelMerger, MergedDataset};
use super::parser::RecordParser;
use super::registry::SeriesRegistry;
use super::trimmer::TimeWindowTrimmer;

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub dataset: MergedDataset,
    pub channel_config: ChannelConfig,
    pub accepted_files: usize,
    pub skipped_files: usize,
    pub data_size: usize,
    pub valid_rows: usize,
    pub written: Vec<PathBuf>,
}

/// Read every located file into a registry.
///
/// Files which cannot be parsed or are rejected by the registry are skipped with a warning.
/// Returns the registry and the number of skipped files.
pub fn build_registry(
    locator: &FileLocator,
    parser: &RecordParser,
) -> Result<(SeriesRegistry, usize), ProcessorError> {
    let mut registry = SeriesRegistry::new();
    let mut skipped = 0;
    for path in locator.files() {
        let parsed = match parser.read_file(path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!(
                    "Could not parse {}: {e}\nSkipping file.",
                    path.to_string_lossy()
                );
                skipped += 1;
                continue;
            }
        };
        match registry.append(path, parsed) {
            Ok(entry) => log::info!(
                "Loaded {} ({} rows)",
                path.to_string_lossy(),
                entry.row_count()
            ),
            Err(e) if e.is_skip() => {
                log::warn!("{e}");
                skipped += 1;
            }
            Err(e) => return Err(ProcessorError::RegistryError(e)),
        }
    }
    registry.ensure_usable()?;
    Ok((registry, skipped))
}

/// Load the channel configuration, or derive one from the channel headers if there is none
pub fn load_channel_config(
    config: &Config,
    registry: &SeriesRegistry,
    delimiter: char,
) -> Result<ChannelConfig, ProcessorError> {
    match config.get_channel_config_path() {
        Some(path) => {
            log::info!("Loading channel config from {}...", path.to_string_lossy());
            Ok(ChannelConfig::new(&path, delimiter)?)
        }
        None => {
            log::warn!("No channel config found; using every channel with a unit");
            Ok(ChannelConfig::from_headers(registry.channels()))
        }
    }
}

/// The main pipeline of the merger.
///
/// Locates, parses, registers, trims, and merges the logs described by the config, and writes
/// the display-unit groups if an output path is set.
pub fn process(config: &Config) -> Result<ProcessSummary, ProcessorError> {
    let delimiter = config.get_delimiter()?;
    let window = config.time_window()?;

    let locator = FileLocator::new(&config.data_path)?;
    log::info!(
        "Found {} file(s) with total size: {}",
        locator.files().len(),
        human_bytes::human_bytes(locator.get_total_data_size() as f64)
    );

    let parser = RecordParser::new(delimiter);
    let (mut registry, skipped_files) = build_registry(&locator, &parser)?;
    log::info!(
        "Registered {} file(s) with {} rows and {} channels",
        registry.len(),
        registry.data_size(),
        registry.channels().len()
    );

    let valid_rows = TimeWindowTrimmer::new(window).trim(&mut registry)?;

    let channel_config = load_channel_config(config, &registry, delimiter)?;
    let merger = ChannelMerger::new(&registry)?;
    let dataset = merger.merge_all(&channel_config)?;
    if dataset.is_empty() {
        log::warn!("None of the configured channels had data to merge");
    }

    let written = match &config.output_path {
        Some(path) => GroupWriter::new(path, delimiter)?.write_groups(&dataset, &channel_config)?,
        None => Vec::new(),
    };

    Ok(ProcessSummary {
        dataset,
        channel_config,
        accepted_files: registry.len(),
        skipped_files,
        data_size: registry.data_size(),
        valid_rows,
        written,
    })
}
