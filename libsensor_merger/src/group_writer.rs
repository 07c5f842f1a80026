use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::channel::{ChannelName, TIME_LABEL};
use super::channel_config::ChannelConfig;
use super::error::WriterError;
use super::merger::{MergedDataset, PackagedSeries};
use super::trimmer::format_timestamp;

/// Group name for channels without any unit
const UNITLESS_GROUP: &str = "unitless";
const GROUP_EXTENSION: &str = "csv";

/// Group merged channels by display unit. Each group becomes one chart.
pub fn unit_groups<'d>(
    dataset: &'d MergedDataset,
    config: &ChannelConfig,
) -> BTreeMap<String, Vec<&'d ChannelName>> {
    let mut groups: BTreeMap<String, Vec<&'d ChannelName>> = BTreeMap::new();
    for name in dataset.keys() {
        let unit = match config.get(name) {
            Some(entry) => entry.display_unit.clone(),
            None => name
                .header()
                .ok()
                .and_then(|h| h.effective_unit().map(str::to_string))
                .unwrap_or_else(|| UNITLESS_GROUP.to_string()),
        };
        groups.entry(unit).or_default().push(name);
    }
    groups
}

/// Legend label of a channel: the configured label and display unit
fn legend_label(name: &ChannelName, config: &ChannelConfig) -> String {
    match config.get(name) {
        Some(entry) => format!("{} ({})", entry.label, entry.display_unit),
        None => name.to_string(),
    }
}

/// Make a display unit safe to use as a file name
fn group_file_stem(display_unit: &str) -> String {
    let stem: String = display_unit
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        UNITLESS_GROUP.to_string()
    } else {
        stem
    }
}

/// GroupWriter writes one delimited file per display-unit group for an external renderer.
///
/// Each file has a Time column followed by one column per channel of the group. Rows cover every
/// timeline position at which some channel of the group has a value; channels without a value at
/// a row get an empty field.
#[derive(Debug)]
pub struct GroupWriter {
    output_path: PathBuf,
    delimiter: u8,
}

impl GroupWriter {
    /// Create the writer, making the output directory if needed. The delimiter must be ASCII.
    pub fn new(output_path: &Path, delimiter: char) -> Result<Self, WriterError> {
        if !delimiter.is_ascii() {
            return Err(WriterError::BadDelimiter(delimiter));
        }
        std::fs::create_dir_all(output_path)?;
        Ok(Self {
            output_path: output_path.to_path_buf(),
            delimiter: delimiter as u8,
        })
    }

    /// Write every group of the dataset. Returns the paths of the written files.
    pub fn write_groups(
        &self,
        dataset: &MergedDataset,
        config: &ChannelConfig,
    ) -> Result<Vec<PathBuf>, WriterError> {
        let mut written = Vec::new();
        for (display_unit, names) in unit_groups(dataset, config) {
            let channels: Vec<(String, &PackagedSeries)> = names
                .iter()
                .filter_map(|name| Some((legend_label(name, config), dataset.get(*name)?)))
                .collect();
            let path = self
                .output_path
                .join(format!("{}.{GROUP_EXTENSION}", group_file_stem(&display_unit)));
            self.write_group(&path, &channels)?;
            log::info!(
                "Wrote {} channel(s) of group {display_unit} to {}",
                channels.len(),
                path.to_string_lossy()
            );
            written.push(path);
        }
        Ok(written)
    }

    fn write_group(
        &self,
        path: &Path,
        channels: &[(String, &PackagedSeries)],
    ) -> Result<(), WriterError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        let mut header = vec![TIME_LABEL.to_string()];
        header.extend(channels.iter().map(|(label, _)| label.clone()));
        writer.write_record(&header)?;

        let Some(timeline) = channels.first().map(|(_, series)| series.timeline.clone()) else {
            writer.flush()?;
            return Ok(());
        };
        let spans: Vec<_> = channels.iter().map(|(_, series)| series.span()).collect();
        let first = spans.iter().map(|s| s.start).min().unwrap_or(0);
        let last = spans.iter().map(|s| s.end).max().unwrap_or(0);

        for position in first..last {
            if !spans.iter().any(|s| s.contains(&position)) {
                continue;
            }
            let mut fields = vec![format_timestamp(&timeline[position])?];
            for ((_, series), span) in channels.iter().zip(spans.iter()) {
                if span.contains(&position) {
                    fields.push(series.values[position - span.start].to_string());
                } else {
                    fields.push(String::new());
                }
            }
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }
}
