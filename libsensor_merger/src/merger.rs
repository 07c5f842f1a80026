use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use time::PrimitiveDateTime;

use super::channel::ChannelName;
use super::channel_config::{ChannelConfig, ChannelConfigEntry};
use super::error::MergeError;
use super::registry::{FileEntry, SeriesRegistry};
use super::trimmer::format_timestamp;

/// The merged data of one channel, handed to the renderer.
///
/// `index_chain` holds one half-open range of `timeline` positions per contributing file, and
/// consecutive ranges always touch end to end. `values` lines up with the positions of the chain
/// in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackagedSeries {
    pub timeline: Arc<Vec<PrimitiveDateTime>>,
    pub values: Vec<f64>,
    pub index_chain: Vec<Range<usize>>,
}

impl PackagedSeries {
    /// The positions of the timeline covered by this channel
    pub fn span(&self) -> Range<usize> {
        match (self.index_chain.first(), self.index_chain.last()) {
            (Some(first), Some(last)) => first.start..last.end,
            _ => 0..0,
        }
    }

    /// The timestamps matching `values`
    pub fn times(&self) -> &[PrimitiveDateTime] {
        &self.timeline[self.span()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Merged channels keyed by name
pub type MergedDataset = BTreeMap<ChannelName, PackagedSeries>;

/// ChannelMerger concatenates the trimmed slices of every file into one series per channel.
///
/// Merging is all or nothing: a channel whose slices do not line up end to end is an error and
/// no series is produced for it.
#[derive(Debug)]
pub struct ChannelMerger<'a> {
    registry: &'a SeriesRegistry,
    timeline: Arc<Vec<PrimitiveDateTime>>,
}

impl<'a> ChannelMerger<'a> {
    /// Create a merger over a trimmed registry, building the shared timeline
    pub fn new(registry: &'a SeriesRegistry) -> Result<Self, MergeError> {
        let mut timeline = Vec::with_capacity(registry.data_size());
        for entry in registry.entries() {
            let trim = entry
                .trim
                .as_ref()
                .ok_or_else(|| MergeError::Untrimmed(entry.key.to_string()))?;
            timeline.extend_from_slice(&trim.timestamps);
        }
        Ok(Self {
            registry,
            timeline: Arc::new(timeline),
        })
    }

    /// The timestamps of every row of the dataset, in dataset order
    pub fn timeline(&self) -> &[PrimitiveDateTime] {
        &self.timeline
    }

    /// Merge every configured channel.
    ///
    /// Channels that cannot be parsed as numbers are skipped with a warning. A sparse merge fails
    /// the whole call.
    pub fn merge_all(&self, config: &ChannelConfig) -> Result<MergedDataset, MergeError> {
        let mut dataset = MergedDataset::new();
        for (name, entry) in config.iter() {
            match self.merge_channel(name, Some(entry)) {
                Ok(Some(series)) => {
                    log::info!(
                        "Merged channel {name}: {} values from {} file(s)",
                        series.len(),
                        series.index_chain.len()
                    );
                    dataset.insert(name.clone(), series);
                }
                Ok(None) => log::debug!("Channel {name} has no data in the time window"),
                Err(e @ MergeError::BadValue { .. }) => log::warn!("{e}\nSkipping channel."),
                Err(e) => return Err(e),
            }
        }
        Ok(dataset)
    }

    /// Merge a single channel.
    ///
    /// Returns None if no file contributes rows to the channel. If a configuration entry is given
    /// its conversion is applied to every value.
    pub fn merge_channel(
        &self,
        name: &ChannelName,
        config: Option<&ChannelConfigEntry>,
    ) -> Result<Option<PackagedSeries>, MergeError> {
        let mut index_chain: Vec<Range<usize>> = Vec::new();
        let mut contributors: Vec<(&FileEntry, &[String], &[usize])> = Vec::new();

        for entry in self.registry.entries() {
            let Some(raw) = entry.channel(name) else {
                continue;
            };
            let trim = entry
                .trim
                .as_ref()
                .ok_or_else(|| MergeError::Untrimmed(entry.key.to_string()))?;
            let (Some(first), Some(last)) = (trim.valid_idx.first(), trim.valid_idx.last()) else {
                continue;
            };

            // Rows inside a single file must also be contiguous
            if let Some(gap) = trim.valid_idx.windows(2).find(|w| w[1] != w[0] + 1) {
                return Err(self.sparse_error(
                    name,
                    entry.range.start + gap[0] + 1,
                    entry.range.start + gap[1],
                ));
            }

            index_chain.push((entry.range.start + first)..(entry.range.start + last + 1));
            contributors.push((entry, raw, trim.valid_idx.as_slice()));
        }

        if index_chain.is_empty() {
            return Ok(None);
        }

        for pair in index_chain.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(self.sparse_error(name, pair[0].end, pair[1].start));
            }
        }

        let mut values = Vec::with_capacity(index_chain.iter().map(|r| r.len()).sum());
        for (entry, raw, valid_idx) in contributors {
            for &row in valid_idx {
                let value: f64 = raw[row].parse().map_err(|_| MergeError::BadValue {
                    channel: name.clone(),
                    file: entry.key.to_string(),
                    row,
                    value: raw[row].clone(),
                })?;
                values.push(match config {
                    Some(c) => c.convert(value),
                    None => value,
                });
            }
        }

        Ok(Some(PackagedSeries {
            timeline: self.timeline.clone(),
            values,
            index_chain,
        }))
    }

    /// Describe a break between position `end` (exclusive end of one run) and `start`
    fn sparse_error(&self, name: &ChannelName, end: usize, start: usize) -> MergeError {
        let describe = |position: Option<&PrimitiveDateTime>| match position {
            Some(t) => format_timestamp(t).unwrap_or_else(|_| t.to_string()),
            None => String::from("none"),
        };
        MergeError::SparseMerge {
            channel: name.clone(),
            end,
            start,
            end_time: describe(end.checked_sub(1).and_then(|i| self.timeline.get(i))),
            start_time: describe(self.timeline.get(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;
    use crate::trimmer::{TimeWindow, TimeWindowTrimmer};
    use std::path::Path;
    use time::macros::datetime;

    /// Build a file with one row per (minute, value) pair
    fn file_text(header: &str, rows: &[(u32, &str)]) -> String {
        let mut text = format!("Nr;Time;{header}\n");
        for (i, (minute, value)) in rows.iter().enumerate() {
            text.push_str(&format!(
                "{i};2024-01-{:02} {:02}:{:02}:00:000000;{value}\n",
                minute / (24 * 60) + 1,
                (minute / 60) % 24,
                minute % 60
            ));
        }
        text
    }

    fn build(files: &[(&str, String)], window: TimeWindow) -> SeriesRegistry {
        let mut registry = SeriesRegistry::new();
        for (name, text) in files {
            let parsed = RecordParser::default().parse(text).unwrap();
            registry.append(Path::new(name), parsed).unwrap();
        }
        TimeWindowTrimmer::new(window).trim(&mut registry).unwrap();
        registry
    }

    fn ph_config() -> ChannelConfig {
        ChannelConfig::from_headers([&ChannelName::new("pH (pH)")])
    }

    fn ph_rows(start: u32, count: u32) -> Vec<(u32, &'static str)> {
        (start..start + count).map(|m| (m, "7,25")).collect()
    }

    #[test]
    fn test_two_contiguous_files() {
        let registry = build(
            &[
                ("a.csv", file_text("pH (pH)", &ph_rows(0, 5))),
                ("b.csv", file_text("pH (pH)", &ph_rows(5, 5))),
            ],
            TimeWindow::default(),
        );
        let merger = ChannelMerger::new(&registry).unwrap();
        let dataset = merger.merge_all(&ph_config()).unwrap();
        let series = &dataset[&ChannelName::new("pH (pH)")];
        assert_eq!(series.timeline.len(), 10);
        assert_eq!(series.index_chain, vec![0..5, 5..10]);
        assert_eq!(series.values, vec![7.25; 10]);
        assert_eq!(series.times().len(), series.len());
    }

    #[test]
    fn test_window_excludes_second_file() {
        let registry = build(
            &[
                ("a.csv", file_text("pH (pH)", &ph_rows(0, 5))),
                ("b.csv", file_text("pH (pH)", &ph_rows(60, 5))),
            ],
            TimeWindow::new(None, Some(datetime!(2024-01-01 0:30))),
        );
        let merger = ChannelMerger::new(&registry).unwrap();
        let series = merger
            .merge_channel(&ChannelName::new("pH (pH)"), None)
            .unwrap()
            .unwrap();
        assert_eq!(series.index_chain, vec![0..5]);
        assert_eq!(series.len(), 5);
        assert_eq!(series.timeline.len(), 10);
    }

    #[test]
    fn test_sparse_merge_is_fatal() {
        // The last row of b and the first row of c carry a clock twenty days ahead
        let mut b = ph_rows(5, 7);
        b.push((60 * 24 * 20, "7,5"));
        let mut c = vec![(60 * 24 * 20, "7,5")];
        c.extend(ph_rows(12, 4));
        let registry = build(
            &[
                ("a.csv", file_text("pH (pH)", &ph_rows(0, 5))),
                ("b.csv", file_text("pH (pH)", &b)),
                ("c.csv", file_text("pH (pH)", &c)),
            ],
            TimeWindow::new(None, Some(datetime!(2024-01-10 0:00))),
        );
        let merger = ChannelMerger::new(&registry).unwrap();
        match merger.merge_all(&ph_config()) {
            Err(MergeError::SparseMerge {
                channel,
                end,
                start,
                end_time,
                start_time,
            }) => {
                assert_eq!(channel.as_str(), "pH (pH)");
                assert_eq!((end, start), (12, 14));
                assert_eq!(end_time, "2024-01-01 00:11:00:000000");
                assert_eq!(start_time, "2024-01-01 00:12:00:000000");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_channel_missing_from_middle_file() {
        let registry = build(
            &[
                ("a.csv", file_text("pH (pH)", &ph_rows(0, 3))),
                ("b.csv", file_text("Redox (mV)", &ph_rows(3, 3))),
                ("c.csv", file_text("pH (pH)", &ph_rows(6, 3))),
            ],
            TimeWindow::default(),
        );
        let merger = ChannelMerger::new(&registry).unwrap();
        assert!(matches!(
            merger.merge_channel(&ChannelName::new("pH (pH)"), None),
            Err(MergeError::SparseMerge { end: 3, start: 6, .. })
        ));
        let redox = merger
            .merge_channel(&ChannelName::new("Redox (mV)"), None)
            .unwrap()
            .unwrap();
        assert_eq!(redox.index_chain, vec![3..6]);
        assert_eq!(redox.times()[0], datetime!(2024-01-01 0:03));
    }

    #[test]
    fn test_unconfigured_and_unparseable_channels_are_skipped() {
        let registry = build(
            &[(
                "a.csv",
                "Nr;Time;pH (pH);Status (state)\n\
                 0;2024-01-01 00:00:00:000000;7;ok\n\
                 1;2024-01-01 00:01:00:000000;7;ok\n"
                    .to_string(),
            )],
            TimeWindow::default(),
        );
        let merger = ChannelMerger::new(&registry).unwrap();
        let dataset = merger.merge_all(&ph_config()).unwrap();
        assert_eq!(dataset.len(), 1);

        let all = ChannelConfig::from_headers(registry.channels());
        assert_eq!(all.len(), 2);
        let dataset = merger.merge_all(&all).unwrap();
        assert!(dataset.contains_key(&ChannelName::new("pH (pH)")));
        assert!(!dataset.contains_key(&ChannelName::new("Status (state)")));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let files = [
            ("a.csv", file_text("pH (pH)", &ph_rows(0, 4))),
            ("b.csv", file_text("pH (pH)", &ph_rows(4, 4))),
        ];
        let window = TimeWindow::new(Some(datetime!(2024-01-01 0:01)), None);
        let first = build(&files, window);
        let second = build(&files, window);
        let config = ph_config();
        assert_eq!(
            ChannelMerger::new(&first).unwrap().merge_all(&config).unwrap(),
            ChannelMerger::new(&second).unwrap().merge_all(&config).unwrap()
        );
    }

    #[test]
    fn test_untrimmed_registry() {
        let mut registry = SeriesRegistry::new();
        let parsed = RecordParser::default()
            .parse(&file_text("pH (pH)", &ph_rows(0, 2)))
            .unwrap();
        registry.append(Path::new("a.csv"), parsed).unwrap();
        assert!(matches!(
            ChannelMerger::new(&registry),
            Err(MergeError::Untrimmed(_))
        ));
    }
}
