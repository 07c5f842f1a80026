use time::macros::format_description;
use time::PrimitiveDateTime;

use super::error::TrimError;
use super::registry::{SeriesRegistry, TrimmedRows};

/// Parse a log timestamp, `YYYY-MM-DD HH:MM:SS:ffffff`
pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]:[subsecond digits:6]"),
    )
}

/// Format a timestamp the way the logs write it
pub fn format_timestamp(value: &PrimitiveDateTime) -> Result<String, time::error::Format> {
    value.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]:[subsecond digits:6]"
    ))
}

/// Parse a time window bound, `YYYY-MM-DD HH:MM`
pub fn parse_window_bound(value: &str) -> Result<PrimitiveDateTime, TrimError> {
    PrimitiveDateTime::parse(
        value.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    )
    .map_err(|source| TrimError::BadWindowBound {
        value: value.to_string(),
        source,
    })
}

/// An optional wall-clock window. Both bounds are exclusive; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<PrimitiveDateTime>,
    pub end: Option<PrimitiveDateTime>,
}

impl TimeWindow {
    pub fn new(start: Option<PrimitiveDateTime>, end: Option<PrimitiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Build a window from optional `YYYY-MM-DD HH:MM` strings
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self, TrimError> {
        Ok(Self {
            start: start.map(parse_window_bound).transpose()?,
            end: end.map(parse_window_bound).transpose()?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, time: &PrimitiveDateTime) -> bool {
        let after_start = self.start.map_or(true, |start| *time > start);
        let before_end = self.end.map_or(true, |end| *time < end);
        after_start && before_end
    }
}

/// TimeWindowTrimmer parses the timestamps of every registered file and marks the rows inside
/// the time window.
#[derive(Debug, Clone, Default)]
pub struct TimeWindowTrimmer {
    window: TimeWindow,
}

impl TimeWindowTrimmer {
    pub fn new(window: TimeWindow) -> Self {
        Self { window }
    }

    /// Trim every file of the registry in place.
    ///
    /// Returns the total number of valid rows. Fails if no row of any file is in the window, as
    /// there is then nothing to merge.
    pub fn trim(&self, registry: &mut SeriesRegistry) -> Result<usize, TrimError> {
        let mut total_valid = 0;
        for entry in registry.entries_mut() {
            let mut timestamps = Vec::with_capacity(entry.row_count());
            for (row, value) in entry.time_values().iter().enumerate() {
                let time = parse_timestamp(value).map_err(|source| TrimError::BadTimestamp {
                    file: entry.key.to_string(),
                    row,
                    value: value.clone(),
                    source,
                })?;
                timestamps.push(time);
            }

            let valid_idx: Vec<usize> = timestamps
                .iter()
                .enumerate()
                .filter(|(_, time)| self.window.contains(time))
                .map(|(row, _)| row)
                .collect();
            if valid_idx.is_empty() {
                log::info!("File {} has no rows in the time window", entry.key);
            }
            total_valid += valid_idx.len();

            entry.trim = Some(TrimmedRows {
                timestamps,
                valid_idx,
            });
        }

        if total_valid == 0 {
            return Err(TrimError::EmptyTimeRange);
        }
        log::info!(
            "{total_valid} of {} rows are in the time window",
            registry.data_size()
        );
        Ok(total_valid)
    }
}
