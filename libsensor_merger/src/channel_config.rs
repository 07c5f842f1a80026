// The channel configuration is the caller's statement of which channels are worth merging
// and how they should be presented:
// raw channel name -> (type, label, unit, display unit)
// The display unit is the grouping key; every channel sharing a display unit ends up on the
// same chart downstream. The configuration lives in the reserved config.csv next to the data,
// which is why the FileLocator never treats that file as a log.
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::channel::ChannelName;
use super::error::ChannelConfigError;

/// Reserved name of the channel configuration file
pub const CHANNEL_CONFIG_FILE_NAME: &str = "config.csv";

const ENTRIES_PER_LINE: usize = 5; // name, type, label, unit, display unit

/// The kind of quantity a channel measures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    Orp,
    Ph,
    Temperature,
    Other(String),
}

impl FromStr for ChannelKind {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = s.trim();
        Ok(match kind.to_lowercase().as_str() {
            "orp" => Self::Orp,
            "ph" => Self::Ph,
            "temperature" => Self::Temperature,
            _ => Self::Other(kind.to_string()),
        })
    }
}

impl ChannelKind {
    /// Convert a value from its source unit to the display unit.
    ///
    /// No conversions are defined yet, so every kind passes values through untouched.
    pub fn convert(&self, value: f64, _unit: &str, _display_unit: &str) -> f64 {
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfigEntry {
    pub kind: ChannelKind,
    pub label: String,
    pub unit: String,
    pub display_unit: String,
}

impl ChannelConfigEntry {
    pub fn convert(&self, value: f64) -> f64 {
        self.kind.convert(value, &self.unit, &self.display_unit)
    }
}

/// ChannelConfig maps raw channel names to their configuration.
///
/// Only channels present here take part in merging.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    map: BTreeMap<ChannelName, ChannelConfigEntry>,
}

impl ChannelConfig {
    /// Read a channel configuration file delimited with the data delimiter
    pub fn new(path: &Path, delimiter: char) -> Result<Self, ChannelConfigError> {
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        Self::from_contents(&contents, delimiter)
    }

    /// Parse the text of a channel configuration file. The first line is a header.
    pub fn from_contents(contents: &str, delimiter: char) -> Result<Self, ChannelConfigError> {
        let mut config = Self::default();

        for (line_number, line) in contents.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let entries: Vec<&str> = line.split(delimiter).map(str::trim).collect();
            if entries.len() != ENTRIES_PER_LINE {
                return Err(ChannelConfigError::BadFileFormat(line_number + 1));
            }

            let name = ChannelName::new(entries[0]);
            name.header()?;
            let entry = ChannelConfigEntry {
                kind: ChannelKind::from_str(entries[1]).unwrap_or_else(|never| match never {}),
                label: entries[2].to_string(),
                unit: entries[3].to_string(),
                display_unit: entries[4].to_string(),
            };
            config.map.insert(name, entry);
        }

        Ok(config)
    }

    /// Derive a configuration from channel headers alone.
    ///
    /// Every channel declaring a unit is included and grouped by its effective unit. Channels
    /// without a unit (the timestamp and ordinal columns) are left out.
    pub fn from_headers<'a>(channels: impl IntoIterator<Item = &'a ChannelName>) -> Self {
        let mut config = Self::default();
        for name in channels {
            let header = match name.header() {
                Ok(h) => h,
                Err(_) => continue,
            };
            let (Some(unit), Some(display_unit)) = (header.unit.clone(), header.effective_unit())
            else {
                continue;
            };
            let entry = ChannelConfigEntry {
                kind: ChannelKind::Other(unit.clone()),
                label: header.label.clone(),
                display_unit: display_unit.to_string(),
                unit,
            };
            config.map.insert(name.clone(), entry);
        }
        config
    }

    pub fn insert(&mut self, name: ChannelName, entry: ChannelConfigEntry) {
        self.map.insert(name, entry);
    }

    pub fn get(&self, name: &ChannelName) -> Option<&ChannelConfigEntry> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &ChannelName) -> bool {
        self.map.contains_key(name)
    }

    /// Iterate over the configured channels in name order
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelName, &ChannelConfigEntry)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
