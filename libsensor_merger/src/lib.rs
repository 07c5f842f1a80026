//! # sensor_merger
//!
//! sensor_merger combines the delimited text logs written by water-quality sensor loggers into a
//! single timeline per channel. Loggers start a new file every so often (or whenever they are
//! restarted), so one measurement campaign is typically spread over many files, sometimes in
//! nested directories, sometimes with copies of the same file. sensor_merger reads all of them,
//! drops the duplicates, trims everything to an optional time window, and produces one merged
//! series per channel ready to be charted.
//!
//! ## Building & Install
//!
//! To build and install the CLI use `cargo install --path ./sensor_merger_cli` from the top
//! level sensor_merger repository. See the `sensor_merger_cli` crate for usage.
//!
//! ## Log Format
//!
//! Logs are delimited text (`;` by default). The first row names the channels, every following
//! row is one sample:
//!
//! ```text
//! Nr;Time;pH (pH)[pH];Redox (mV)
//! 1;2024-01-01 00:00:00:000000;7,12;231
//! 2;2024-01-01 00:00:10:000000;7,13;229
//! ```
//!
//! - Channel headers are `label`, `label (unit)` or `label (unit)[display unit]`. The display
//! unit decides which chart the channel is drawn on; when it is missing the unit is used.
//! - The `Time` channel holds timestamps in the format `YYYY-MM-DD HH:MM:SS:ffffff`.
//! - If the first data row contains a comma, the file is taken to use decimal commas and every
//! comma in it is read as a period.
//! - Known logger glitches are repaired: a blank first data row, a blank final row, and a final
//! row cut short by an interrupted write are dropped.
//!
//! Files are processed in path order, and that order defines the order of rows in the merged
//! timeline. Empty files, files with fewer than two rows, unparseable files, and files whose first
//! and last timestamps match an already loaded file are skipped with a warning.
//!
//! ## Channel Configuration
//!
//! The channels to merge are listed in `config.csv` in the data directory (this file is never
//! read as a log), using the same delimiter as the logs:
//!
//! ```csv
//! name;type;label;unit;displayUnit
//! pH (pH)[pH];ph;Tank pH;pH;pH
//! Redox (mV);orp;Tank ORP;mV;mV
//! ```
//!
//! If there is no channel configuration, every channel declaring a unit is merged and grouped by
//! its display unit.
//!
//! ## Merging
//!
//! Every channel is merged into a [`merger::PackagedSeries`]: the timeline of the whole dataset,
//! the channel's values inside the time window, and the index chain of timeline ranges each file
//! contributed. The ranges must touch end to end. If they do not (a file in the middle lacks the
//! channel, or the window cuts rows out of the middle of the dataset) the merge fails and reports
//! the channel, the two indices, and the timestamps on either side of the gap. No partial result
//! is ever produced.
//!
//! ## Output
//!
//! If an output directory is configured, one file per display unit is written to it, holding the
//! Time column and one column per channel of the group. These files are the input to charting.
pub mod channel;
pub mod channel_config;
pub mod config;
pub mod error;
pub mod group_writer;
pub mod locator;
pub mod merger;
pub mod parser;
pub mod process;
pub mod registry;
pub mod trimmer;
