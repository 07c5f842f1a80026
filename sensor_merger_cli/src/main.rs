//! # sensor_merger_cli
//!
//! Part of the sensor_merger crate family.
//!
//! Merge a directory of sensor logs from the command line.
//!
//! ## Use
//!
//! ```bash
//! sensor_merger_cli -p /path/to/logs -s "2024-01-01 00:00" -e "2024-01-02 00:00" -o charts
//! ```
//!
//! - `-p/--path`: a log file or a directory searched recursively for `.csv` logs (default: the
//! current directory)
//! - `-d/--delimiter`: the field delimiter (default `;`)
//! - `-s/--start`, `-e/--end`: the time window, `YYYY-MM-DD HH:MM`, both exclusive
//! - `-m/--channel-config`: the channel configuration file (default: `config.csv` in the data
//! directory)
//! - `-o/--output`: directory to write one file per display-unit group to
//! - `-c/--config`: a YAML config holding any of the above; command line values win
//!
//! `sensor_merger_cli -c merger.yml new` writes a template YAML config.
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

use libsensor_merger::config::Config;
use libsensor_merger::group_writer::unit_groups;
use libsensor_merger::process::process;

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

/// Apply command line values on top of the config
fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(path) = matches.get_one::<String>("path") {
        config.data_path = PathBuf::from(path);
    }
    if let Some(delimiter) = matches.get_one::<String>("delimiter") {
        config.delimiter = delimiter.clone();
    }
    if let Some(start) = matches.get_one::<String>("start") {
        config.start = Some(start.clone());
    }
    if let Some(end) = matches.get_one::<String>("end") {
        config.end = Some(end.clone());
    }
    if let Some(path) = matches.get_one::<String>("channel-config") {
        config.channel_config_path = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.get_one::<String>("output") {
        config.output_path = Some(PathBuf::from(path));
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("sensor_merger_cli")
        .about("Merge multi-file sensor logs into one timeline per channel")
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a YAML config file"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("The location of the data folder or file"),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .help("The delimiter used in the files"),
        )
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .help("The start of the time window (format: YYYY-MM-DD HH:MM)"),
        )
        .arg(
            Arg::new("end")
                .short('e')
                .long("end")
                .help("The end of the time window (format: YYYY-MM-DD HH:MM)"),
        )
        .arg(
            Arg::new("channel-config")
                .short('m')
                .long("channel-config")
                .help("Path to the channel configuration file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Directory to write the merged unit groups to"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log debug information"),
        )
        .get_matches();

    // Initialize feedback
    let level = if matches.get_flag("verbose") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    if let Err(e) = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Could not create logging: {e}");
    }

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);

    if let Some(("new", _)) = matches.subcommand() {
        match config_path {
            Some(path) => {
                log::info!(
                    "Making a template config at {}...",
                    path.to_string_lossy()
                );
                make_template_config(&path);
            }
            None => log::error!("The new command requires a config path (-c)"),
        }
        return;
    }

    // Load our config
    let mut config = match config_path {
        Some(path) => {
            log::info!("Loading config from {}...", path.to_string_lossy());
            match Config::read_config_file(&path) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("{e}");
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, &matches);

    log::info!("Data Path: {}", config.data_path.to_string_lossy());
    log::info!("Delimiter: {}", config.delimiter);
    log::info!(
        "Start: {} End: {}",
        config.start.as_deref().unwrap_or("none"),
        config.end.as_deref().unwrap_or("none")
    );

    let summary = match process(&config) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Merging failed with error: {e}");
            std::process::exit(1);
        }
    };

    log::info!(
        "Merged {} channel(s) from {} file(s) ({} skipped), {} of {} rows in the time window",
        summary.dataset.len(),
        summary.accepted_files,
        summary.skipped_files,
        summary.valid_rows,
        summary.data_size
    );
    for (display_unit, names) in unit_groups(&summary.dataset, &summary.channel_config) {
        log::info!("[{display_unit}]");
        for name in names {
            let label = summary
                .channel_config
                .get(name)
                .map_or(name.as_str(), |entry| entry.label.as_str());
            let count = summary.dataset.get(name).map_or(0, |series| series.len());
            log::info!("  {label}: {count} values");
        }
    }
    for path in summary.written.iter() {
        log::info!("Wrote {}", path.to_string_lossy());
    }

    log::info!("Done.");
}
