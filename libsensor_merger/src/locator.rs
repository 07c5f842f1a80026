use std::path::{Path, PathBuf};

use super::channel_config::CHANNEL_CONFIG_FILE_NAME;
use super::error::LocatorError;

/// Extension of the sensor log files
pub const LOG_EXTENSION: &str = "csv";

/// FileLocator collects the log files making up a dataset.
///
/// The files are sorted lexicographically by their full path string. That order is the order rows
/// are laid out in the merged timeline, so it must be deterministic. Symlinked directories are not
/// followed.
#[derive(Debug, Clone)]
pub struct FileLocator {
    files: Vec<PathBuf>,
    total_data_size_bytes: u64,
}

impl FileLocator {
    /// Locate the log files under root using the default extension and reserved config name
    pub fn new(root: &Path) -> Result<Self, LocatorError> {
        Self::with_filter(root, LOG_EXTENSION, CHANNEL_CONFIG_FILE_NAME)
    }

    /// Locate files with the given extension under root, excluding the reserved file name.
    ///
    /// If root is a single file it is the only result, whatever its name.
    pub fn with_filter(root: &Path, extension: &str, reserved: &str) -> Result<Self, LocatorError> {
        if !root.exists() {
            return Err(LocatorError::BadFilePath(root.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = Vec::new();
        if root.is_file() {
            files.push(root.to_path_buf());
        } else {
            Self::walk(root, extension, reserved, &mut files)?;
            if files.is_empty() {
                return Err(LocatorError::NoInputFiles(root.to_path_buf()));
            }
        }

        files.sort_by_cached_key(|path| path.to_string_lossy().into_owned());

        let mut total_data_size_bytes = 0;
        for path in files.iter() {
            total_data_size_bytes += path.metadata()?.len();
        }

        Ok(Self {
            files,
            total_data_size_bytes,
        })
    }

    /// Recursively collect the matching files of a directory
    fn walk(
        dir: &Path,
        extension: &str,
        reserved: &str,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), LocatorError> {
        for item in dir.read_dir()? {
            let item = item?;
            let item_path = item.path();
            if item.file_type()?.is_dir() {
                Self::walk(&item_path, extension, reserved, files)?;
                continue;
            }
            let is_reserved = item_path
                .file_name()
                .is_some_and(|name| name.to_string_lossy() == reserved);
            let has_extension = item_path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == extension);
            if has_extension && !is_reserved {
                files.push(item_path);
            }
        }
        Ok(())
    }

    /// The located files in processing order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Get total size of the located files
    pub fn get_total_data_size(&self) -> u64 {
        self.total_data_size_bytes
    }
}
