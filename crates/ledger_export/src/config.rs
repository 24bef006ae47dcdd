//! Export configuration.

use std::path::PathBuf;

use crate::paths::PathNormalizer;

/// What to export and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Directory source paths are made relative to
    pub base_path: PathBuf,
    /// Directory the table files and JSON artifacts are committed into
    pub output_dir: PathBuf,
    pub strip_paths: bool,
    pub include_options: bool,
    pub include_errors: bool,
    pub include_entries: bool,
}

impl ExportConfig {
    /// Everything enabled.
    pub fn new(base_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            output_dir: output_dir.into(),
            strip_paths: true,
            include_options: true,
            include_errors: true,
            include_entries: true,
        }
    }

    pub fn path_normalizer(&self) -> PathNormalizer {
        if self.strip_paths {
            PathNormalizer::new(self.base_path.clone())
        } else {
            PathNormalizer::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_normalizer_follows_flag() {
        let mut config = ExportConfig::new("/ledger", "/out");
        assert!(config.path_normalizer().is_enabled());
        assert_eq!(config.path_normalizer().base(), std::path::Path::new("/ledger"));

        config.strip_paths = false;
        assert!(!config.path_normalizer().is_enabled());
    }
}
