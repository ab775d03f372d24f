//! Run parameters for one export
//!
//! An [`ExportOptions`] value is built once, before the run starts, and the
//! pipeline only ever reads it.

use std::fmt;
use std::path::PathBuf;

use crate::config::ExportSettings;

use super::record::Filter;

/// Default output file when none is given
pub const DEFAULT_OUTPUT: &str = "./tmp_export.json.gz";

/// Suffix appended to compressed file outputs
pub const GZIP_SUFFIX: &str = ".gz";

/// Where exported records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Parse a command-line target; `-` means standard output
    pub fn parse(raw: &str) -> Self {
        if raw == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(raw))
        }
    }

    /// Append `.gz` to file targets that lack it when compressing
    ///
    /// Standard output is never renamed.
    pub fn with_gzip_suffix(self, compress: bool) -> Self {
        match self {
            OutputTarget::File(path) if compress && !path.to_string_lossy().ends_with(GZIP_SUFFIX) => {
                let mut name = path.into_os_string();
                name.push(GZIP_SUFFIX);
                OutputTarget::File(PathBuf::from(name))
            }
            other => other,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => write!(f, "<stdout>"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::File(PathBuf::from(DEFAULT_OUTPUT))
    }
}

/// Immutable parameters of one export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output target, already carrying the `.gz` suffix when compressing
    pub target: OutputTarget,
    /// Stop after this many records; 0 exports everything
    pub max_records: u64,
    pub filter: Filter,
    pub compress: bool,
    /// Hits requested per page
    pub page_size: usize,
    /// Pages shorter than this end the export
    pub exhaustion_threshold: usize,
    /// Relay capacity between fetcher and writer
    pub queue_capacity: usize,
    pub page_report_interval: u64,
    pub item_report_interval: u64,
    /// Draw a spinner on stderr
    pub progress_bar: bool,
}

impl ExportOptions {
    /// Build options for `target`, taking tuning from `settings`
    pub fn new(target: OutputTarget, filter: Filter, compress: bool, settings: &ExportSettings) -> Self {
        Self {
            target: target.with_gzip_suffix(compress),
            max_records: 0,
            filter,
            compress,
            page_size: settings.page_size,
            exhaustion_threshold: settings.effective_threshold(),
            queue_capacity: settings.queue_capacity,
            page_report_interval: settings.page_report_interval,
            item_report_interval: settings.item_report_interval,
            progress_bar: false,
        }
    }

    pub fn with_max_records(mut self, max_records: u64) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stdout() {
        assert_eq!(OutputTarget::parse("-"), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::parse("out.json"),
            OutputTarget::File(PathBuf::from("out.json"))
        );
    }

    #[test]
    fn test_gzip_suffix_rules() {
        let t = OutputTarget::parse("dump.json").with_gzip_suffix(true);
        assert_eq!(t, OutputTarget::File(PathBuf::from("dump.json.gz")));

        let t = OutputTarget::parse("dump.json.gz").with_gzip_suffix(true);
        assert_eq!(t, OutputTarget::File(PathBuf::from("dump.json.gz")));

        let t = OutputTarget::parse("dump.json").with_gzip_suffix(false);
        assert_eq!(t, OutputTarget::File(PathBuf::from("dump.json")));

        assert_eq!(OutputTarget::Stdout.with_gzip_suffix(true), OutputTarget::Stdout);
    }

    #[test]
    fn test_options_from_settings() {
        let mut settings = ExportSettings::default();
        settings.page_size = 100;
        let opts = ExportOptions::new(OutputTarget::parse("x"), Filter::default(), true, &settings)
            .with_max_records(120);

        assert_eq!(opts.target, OutputTarget::File(PathBuf::from("x.gz")));
        assert_eq!(opts.exhaustion_threshold, 100);
        assert_eq!(opts.max_records, 120);
        assert_eq!(opts.queue_capacity, 300);
        assert!(!opts.progress_bar);
    }

    #[test]
    fn test_default_target() {
        assert_eq!(OutputTarget::default().to_string(), "./tmp_export.json.gz");
        assert_eq!(OutputTarget::Stdout.to_string(), "<stdout>");
    }
}
