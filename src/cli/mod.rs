//! Command-line interface for esdump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Turning `export` flags into [`ExportOptions`]
//! - The auxiliary `config`, `version` and `completion` subcommands

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::connection::ElasticIndex;
use crate::error::{ConfigError, Result};
use crate::export::options::DEFAULT_OUTPUT;
use crate::export::{ExportCoordinator, ExportOptions, Filter, OutputTarget};

/// Exit status of a run whose output was cut short by a write failure
pub const EXIT_WRITE_FAILED: i32 = 2;

/// esdump - stream an Elasticsearch index to JSON Lines
#[derive(Parser, Debug)]
#[command(
    name = "esdump",
    version,
    about = "Export an Elasticsearch index to (gzipped) JSON Lines",
    long_about = "Pages through an Elasticsearch index with the scroll API and writes every
hit as one JSON line, optionally gzip-compressed, to a file or stdout."
)]
pub struct CliArgs {
    /// Cluster base URL
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    /// Index (or comma-separated indices, or pattern) to export
    #[arg(short = 'i', long, value_name = "NAME", global = true)]
    pub index: Option<String>,

    /// Username for basic authentication
    #[arg(short = 'u', long = "user", value_name = "USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(short = 'p', long, value_name = "PASSWORD", global = true)]
    pub password: Option<String>,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Quiet mode (warnings and errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for esdump
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export documents from the index
    Export(ExportArgs),

    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type
        #[arg(value_enum, value_name = "SHELL")]
        shell: Shell,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// Flags of the `export` subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file, or `-` for stdout
    #[arg(short = 'o', long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Maximum number of documents to export (0 = all)
    #[arg(short = 'c', long = "count", value_name = "MAX", default_value_t = 0)]
    pub max_docs: u64,

    /// Query filter as JSON
    #[arg(short = 'm', long = "match", value_name = "FILTER", default_value = Filter::MATCH_ALL)]
    pub match_body: String,

    /// Gzip the output
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub gzip: bool,

    /// Hits requested per scroll page
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Records buffered between fetching and writing
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Show a live progress spinner on stderr
    #[arg(long)]
    pub progress: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    ///
    /// The merged result is validated, so a bad flag fails as early as a
    /// bad file does.
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration (CLI args take precedence)
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(url) = &args.url {
            config.connection.url = url.clone();
        }
        if let Some(index) = &args.index {
            config.connection.index = Some(index.clone());
        }
        if let Some(username) = &args.username {
            config.connection.username = Some(username.clone());
        }
        if let Some(password) = &args.password {
            config.connection.password = Some(password.clone());
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }

        if let Commands::Export(export) = &args.command {
            if let Some(page_size) = export.page_size {
                config.export.page_size = page_size;
            }
            if let Some(capacity) = export.queue_capacity {
                config.export.queue_capacity = capacity;
            }
        }
    }

    /// Get parsed CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Get loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Log level implied by the verbosity flags and the config file
    pub fn log_level(&self) -> tracing::Level {
        if self.args.very_verbose {
            tracing::Level::TRACE
        } else if self.args.verbose {
            tracing::Level::DEBUG
        } else if self.args.quiet {
            tracing::Level::WARN
        } else {
            self.config.logging.level.to_tracing_level()
        }
    }

    /// Run the selected subcommand
    ///
    /// # Returns
    /// * `Result<i32>` - Process exit status
    pub async fn execute(&self) -> Result<i32> {
        match &self.args.command {
            Commands::Export(export) => self.run_export(export).await,
            Commands::Version => {
                self.show_version();
                Ok(0)
            }
            Commands::Completion { shell } => {
                let mut cmd = CliArgs::command();
                clap_complete::generate(*shell, &mut cmd, "esdump", &mut std::io::stdout());
                Ok(0)
            }
            Commands::Config { show, validate } => {
                if *validate {
                    self.validate_config();
                }
                if *show || !*validate {
                    self.show_config()?;
                }
                Ok(0)
            }
        }
    }

    /// Build the export options for the given flags
    pub fn export_options(&self, export: &ExportArgs) -> ExportOptions {
        ExportOptions::new(
            OutputTarget::parse(&export.output),
            Filter::new(&export.match_body),
            export.gzip,
            &self.config.export,
        )
        .with_max_records(export.max_docs)
        .with_progress_bar(export.progress)
    }

    async fn run_export(&self, export: &ExportArgs) -> Result<i32> {
        let index_name = self
            .config
            .connection
            .index
            .clone()
            .ok_or_else(|| ConfigError::MissingField("connection.index (--index)".to_string()))?;

        let options = self.export_options(export);
        let index = ElasticIndex::new(&self.config.connection, index_name)?;
        info!(
            "export index {} on {} to {}",
            index.index(),
            index.base_url(),
            options.target
        );

        let report = ExportCoordinator::new(Arc::new(index), options)
            .execute()
            .await?;

        match report.write_error {
            Some(e) => {
                error!("Export stopped early: {}", e);
                Ok(EXIT_WRITE_FAILED)
            }
            None => Ok(0),
        }
    }

    fn show_version(&self) {
        println!("esdump {}", env!("CARGO_PKG_VERSION"));
    }

    fn validate_config(&self) {
        println!("Configuration file: {}", self.config_path().display());
        // Loading already validated; reaching here means it passed
        println!("Configuration is valid");
    }

    /// Print the effective configuration, with the password redacted
    fn show_config(&self) -> Result<()> {
        let mut shown = self.config.clone();
        if shown.connection.password.is_some() {
            shown.connection.password = Some("***".to_string());
        }
        println!("{}", shown.to_toml()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn config_path(&self) -> PathBuf {
        self.args
            .config_file
            .as_deref()
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DumpError;
    use std::io::Write;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    fn export_args(args: &CliArgs) -> &ExportArgs {
        match &args.command {
            Commands::Export(export) => export,
            other => panic!("expected export, got {other:?}"),
        }
    }

    fn empty_config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();
        file
    }

    #[test]
    fn test_export_defaults() {
        let args = parse(&["esdump", "export"]);
        let export = export_args(&args);
        assert_eq!(export.output, "./tmp_export.json.gz");
        assert_eq!(export.max_docs, 0);
        assert_eq!(export.match_body, r#"{"match_all":{}}"#);
        assert!(export.gzip);
        assert!(!export.progress);
    }

    #[test]
    fn test_gzip_can_be_disabled() {
        let args = parse(&["esdump", "export", "--gzip=false", "-o", "-"]);
        let export = export_args(&args);
        assert!(!export.gzip);
        assert_eq!(export.output, "-");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["esdump", "export", "--index", "logs", "-c", "500", "-v"]);
        assert_eq!(args.index.as_deref(), Some("logs"));
        assert!(args.verbose);
        assert_eq!(export_args(&args).max_docs, 500);
    }

    #[test]
    fn test_args_override_config() {
        let file = empty_config_file();
        let path = file.path().to_str().unwrap();
        let args = parse(&[
            "esdump",
            "--config",
            path,
            "--url",
            "http://es.internal:9200",
            "--user",
            "reader",
            "--password",
            "secret",
            "export",
            "--page-size",
            "500",
            "--queue-capacity",
            "8",
        ]);
        let cli = CliInterface::from_args(args).unwrap();
        assert_eq!(cli.config().connection.url, "http://es.internal:9200");
        assert_eq!(cli.config().connection.username.as_deref(), Some("reader"));
        assert_eq!(cli.config().export.page_size, 500);
        assert_eq!(cli.config().export.queue_capacity, 8);
    }

    #[test]
    fn test_invalid_flag_value_rejected() {
        let file = empty_config_file();
        let args = parse(&[
            "esdump",
            "--config",
            file.path().to_str().unwrap(),
            "export",
            "--page-size",
            "0",
        ]);
        assert!(matches!(
            CliInterface::from_args(args),
            Err(DumpError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_page_size_flag_below_configured_threshold_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[export]\nexhaustion_threshold = 100").unwrap();
        let args = parse(&[
            "esdump",
            "--config",
            file.path().to_str().unwrap(),
            "export",
            "--page-size",
            "50",
        ]);
        assert!(matches!(
            CliInterface::from_args(args),
            Err(DumpError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_export_options_from_flags() {
        let file = empty_config_file();
        let args = parse(&[
            "esdump",
            "--config",
            file.path().to_str().unwrap(),
            "export",
            "-o",
            "out.json",
            "-c",
            "120",
            "-m",
            "",
            "--page-size",
            "100",
        ]);
        let cli = CliInterface::from_args(args).unwrap();
        let options = cli.export_options(export_args(cli.args()));

        assert_eq!(options.target, OutputTarget::File(PathBuf::from("out.json.gz")));
        assert_eq!(options.max_records, 120);
        assert!(options.filter.is_match_all());
        assert_eq!(options.page_size, 100);
        assert_eq!(options.exhaustion_threshold, 100);
    }

    #[tokio::test]
    async fn test_export_requires_index() {
        let file = empty_config_file();
        let args = parse(&["esdump", "--config", file.path().to_str().unwrap(), "export"]);
        let cli = CliInterface::from_args(args).unwrap();
        let result = cli.execute().await;
        assert!(matches!(
            result,
            Err(DumpError::Config(ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_log_level_flags() {
        let file = empty_config_file();
        let path = file.path().to_str().unwrap();

        let cli = CliInterface::from_args(parse(&["esdump", "--config", path, "version"])).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::INFO);

        let cli =
            CliInterface::from_args(parse(&["esdump", "--config", path, "-q", "version"])).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::WARN);

        let cli =
            CliInterface::from_args(parse(&["esdump", "--config", path, "--vv", "version"])).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_completion_shell_parsed() {
        let args = parse(&["esdump", "completion", "zsh"]);
        assert!(matches!(args.command, Commands::Completion { shell: Shell::Zsh }));
    }
}
