//! Command-line argument parsing for `dbrun`.

use clap::{Args, Parser, Subcommand};
use db_runner::config::Config;
use db_runner::dialect::Dialect;
use std::path::{Path, PathBuf};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON document on stdout.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Splits, checks, builds and runs SQL the way the editor does.
#[derive(Parser, Debug)]
#[command(name = "dbrun")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a buffer into statements
    Split {
        /// SQL file ("-" or omitted reads stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Dialect whose string rules apply
        #[arg(short = 'd', long, value_name = "DIALECT")]
        dialect: Option<Dialect>,

        /// Print query blocks instead of statements
        #[arg(long)]
        blocks: bool,

        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// Report dangerous keywords per statement
    Check {
        /// SQL file ("-" or omitted reads stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[arg(short = 'd', long, value_name = "DIALECT")]
        dialect: Option<Dialect>,

        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// Build a SELECT from a JSON selection
    Select {
        /// JSON selection file ("-" reads stdin)
        #[arg(long, value_name = "FILE")]
        spec: PathBuf,

        /// Target dialect (defaults to the connection's, then the config's)
        #[arg(short = 'd', long, value_name = "DIALECT")]
        dialect: Option<Dialect>,

        /// Treat the file as AI select tool arguments
        #[arg(long)]
        tool: bool,

        /// Build the COUNT(*) total query instead
        #[arg(long)]
        count: bool,

        /// Execute the built query on the connection
        #[arg(long)]
        execute: bool,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// Run a buffer against a database
    Run {
        /// SQL file ("-" or omitted reads stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Only run blocks touching these 1-based lines (e.g. "1,4")
        #[arg(long, value_name = "LINES", value_delimiter = ',')]
        lines: Vec<usize>,

        /// Run dangerous statements without asking
        #[arg(short = 'y', long)]
        yes: bool,

        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// List filter operators and their SQL for a dialect
    Operators {
        #[arg(short = 'd', long, value_name = "DIALECT")]
        dialect: Option<Dialect>,
    },
}

/// Where to connect.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Connection URL (postgres://..., sqlite://...)
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub url: Option<String>,

    /// Use named connection from config (takes precedence over --url)
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// Returns None when input should come from stdin.
pub fn input_path(file: Option<&Path>) -> Option<&Path> {
    file.filter(|p| p.as_os_str() != "-")
}
