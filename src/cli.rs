use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use dynamo_console::config::LogFormat;

#[derive(Parser)]
#[command(name = "dynamo-console")]
#[command(author, version, about, long_about = None)]
#[command(about = "Local backend for a browser DynamoDB console")]
pub struct Cli {
    /// Configuration file (defaults to ./dynamo-console.{toml,json,yaml})
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the proxy and static file server
    Serve(ServeArgs),

    /// List table names
    Tables {
        /// Region to query instead of the configured one
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Scan a table and print it as a grid
    Scan {
        /// Table name
        table: String,

        /// Maximum number of items to read
        #[arg(short, long, default_value_t = 25)]
        limit: i32,

        /// Region to query instead of the configured one
        #[arg(short, long)]
        region: Option<String>,

        /// Print the projected grid as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Manage saved connection profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Directory holding the console bundle
    #[arg(long)]
    pub static_root: Option<PathBuf>,

    /// DynamoDB endpoint, e.g. http://localhost:8000 for DynamoDB Local
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Default region
    #[arg(short, long)]
    pub region: Option<String>,

    /// Refuse destructive calls on protected tables
    #[arg(long, default_value = "false")]
    pub demo: bool,

    /// Take the endpoint from a saved profile
    #[arg(short, long)]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Show saved profiles
    List,

    /// Save a new profile
    Add {
        #[arg(short, long)]
        name: String,

        /// Access key the console signs in with
        #[arg(short, long)]
        key: String,

        #[arg(short, long)]
        endpoint: String,
    },

    /// Delete a profile by id
    Remove { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "dynamo-console",
            "-vv",
            "serve",
            "--listen",
            "0.0.0.0:9000",
            "--endpoint",
            "http://localhost:8000",
            "--demo",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.listen.as_deref(), Some("0.0.0.0:9000"));
                assert_eq!(args.endpoint.as_deref(), Some("http://localhost:8000"));
                assert!(args.demo);
                assert!(args.profile.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["dynamo-console", "scan", "events"]).unwrap();

        match cli.command {
            Commands::Scan {
                table, limit, json, ..
            } => {
                assert_eq!(table, "events");
                assert_eq!(limit, 25);
                assert!(!json);
            }
            _ => panic!("expected scan"),
        }
    }
}
