use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Templater - render templates with caching, batch, watch and safe writes
#[derive(Parser, Debug)]
#[command(name = "templater")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v for debug logs)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this config file instead of discovering one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where render data comes from
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Data file (.json, .yaml or .yml)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Extra KEY=VALUE pairs, applied over the data file
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render one template
    Render {
        template: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail when the data lacks keys the template uses
        #[arg(long)]
        validate: bool,

        /// Treat the template as a JSON document model
        #[arg(long)]
        document: bool,
    },

    /// Render many templates concurrently
    Batch {
        /// Template files or directories to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        /// Directory to write outputs into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of concurrent workers (1-16)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Re-render whenever the template or data file changes
    Watch {
        template: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Data file, reloaded on every change
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Debounce interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List the data keys a template references
    Keys { template: PathBuf },

    /// Check a template compiles, its dependencies exist and data is complete
    Check {
        template: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Show what rendering would change in an existing output
    Diff {
        template: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Restore an output from its most recent backup
    Restore {
        output: PathBuf,

        /// Only list the available backups
        #[arg(long)]
        list: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_render() {
        let cli = Cli::try_parse_from([
            "templater", "render", "a.tmpl", "-d", "data.json", "--set", "name=Ada", "-o", "out.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Render {
                template,
                data,
                output,
                validate,
                document,
            } => {
                assert_eq!(template, PathBuf::from("a.tmpl"));
                assert_eq!(data.data, Some(PathBuf::from("data.json")));
                assert_eq!(data.set, vec!["name=Ada".to_string()]);
                assert_eq!(output, Some(PathBuf::from("out.txt")));
                assert!(!validate && !document);
            }
            other => panic!("Expected Render command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_batch() {
        let cli =
            Cli::try_parse_from(["templater", "batch", "a.tmpl", "dir", "-w", "4", "-o", "out"])
                .unwrap();
        if let Commands::Batch {
            paths,
            workers,
            output,
            ..
        } = cli.command
        {
            assert_eq!(paths, vec![PathBuf::from("a.tmpl"), PathBuf::from("dir")]);
            assert_eq!(workers, Some(4));
            assert_eq!(output, Some(PathBuf::from("out")));
        } else {
            panic!("Expected Batch command");
        }
    }

    #[test]
    fn test_cli_batch_requires_paths() {
        assert!(Cli::try_parse_from(["templater", "batch"]).is_err());
    }

    #[test]
    fn test_cli_watch_requires_output() {
        assert!(Cli::try_parse_from(["templater", "watch", "a.tmpl"]).is_err());
        let cli = Cli::try_parse_from([
            "templater", "watch", "a.tmpl", "-o", "a.txt", "--interval", "250",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch {
                interval: Some(250),
                ..
            }
        ));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["templater", "keys", "a.tmpl", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_parse_restore_list() {
        let cli = Cli::try_parse_from(["templater", "restore", "out.txt", "--list"]).unwrap();
        assert!(matches!(cli.command, Commands::Restore { list: true, .. }));
    }
}
