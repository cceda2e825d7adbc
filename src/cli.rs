//! CLI argument parsing for the routewriter-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "routewriter-worker", about = "Field-service route optimization worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP (and optional NATS) server (default if no subcommand given)
    Serve,
    /// Optimize one request from a JSON file and print the response
    Solve {
        /// Path to an optimize request (`{technicians, jobs}`)
        #[arg(long)]
        file: PathBuf,
        /// Treat the file as a single-technician request (`{start_location, job_locations}`)
        #[arg(long)]
        single: bool,
        /// Override the solver time budget in seconds
        #[arg(long)]
        time_budget_secs: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["routewriter-worker"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_serve_command_parses() {
        let cli = Cli::parse_from(["routewriter-worker", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_solve_command_parses() {
        let cli = Cli::parse_from(["routewriter-worker", "solve", "--file", "request.json"]);
        match cli.command {
            Some(Command::Solve {
                file,
                single,
                time_budget_secs,
            }) => {
                assert_eq!(file, PathBuf::from("request.json"));
                assert!(!single);
                assert!(time_budget_secs.is_none());
            }
            _ => panic!("expected solve command"),
        }
    }

    #[test]
    fn test_cli_solve_time_budget_parses() {
        let cli = Cli::parse_from([
            "routewriter-worker",
            "solve",
            "--file",
            "r.json",
            "--single",
            "--time-budget-secs",
            "3",
        ]);
        assert!(matches!(
            cli.command,
            Some(Command::Solve {
                single: true,
                time_budget_secs: Some(3),
                ..
            })
        ));
    }

    #[test]
    fn test_cli_solve_requires_file() {
        assert!(Cli::try_parse_from(["routewriter-worker", "solve"]).is_err());
    }
}
