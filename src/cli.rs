//! Command-line interface for the `crowdfund` binary.
//!
//! Running without a subcommand starts the API server. The other
//! subcommands are operational tools: applying migrations, reconciling
//! campaign totals, connectivity checks and small data repairs.

use clap::{Args, Parser, Subcommand};

/// crowdfund - crowdfunding platform API server and operations tool
#[derive(Debug, Parser)]
#[command(name = "crowdfund")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run migrations and start the HTTP server
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Compare campaign totals with their transactions
    Reconcile(ReconcileCommand),

    /// Check that the server and the database are reachable
    Check(CheckCommand),

    /// Grant the admin role to a user
    PromoteAdmin(PromoteAdminCommand),
}

/// Reconcile command arguments.
#[derive(Debug, Args)]
pub struct ReconcileCommand {
    /// Rewrite drifted counters instead of only reporting them
    #[arg(long)]
    pub apply: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Base URL of the server (defaults to http://localhost:<SERVER_PORT>)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

/// Promote-admin command arguments.
#[derive(Debug, Args)]
pub struct PromoteAdminCommand {
    /// Email of the user to promote
    pub email: String,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "crowdfund");
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["crowdfund"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_reconcile_flags() {
        let cli = Cli::try_parse_from(["crowdfund", "reconcile", "--apply", "--json"]).unwrap();
        match cli.command {
            Some(Command::Reconcile(cmd)) => {
                assert!(cmd.apply);
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_promote_admin_takes_email() {
        let cli = Cli::try_parse_from(["crowdfund", "promote-admin", "ada@example.com"]).unwrap();
        match cli.command {
            Some(Command::PromoteAdmin(cmd)) => assert_eq!(cmd.email, "ada@example.com"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verbosity_to_filter() {
        let verbose = Cli::try_parse_from(["crowdfund", "-v", "migrate"]).unwrap();
        assert_eq!(verbose.log_filter(), "debug");

        let trace = Cli::try_parse_from(["crowdfund", "check", "-vv"]).unwrap();
        assert_eq!(trace.log_filter(), "trace");

        let quiet = Cli::try_parse_from(["crowdfund", "-q", "-v"]).unwrap();
        assert_eq!(quiet.log_filter(), "error");
    }
}
