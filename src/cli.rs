use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

use crate::error::ToolError;

#[derive(Parser, Debug)]
#[command(
    name = "kari-mariadb",
    version,
    about = "Install, secure and maintain a single-host MariaDB server"
)]
pub struct Cli {
    /// Output JSON reports instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v = debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Install packages, obtain TLS certificates and reset the root password
    #[command(alias = "bootstrap")]
    Configure,
    /// Manage database users (one database per user)
    Users(UsersCommand),
    /// Copy renewed certificates into place (certbot deploy hook)
    #[command(alias = "renew-certificates")]
    RenewSsl,
    /// Switch bind-address between loopback and all interfaces
    #[command(alias = "toggle-remote-access")]
    ToggleRemote,
    /// Switch require_secure_transport on or off
    #[command(alias = "toggle-force-tls")]
    ToggleForceSsl,
    /// (Re)write the certbot deploy hook
    InstallRenewalHook,
    /// Replace this binary with the published release
    #[command(alias = "self-update")]
    Update,
}

#[derive(Args, Debug, PartialEq, Eq)]
#[command(arg_required_else_help = true)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub action: UsersAction,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum UsersAction {
    /// Create a user and a database of the same name
    Create { name: Option<String> },
    /// Issue a new password for an existing user
    Reset { name: Option<String> },
    /// Drop a user and its database
    Drop {
        name: Option<String>,
        /// Skip the confirmation prompt (`force` or `--force`)
        #[arg(value_parser = ["force"], hide = true)]
        force_word: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// List accounts known to the server
    List,
    /// Show the grants of a user
    Grants { name: Option<String> },
}

impl UsersAction {
    pub fn forced(&self) -> bool {
        match self {
            UsersAction::Drop { force, force_word, .. } => *force || force_word.is_some(),
            _ => false,
        }
    }
}

// ==============================================================================
// Parse outcome → run or exit
// ==============================================================================

/// Text to show and the status to exit with when nothing will run.
#[derive(Debug)]
pub struct UsageExit {
    pub code: i32,
    pub to_stderr: bool,
    pub text: String,
}

#[derive(Debug)]
pub enum Invocation {
    Run { command: Command, json: bool, verbose: u8 },
    Exit(UsageExit),
}

/// Help and version exit 0 on stdout; a missing or unknown command, or any
/// other parse error, prints usage to stderr and exits 1.
pub fn resolve(parsed: Result<Cli, clap::Error>) -> Invocation {
    let err = match parsed {
        Ok(Cli { command: Some(command), json, verbose }) => {
            return Invocation::Run { command, json, verbose };
        }
        Ok(Cli { command: None, .. }) => {
            return Invocation::Exit(UsageExit {
                code: 1,
                to_stderr: true,
                text: format!("{}\n\n{}", ToolError::MissingArgument("command"), Cli::command().render_help()),
            });
        }
        Err(err) => err,
    };

    let exit = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            UsageExit { code: 0, to_stderr: false, text: err.render().to_string() }
        }
        ErrorKind::InvalidSubcommand => {
            let name = match err.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(name)) => name.clone(),
                _ => String::new(),
            };
            UsageExit {
                code: 1,
                to_stderr: true,
                text: format!("{}\n\n{}", ToolError::UnknownCommand(name), Cli::command().render_usage()),
            }
        }
        _ => UsageExit { code: 1, to_stderr: true, text: err.render().to_string() },
    };
    Invocation::Exit(exit)
}
