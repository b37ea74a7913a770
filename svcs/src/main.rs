mod output;

use anyhow::{Context, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use output::{
    AddOutput, CheckoutOutput, CommandInfo, CommandsOutput, CommitInfo, CommitOutput,
    ConfigOutput, LogOutput, OutputWriter, RESULT_FAILURE, RESULT_OK, RESULT_USER_ERROR,
    TrackedOutput,
};
use std::path::PathBuf;
use std::process::ExitCode;
use svcs_core::{CommitOutcome, DEFAULT_DIR, Error, Repository};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// svcs - a minimal version-control system
#[derive(Parser)]
#[command(name = "svcs")]
#[command(about = "Minimal version control on a content-addressed BLAKE3 store", long_about = None)]
#[command(version)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Print the command table
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    help: bool,

    /// Repository directory (defaults to SVCS_ROOT env var or ./vcs)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Get and set a username.")]
    Config {
        /// New username
        username: Option<String>,
    },

    #[command(about = "Add a file to the index.")]
    Add {
        /// File to track (lists tracked files if omitted)
        path: Option<String>,
    },

    #[command(about = "Show commit logs.")]
    Log,

    #[command(about = "Save changes.")]
    Commit {
        /// Commit message
        message: Option<String>,
    },

    #[command(about = "Restore a file.")]
    Checkout {
        /// Full id of the commit to restore
        id: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return parse_failure(err),
    };
    init_tracing();

    let output = OutputWriter::new(cli.json);
    finish(run(cli, &output), &output)
}

fn finish(result: Result<u8>, output: &OutputWriter) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            output.write_error(&err, RESULT_FAILURE);
            ExitCode::from(RESULT_FAILURE)
        }
    }
}

/// Report a command line clap could not parse.
///
/// `help` shows the command table and an unknown command is a rejected
/// request, like any other bad input.
fn parse_failure(err: clap::Error) -> ExitCode {
    let json = std::env::args_os().any(|arg| arg == "--json");
    let output = OutputWriter::new(json);

    let result = match err.kind() {
        ErrorKind::DisplayHelp => cmd_help(&output),
        ErrorKind::InvalidSubcommand => {
            let name = match err.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(name)) => name.as_str(),
                _ => "",
            };
            output.reject(format!("'{}' is not a SVCS command.", name))
        }
        ErrorKind::DisplayVersion => {
            let _ = err.print();
            Ok(RESULT_OK)
        }
        _ => {
            let _ = err.print();
            Ok(RESULT_USER_ERROR)
        }
    };
    finish(result, &output)
}

/// Log to stderr, filtered by SVCS_LOG (e.g. `SVCS_LOG=debug`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SVCS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, output: &OutputWriter) -> Result<u8> {
    let Some(command) = cli.command.filter(|_| !cli.help) else {
        return cmd_help(output);
    };

    // Determine repository root: CLI arg > SVCS_ROOT env var > ./vcs default
    let workdir = std::env::current_dir().context("Failed to determine working directory")?;
    let root = cli
        .root
        .or_else(|| std::env::var("SVCS_ROOT").ok().map(PathBuf::from))
        .map(|root| workdir.join(root))
        .unwrap_or_else(|| workdir.join(DEFAULT_DIR));
    debug!(workdir = %workdir.display(), root = %root.display(), "opening repository");

    let mut repo = Repository::prepare_at(&workdir, &root)
        .with_context(|| format!("Failed to open repository at {}", root.display()))?;

    match command {
        Commands::Config { username } => cmd_config(&mut repo, username, output),
        Commands::Add { path } => cmd_add(&mut repo, path, output),
        Commands::Log => cmd_log(&repo, output),
        Commands::Commit { message } => cmd_commit(&mut repo, message, output),
        Commands::Checkout { id } => cmd_checkout(&repo, id, output),
    }
}

fn cmd_help(output: &OutputWriter) -> Result<u8> {
    let commands: Vec<CommandInfo> = Cli::command()
        .get_subcommands()
        .filter(|cmd| cmd.get_name() != "help")
        .map(|cmd| CommandInfo {
            name: cmd.get_name().to_string(),
            description: cmd.get_about().map(|s| s.to_string()).unwrap_or_default(),
        })
        .collect();

    let out = CommandsOutput {
        success: true,
        result_code: RESULT_OK,
        commands,
    };
    output.write(&out, || {
        let mut text = String::from("These are SVCS commands:\n");
        for cmd in &out.commands {
            text.push_str(&format!("{:<9} {}\n", cmd.name, cmd.description));
        }
        text
    })?;

    Ok(RESULT_OK)
}

fn cmd_config(repo: &mut Repository, username: Option<String>, output: &OutputWriter) -> Result<u8> {
    if let Some(name) = username {
        match repo.set_username(&name) {
            Ok(()) => {}
            Err(err @ Error::InvalidUsername { .. }) => return output.reject(err.to_string()),
            Err(err) => return Err(err).context("Failed to save username"),
        }
    }

    let out = ConfigOutput {
        success: true,
        result_code: RESULT_OK,
        username: repo.username().map(str::to_string),
    };
    output.write(&out, || match &out.username {
        Some(name) => format!("The username is {}.\n", name),
        None => "Please, tell me who you are.\n".to_string(),
    })?;

    Ok(RESULT_OK)
}

fn cmd_add(repo: &mut Repository, path: Option<String>, output: &OutputWriter) -> Result<u8> {
    let Some(path) = path else {
        let out = TrackedOutput {
            success: true,
            result_code: RESULT_OK,
            tracked: repo.staged().into_iter().map(str::to_string).collect(),
        };
        output.write(&out, || {
            if out.tracked.is_empty() {
                return "Add a file to the index.\n".to_string();
            }
            let mut text = String::from("Tracked files:\n");
            for path in &out.tracked {
                text.push_str(path);
                text.push('\n');
            }
            text
        })?;
        return Ok(RESULT_OK);
    };

    let newly_tracked = match repo.add(&path) {
        Ok(newly_tracked) => newly_tracked,
        Err(Error::FileNotFound { .. }) => return output.reject(format!("Can't find '{}'.", path)),
        Err(err) if err.is_user_error() => return output.reject(err.to_string()),
        Err(err) => return Err(err).with_context(|| format!("Failed to track {}", path)),
    };

    let out = AddOutput {
        success: true,
        result_code: RESULT_OK,
        path,
        newly_tracked,
    };
    output.write(&out, || format!("The file '{}' is tracked.\n", out.path))?;

    Ok(RESULT_OK)
}

fn cmd_log(repo: &Repository, output: &OutputWriter) -> Result<u8> {
    let out = LogOutput {
        success: true,
        result_code: RESULT_OK,
        commits: repo.log().map(CommitInfo::from).collect(),
    };
    output.write(&out, || {
        if out.commits.is_empty() {
            return "No commits yet.\n".to_string();
        }
        out.commits
            .iter()
            .map(|c| format!("commit {}\nAuthor: {}\n{}\n", c.id, c.author, c.message))
            .collect::<Vec<_>>()
            .join("\n")
    })?;

    Ok(RESULT_OK)
}

fn cmd_commit(repo: &mut Repository, message: Option<String>, output: &OutputWriter) -> Result<u8> {
    let Some(message) = message else {
        return output.reject("Message was not passed.");
    };

    let outcome = match repo.commit(&message) {
        Ok(outcome) => outcome,
        Err(Error::EmptyMessage) => return output.reject("Message was not passed."),
        Err(Error::UnknownIdentity) => return output.reject("Please, tell me who you are."),
        Err(Error::FileNotFound { path }) => return output.reject(format!("Can't find '{}'.", path)),
        Err(err) => return Err(err).context("Failed to commit"),
    };

    let out = match &outcome {
        CommitOutcome::Created(commit) => CommitOutput {
            success: true,
            result_code: RESULT_OK,
            committed: true,
            commit: Some(CommitInfo::from(commit)),
        },
        CommitOutcome::NothingToCommit => CommitOutput {
            success: true,
            result_code: RESULT_OK,
            committed: false,
            commit: None,
        },
    };
    output.write(&out, || {
        if out.committed {
            "Changes are committed.\n".to_string()
        } else {
            "Nothing to commit.\n".to_string()
        }
    })?;

    Ok(RESULT_OK)
}

fn cmd_checkout(repo: &Repository, id: Option<String>, output: &OutputWriter) -> Result<u8> {
    let Some(id) = id else {
        return output.reject("Commit id was not passed.");
    };

    let report = match repo.checkout(&id) {
        Ok(report) => report,
        Err(Error::CommitNotFound { .. }) => return output.reject("Commit does not exist."),
        Err(err) => return Err(err).with_context(|| format!("Failed to check out {}", id)),
    };

    let out = CheckoutOutput {
        success: true,
        result_code: RESULT_OK,
        commit: report.commit.to_hex(),
        files_restored: report.files_restored,
    };
    output.write(&out, || format!("Switched to commit {}.\n", out.commit))?;

    Ok(RESULT_OK)
}
