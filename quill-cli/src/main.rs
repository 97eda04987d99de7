use clap::Parser;
use quill_core::error::QuillError;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    version,
    about = "Synchronize a documentation corpus into a typed relationship graph"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into an exit code.
///
/// Exit codes:
///   0 — success
///   1 — general/unknown error
///   2 — configuration error
///   3 — corpus not initialized
///   4 — store/database error
///   5 — sync already in progress
///   6 — parse or identity error
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(quill) = err.downcast_ref::<QuillError>() {
        return match quill {
            QuillError::Config(_) => 2,
            QuillError::Store(_) => 4,
            QuillError::SyncInProgress { .. } => 5,
            QuillError::Parse(_) | QuillError::DuplicateIdentity { .. } => 6,
            QuillError::Io(_) => 1,
        };
    }
    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("not initialized") || lower.contains("cannot resolve path") {
        3
    } else if lower.contains("config") {
        2
    } else if lower.contains("database") || lower.contains("sqlite") {
        4
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::error::{ConfigError, ParseError, StoreError};

    #[test]
    fn exit_code_not_initialized() {
        let err = anyhow::anyhow!("Quill is not initialized in /foo. Run `quill init` first.");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_config() {
        let err = anyhow::Error::from(QuillError::Config(ConfigError::Invalid("bad".into())));
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_store() {
        let err = anyhow::Error::from(QuillError::Store(StoreError::Unavailable("gone".into())));
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_sync_in_progress() {
        let err = anyhow::Error::from(QuillError::SyncInProgress {
            path: ".quill/sync.lock".into(),
        });
        assert_eq!(classify_exit_code(&err), 5);
    }

    #[test]
    fn exit_code_parse() {
        let err = anyhow::Error::from(QuillError::Parse(ParseError::MissingField {
            kind: "Stage",
            field: "name",
            path: "docs/stages/stage1_1-x.md".into(),
        }));
        assert_eq!(classify_exit_code(&err), 6);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
