use clap::{Parser, ValueEnum};
use filesorter::cli::{self, Command, CommandAction, RunOutcome, SortKey};
use std::path::PathBuf;
use std::process::ExitCode;

/// Organize files using regex rules and file metadata, with dry-run
/// previews and undo.
#[derive(Parser, Debug)]
#[command(name = "filesorter", version, about, long_about = None)]
struct Cli {
    /// Target directory to process
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Action to perform on files
    #[arg(short, long, value_enum)]
    action: Option<ActionArg>,

    /// Regex pattern to match filenames
    #[arg(short = 'r', long = "regex")]
    pattern: Option<String>,

    /// Replacement string (rename) or destination folder (move)
    #[arg(short = 'p', long = "replace")]
    replacement: Option<String>,

    /// Grouping key for the sort action
    #[arg(long, value_enum, default_value = "extension")]
    by: ByArg,

    /// Preview changes without making them
    #[arg(long)]
    dry_run: bool,

    /// Undo the last action
    #[arg(long, conflicts_with = "action")]
    undo: bool,

    /// Natural language instruction for an external translator
    #[arg(long, conflicts_with = "action")]
    natural: Option<String>,

    /// Path to a filter configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Sort,
    Rename,
    Move,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ByArg {
    Extension,
    Date,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Some(text) = &args.natural {
        // The translator is an external capability; none is wired into
        // this binary.
        eprintln!(
            "No translation backend is configured; cannot interpret {:?}. \
             Use --action with --regex/--replace instead.",
            text
        );
        return ExitCode::from(1);
    }

    let Some(directory) = args.directory else {
        eprintln!("A target directory is required (--directory <PATH>).");
        return ExitCode::from(1);
    };

    let command = Command {
        directory,
        action: args.action.map(|action| match action {
            ActionArg::Sort => CommandAction::Sort(match args.by {
                ByArg::Extension => SortKey::Extension,
                ByArg::Date => SortKey::Date,
            }),
            ActionArg::Rename => CommandAction::Rename,
            ActionArg::Move => CommandAction::Move,
        }),
        pattern: args.pattern,
        replacement: args.replacement,
        dry_run: args.dry_run,
        undo: args.undo,
    };

    match cli::run_command_with_config(&command, args.config.as_deref()) {
        Ok(RunOutcome::Success) => ExitCode::SUCCESS,
        Ok(RunOutcome::PartialFailure) => ExitCode::from(2),
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::from(1)
        }
    }
}
