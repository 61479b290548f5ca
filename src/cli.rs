use crate::commands::{
    CommandReport, blacklist, credentials, hide, history, models, rules, summarize, watch,
};
use crate::condenser::rules::RuleKind;
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "condenser", version, about = "Condense long chat transcripts into short LLM summaries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the most recent messages now, regardless of the pointer
    Summarize {
        /// Chat log file (JSON array of messages)
        #[arg(long)]
        chat: PathBuf,
    },
    /// Poll the chat log and run the automatic trigger on new messages
    Watch {
        #[arg(long)]
        chat: PathBuf,
        /// Run a single evaluation cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Manage extraction rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Manage the blacklist of literal strings scrubbed after extraction
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Show or clear the summary history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Hide messages below the keep-visible watermark
    Hide {
        #[arg(long)]
        chat: PathBuf,
        /// Override the configured keep-visible count
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Unhide every hidden message
    Unhide {
        #[arg(long)]
        chat: PathBuf,
    },
    /// Show visible/hidden/total counts
    HideStatus {
        #[arg(long)]
        chat: PathBuf,
    },
    /// List models available at the configured endpoint
    Models,
    /// Verify endpoint, key, and model with a minimal completion
    Test,
    /// Store API endpoint and key in the credentials side-file
    Credentials {
        #[arg(long, default_value = "")]
        endpoint: String,
        #[arg(long, default_value = "")]
        api_key: String,
    },
}

#[derive(Debug, Subcommand)]
enum RulesAction {
    /// List rules in application order
    List,
    /// Add a rule (regex patterns are validated before being stored)
    Add {
        /// include, exclude, regex-include, or regex-exclude
        kind: RuleKind,
        pattern: String,
    },
    /// Remove the rule at the given index
    Remove { index: usize },
    /// Remove all rules
    Clear,
    /// Install a named preset rule bundle
    Preset { key: String },
    /// Run extraction against the last message of a chat log
    Test {
        #[arg(long)]
        chat: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum BlacklistAction {
    List,
    Add { entry: String },
    Remove { index: usize },
    Clear,
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    /// Print stored summaries, most recent first
    Show,
    /// Delete all summaries and reset the scheduler pointer
    Clear,
}

fn emit(report: CommandReport) -> Result<()> {
    for line in &report.details {
        println!("{line}");
    }
    for line in &report.issues {
        println!("✗ {line}");
    }
    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("{} reported {} issue(s)", report.command, report.issues.len()))
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Summarize { chat } => {
            summarize::run(&summarize::SummarizeOptions { chat })?
        }
        Command::Watch { chat, once } => watch::run(&watch::WatchOptions { chat, once })?,
        Command::Rules { action } => match action {
            RulesAction::List => rules::run_list()?,
            RulesAction::Add { kind, pattern } => rules::run_add(kind, &pattern)?,
            RulesAction::Remove { index } => rules::run_remove(index)?,
            RulesAction::Clear => rules::run_clear()?,
            RulesAction::Preset { key } => rules::run_preset(&key)?,
            RulesAction::Test { chat } => rules::run_test(&chat)?,
        },
        Command::Blacklist { action } => match action {
            BlacklistAction::List => blacklist::run_list()?,
            BlacklistAction::Add { entry } => blacklist::run_add(&entry)?,
            BlacklistAction::Remove { index } => blacklist::run_remove(index)?,
            BlacklistAction::Clear => blacklist::run_clear()?,
        },
        Command::History { action } => match action {
            HistoryAction::Show => history::run_show()?,
            HistoryAction::Clear => history::run_clear()?,
        },
        Command::Hide { chat, keep } => hide::run_hide(&chat, keep)?,
        Command::Unhide { chat } => hide::run_unhide(&chat)?,
        Command::HideStatus { chat } => hide::run_status(&chat)?,
        Command::Models => models::run_list()?,
        Command::Test => models::run_test_connection()?,
        Command::Credentials { endpoint, api_key } => {
            credentials::run_set(&endpoint, &api_key)?
        }
    };

    emit(report)
}
