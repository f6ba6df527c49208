//! `tabgroup config show|set-key|auto`

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use tabgroup_core::{storage::storage_path_at, Action};

use crate::session::Session;

/// Show or edit the credential and auto-classify setting.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current settings.
    Show(ShowArgs),

    /// Set the classification-service key. Pass "" to clear it.
    SetKey {
        /// The key, e.g. "sk-...".
        key: String,
    },

    /// Turn automatic grouping of new tabs on or off.
    Auto {
        #[arg(value_enum)]
        mode: AutoMode,
    },
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoMode {
    On,
    Off,
    Toggle,
}

#[derive(Serialize)]
struct ConfigJson {
    credential_set: bool,
    credential: String,
    auto_classify: bool,
    group_labels: Vec<String>,
    storage: String,
}

pub async fn run(session: &Session, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show(args) => show(session, args),
        ConfigCommand::SetKey { key } => set_key(session, key).await,
        ConfigCommand::Auto { mode } => auto(session, mode).await,
    }
}

fn show(session: &Session, args: ShowArgs) -> Result<()> {
    let cfg = session.store().snapshot();
    let storage = storage_path_at(session.home()).display().to_string();

    if args.json {
        let payload = ConfigJson {
            credential_set: !cfg.credential.is_empty(),
            credential: cfg.masked_credential(),
            auto_classify: cfg.auto_classify,
            group_labels: cfg.group_labels,
            storage,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize settings JSON")?
        );
        return Ok(());
    }

    let credential = if cfg.credential.is_empty() {
        "(not set)".bright_black().to_string()
    } else {
        cfg.masked_credential()
    };
    let auto = if cfg.auto_classify {
        "on".green().to_string()
    } else {
        "off".yellow().to_string()
    };
    println!("key:           {credential}");
    println!("auto classify: {auto}");
    println!("labels:        {}", cfg.group_labels.join(", "));
    println!("storage:       {storage}");
    if cfg.credential.is_empty() {
        println!("Run `tabgroup config set-key <KEY>` to enable classification.");
    }
    Ok(())
}

async fn set_key(session: &Session, key: String) -> Result<()> {
    let cleared = key.is_empty();
    let done = session.store().dispatch(Action::SetCredential(key));
    session.settle(done).await?;
    if cleared {
        println!("✓ Key cleared");
    } else {
        println!("✓ Key saved");
    }
    Ok(())
}

async fn auto(session: &Session, mode: AutoMode) -> Result<()> {
    let store = session.store();
    let done = match mode {
        AutoMode::On => store.dispatch(Action::SetAutoClassify(true)),
        AutoMode::Off => store.dispatch(Action::SetAutoClassify(false)),
        AutoMode::Toggle => store.toggle_auto_classify(),
    };
    let enabled = done.config.auto_classify;
    session.settle(done).await?;
    println!(
        "✓ Automatic grouping {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
