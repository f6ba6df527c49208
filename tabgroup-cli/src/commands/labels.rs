//! `tabgroup labels list|add|rename|remove|set|reset`
//!
//! Positions are 1-based, matching the numbering printed by `list`.

use anyhow::{bail, Result};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use tabgroup_core::{default_group_labels, Action};

use crate::session::Session;

/// Show or edit the group labels.
#[derive(Subcommand, Debug)]
pub enum LabelsCommand {
    /// Print the labels in order.
    List,

    /// Append a label.
    Add {
        label: String,
    },

    /// Replace the label at position N.
    Rename {
        position: usize,
        label: String,
    },

    /// Delete the label at position N.
    Remove {
        position: usize,
    },

    /// Replace the whole list. With no labels, the list becomes empty.
    Set {
        labels: Vec<String>,
    },

    /// Restore the built-in label list.
    Reset,
}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "label")]
    label: String,
}

pub async fn run(session: &Session, command: LabelsCommand) -> Result<()> {
    let store = session.store();
    match command {
        LabelsCommand::List => {
            list(&store.snapshot().group_labels);
            Ok(())
        }
        LabelsCommand::Add { label } => match store.add_label(label.clone()) {
            Some(done) => {
                session.settle(done).await?;
                println!("✓ Added '{label}'");
                Ok(())
            }
            None => {
                println!("Nothing to add: label is empty.");
                Ok(())
            }
        },
        LabelsCommand::Rename { position, label } => {
            let done = store.rename_label(index(position)?, label.clone())?;
            session.settle(done).await?;
            println!("✓ Label #{position} is now '{label}'");
            Ok(())
        }
        LabelsCommand::Remove { position } => {
            let removed = store
                .snapshot()
                .group_labels
                .get(index(position)?)
                .cloned();
            let done = store.remove_label(index(position)?)?;
            session.settle(done).await?;
            println!("✓ Removed '{}'", removed.unwrap_or_default());
            Ok(())
        }
        LabelsCommand::Set { labels } => {
            let count = labels.len();
            let done = store.dispatch(Action::SetGroupLabels(labels));
            session.settle(done).await?;
            println!("✓ Saved {count} labels");
            Ok(())
        }
        LabelsCommand::Reset => {
            let done = store.dispatch(Action::SetGroupLabels(default_group_labels()));
            session.settle(done).await?;
            println!("✓ Restored default labels");
            Ok(())
        }
    }
}

fn list(labels: &[String]) {
    if labels.is_empty() {
        println!("No labels. Add one with `tabgroup labels add <LABEL>`.");
        return;
    }
    let rows: Vec<LabelRow> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| LabelRow {
            position: i + 1,
            label: label.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn index(position: usize) -> Result<usize> {
    if position == 0 {
        bail!("positions start at 1");
    }
    Ok(position - 1)
}
