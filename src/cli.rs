use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use omnibox::actions::{ActionValue, MenuOption};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding config.yaml. Defaults to $OMNIBOX_BASE_PATH or
    /// ~/.local/share/omnibox
    #[clap(long)]
    pub base_path: Option<PathBuf>,

    /// Query description (columns, views, rows). Defaults to
    /// <base-path>/schema.yaml
    #[clap(short, long)]
    pub schema: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the menu options for typed input
    Suggest {
        #[clap(allow_hyphen_values = true)]
        input: String,
    },

    /// Type and commit each input, then print the chips and query string
    Complete {
        #[clap(allow_hyphen_values = true, required = true)]
        inputs: Vec<String>,
    },

    /// Restore chips from a URL query string
    Decode { query: String },

    /// Line-driven session. Every line is typed and committed.
    /// Commands: :chips, :undo, :clear, :quit
    Repl {},
}

/// A committed value as printed by the binary.
#[derive(Serialize, Debug)]
pub struct ChipView {
    pub action: String,
    pub value: String,
    pub display_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl From<&ActionValue> for ChipView {
    fn from(chip: &ActionValue) -> Self {
        Self {
            action: chip.action.name().to_string(),
            value: chip.value.value.clone(),
            display_value: chip.display_value().to_string(),
            param: chip.param().map(str::to_string),
            read_only: chip.value.is_read_only,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct OptionView {
    pub action: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub complete: bool,
    pub selectable: bool,
}

impl From<&MenuOption> for OptionView {
    fn from(option: &MenuOption) -> Self {
        Self {
            action: option.action.name().to_string(),
            label: option.label.clone(),
            next_label: option.next_label.clone(),
            value: option.value.clone(),
            complete: option.is_complete,
            selectable: option.selectable,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChipsView {
    pub chips: Vec<ChipView>,
    pub query: String,
}
