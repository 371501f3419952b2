use std::time::Duration;

use crate::actions::{ActionOption, ActionRef, ActionValue, ActionValueCollection, MenuOption, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Backspace,
    ArrowUp,
    ArrowDown,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

impl From<Key> for KeyPress {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
}

/// What started a completion. Blur completions always close the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOrigin {
    Input,
    Option,
    Blur,
}

/// Everything that can happen to the controller.
#[derive(Debug, Clone)]
pub enum Event {
    Focus,
    Blur,
    MouseDown { button: MouseButton, on_chip: bool },
    InputChange(String),
    KeyDown(KeyPress),
    /// Option clicked in the menu.
    SelectOption(usize),
    /// Chip removed by index.
    RemoveValue(usize),
    /// Host replaced the committed chips.
    SetValues(Vec<ActionValue>),
    OptionsLoaded { generation: u64, options: Vec<MenuOption> },
    ActionCompleted {
        action: ActionRef,
        value: Value,
        origin: CompletionOrigin,
    },
    BlurTimerFired { ticket: u64 },
}

/// Where a batch of menu options comes from.
#[derive(Debug, Clone)]
pub enum OptionSource {
    /// The action's keyword, offered for selection.
    Keyword(ActionRef),
    /// Options of an action for the given tokens.
    Action { action: ActionRef, tokens: Vec<String> },
}

/// Work requested by a transition, carried out by the driver.
#[derive(Debug, Clone)]
pub enum Effect {
    FetchOptions { generation: u64, sources: Vec<OptionSource> },
    Complete {
        action: ActionRef,
        tokens: Vec<String>,
        origin: CompletionOrigin,
    },
    ScheduleBlur { ticket: u64, delay: Duration },
    CancelBlur { ticket: u64 },
    NotifyChange(Vec<ActionValueCollection>),
}

impl OptionSource {
    /// Resolves the source into menu options.
    pub async fn load(self) -> Vec<MenuOption> {
        match self {
            OptionSource::Keyword(action) => vec![MenuOption::keyword(&action)],
            OptionSource::Action { action, tokens } => action
                .fetch_options(&tokens)
                .await
                .into_iter()
                .map(|option: ActionOption| MenuOption::new(action.clone(), option))
                .collect(),
        }
    }
}
