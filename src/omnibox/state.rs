use crate::actions::{
    group_values, join_keyword, starts_with_ignore_case, ActionRef, ActionValue, MenuOption,
};
use crate::config::OmniBoxConfig;
use crate::tokenizer::{splice_value, strip_keyword, tokenize, tokenize_in_progress};

use super::events::{CompletionOrigin, Effect, Event, Key, KeyPress, MouseButton, OptionSource};

/// Composition state of one omnibox. Only [`OmniBoxState::apply`] mutates it.
#[derive(Debug, Clone, Default)]
pub struct OmniBoxState {
    pub input_value: String,
    pub active_action: Option<ActionRef>,
    pub options: Vec<MenuOption>,
    pub focused_index: Option<usize>,
    /// Ghost text of the highlighted option, not yet committed.
    pub preview_input_value: Option<String>,
    pub is_open: bool,
    pub is_focused: bool,
    pub action_values: Vec<ActionValue>,

    options_generation: u64,
    blur_ticket: Option<u64>,
    next_ticket: u64,
}

/// The keyword-less action, if one is registered.
pub fn default_action(actions: &[ActionRef]) -> Option<&ActionRef> {
    actions.iter().find(|a| a.keyword().is_empty())
}

/// Active action and candidate set for `input`.
///
/// An action whose keyword equals the first word wins outright. Otherwise
/// every action whose keyword starts with that word stays a candidate, along
/// with the default action, which is active only when nothing else matches.
pub fn matching_actions(input: &str, actions: &[ActionRef]) -> (Option<ActionRef>, Vec<ActionRef>) {
    let word = input.split_whitespace().next().unwrap_or_default();

    if !word.is_empty() {
        let exact = actions
            .iter()
            .find(|a| !a.keyword().is_empty() && a.keyword().eq_ignore_ascii_case(word));
        if let Some(action) = exact {
            return (Some(action.clone()), vec![action.clone()]);
        }
    }

    let mut candidates: Vec<ActionRef> = actions
        .iter()
        .filter(|a| !a.keyword().is_empty() && starts_with_ignore_case(a.keyword(), word))
        .cloned()
        .collect();
    let default = default_action(actions).cloned();
    if let Some(default) = &default {
        candidates.push(default.clone());
    }

    let active = match (candidates.as_slice(), default) {
        ([_], Some(default)) => Some(default),
        _ => None,
    };
    (active, candidates)
}

impl OmniBoxState {
    pub fn new(values: Vec<ActionValue>) -> Self {
        Self {
            action_values: values,
            ..Default::default()
        }
    }

    pub fn options_generation(&self) -> u64 {
        self.options_generation
    }

    pub fn pending_blur(&self) -> Option<u64> {
        self.blur_ticket
    }

    /// The highlighted option, if any.
    pub fn focused_option(&self) -> Option<&MenuOption> {
        self.focused_index.and_then(|idx| self.options.get(idx))
    }

    /// Applies one event and returns the work it requires.
    pub fn apply(&mut self, event: Event, actions: &[ActionRef], config: &OmniBoxConfig) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            Event::Focus => {
                self.is_focused = true;
                effects.extend(self.cancel_blur());
                if config.open_after_focus {
                    self.is_open = true;
                    effects.push(self.refresh(actions));
                }
            }
            Event::MouseDown { button, on_chip } => {
                effects.extend(self.cancel_blur());
                if button == MouseButton::Primary && !on_chip {
                    self.is_focused = true;
                    self.is_open = true;
                    effects.push(self.refresh(actions));
                }
            }
            Event::Blur => {
                self.is_focused = false;
                effects.extend(self.cancel_blur());
                if self.input_value.trim().is_empty() {
                    self.close();
                } else {
                    let ticket = self.next_ticket;
                    self.next_ticket += 1;
                    self.blur_ticket = Some(ticket);
                    effects.push(Effect::ScheduleBlur {
                        ticket,
                        delay: config.blur_debounce(),
                    });
                }
            }
            Event::BlurTimerFired { ticket } => {
                if self.blur_ticket != Some(ticket) || self.is_focused {
                    log::debug!("ignoring stale blur timer {ticket}");
                    return effects;
                }
                self.blur_ticket = None;
                match self.complete_input(actions, CompletionOrigin::Blur) {
                    Some(effect) => effects.push(effect),
                    None => self.reset_closed(),
                }
            }
            Event::InputChange(text) => {
                let cleared = !self.input_value.is_empty() && text.is_empty();
                self.input_value = text;
                self.active_action = matching_actions(&self.input_value, actions).0;
                self.is_open = true;
                effects.extend(self.cancel_blur());
                if cleared {
                    effects.push(self.notify_change());
                }
                effects.push(self.refresh(actions));
            }
            Event::KeyDown(press) => effects.extend(self.key_down(press, actions, config)),
            Event::SelectOption(idx) => {
                // a click on the menu re-engages the control
                self.is_focused = true;
                effects.extend(self.cancel_blur());
                effects.extend(self.choose_option(idx, actions));
            }
            Event::RemoveValue(idx) => {
                let removable = self.action_values.get(idx).is_some_and(|v| v.value.is_removable);
                if removable {
                    self.action_values.remove(idx);
                    effects.push(self.notify_change());
                }
            }
            Event::SetValues(values) => {
                self.action_values = values;
                effects.extend(self.cancel_blur());
                self.reset_closed();
            }
            Event::OptionsLoaded { generation, options } => {
                if generation != self.options_generation {
                    log::debug!(
                        "dropping stale options (generation {generation}, current {})",
                        self.options_generation
                    );
                    return effects;
                }
                self.options = options;
                self.focused_index = None;
                self.preview_input_value = None;
            }
            Event::ActionCompleted { action, value, origin } => {
                if value.is_valid {
                    log::debug!("committed {} value '{}'", action.name(), value.value);
                    self.action_values.push(ActionValue::new(action, value));
                    effects.push(self.notify_change());
                    self.clear_composition();
                    if origin == CompletionOrigin::Blur || config.close_on_complete || !self.is_focused {
                        self.is_open = false;
                        self.options.clear();
                    } else {
                        effects.push(self.refresh(actions));
                    }
                } else if origin == CompletionOrigin::Blur {
                    self.reset_closed();
                } else {
                    log::debug!("{} could not complete '{}'", action.name(), value.value);
                }
            }
        }

        effects
    }

    fn key_down(&mut self, press: KeyPress, actions: &[ActionRef], config: &OmniBoxConfig) -> Vec<Effect> {
        match press.key {
            Key::Backspace => self.reactivate_last(actions, config),
            Key::Enter => self.commit(actions, true),
            Key::Tab if press.shift || !config.tab_selects_value => Vec::new(),
            Key::Tab => self.commit(actions, false),
            Key::Escape => {
                self.is_open = false;
                self.focused_index = None;
                self.preview_input_value = None;
                Vec::new()
            }
            Key::ArrowDown => {
                self.move_focus(true);
                Vec::new()
            }
            Key::ArrowUp => {
                self.move_focus(false);
                Vec::new()
            }
            Key::Other => Vec::new(),
        }
    }

    /// Moves the last chip back into the input for editing.
    fn reactivate_last(&mut self, actions: &[ActionRef], config: &OmniBoxConfig) -> Vec<Effect> {
        if !self.input_value.is_empty() || !config.backspace_removes {
            return Vec::new();
        }
        let Some(last) = self.action_values.last() else {
            return Vec::new();
        };
        if !last.value.is_removable {
            return Vec::new();
        }

        let Some(last) = self.action_values.pop() else {
            return Vec::new();
        };
        self.input_value = last.to_input();
        self.active_action = Some(last.action);
        self.is_open = true;

        vec![self.notify_change(), self.refresh(actions)]
    }

    /// Enter/Tab. A highlighted option always wins; free text completes
    /// only when `can_complete`.
    fn commit(&mut self, actions: &[ActionRef], can_complete: bool) -> Vec<Effect> {
        if let Some(idx) = self.focused_index {
            if self.options.get(idx).is_some_and(|o| o.selectable) {
                return self.choose_option(idx, actions);
            }
        }
        if !can_complete {
            return Vec::new();
        }
        self.complete_input(actions, CompletionOrigin::Input)
            .into_iter()
            .collect()
    }

    fn choose_option(&mut self, idx: usize, actions: &[ActionRef]) -> Vec<Effect> {
        let Some(option) = self.options.get(idx).cloned() else {
            return Vec::new();
        };
        if !option.selectable {
            return Vec::new();
        }

        if option.is_complete {
            return vec![Effect::Complete {
                tokens: tokenize(option.input_value()),
                action: option.action,
                origin: CompletionOrigin::Option,
            }];
        }

        self.input_value = self.spliced(&option);
        self.active_action = Some(option.action);
        self.is_open = true;
        vec![self.refresh(actions)]
    }

    /// Completion of the raw input by the active action, or by the default
    /// action when nothing is active.
    fn complete_input(&self, actions: &[ActionRef], origin: CompletionOrigin) -> Option<Effect> {
        let action = self
            .active_action
            .clone()
            .or_else(|| default_action(actions).cloned())?;
        let tokens = tokenize(strip_keyword(&self.input_value, action.keyword()));
        if tokens.is_empty() {
            return None;
        }
        Some(Effect::Complete { action, tokens, origin })
    }

    /// Input text after choosing `option`.
    fn spliced(&self, option: &MenuOption) -> String {
        if !option.append_value {
            return splice_value("", option.input_value(), false);
        }
        let keyword = option.action.keyword();
        let rest = strip_keyword(&self.input_value, keyword);
        join_keyword(keyword, &splice_value(rest, option.input_value(), true))
    }

    fn move_focus(&mut self, forward: bool) {
        let count = self.options.len();
        if count == 0 {
            return;
        }
        self.is_open = true;

        let next = match (self.focused_index, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(idx), true) => (idx + 1) % count,
            (Some(idx), false) => (idx + count - 1) % count,
        };
        self.focused_index = Some(next);

        let option = &self.options[next];
        self.preview_input_value = Some(if option.is_complete {
            join_keyword(option.action.keyword(), option.input_value())
        } else {
            self.spliced(option)
        });
    }

    /// Sources for the current input: the active action alone, or keyword
    /// options for candidates plus the default action's own options.
    fn option_sources(&self, actions: &[ActionRef]) -> Vec<OptionSource> {
        if let Some(active) = &self.active_action {
            let text = strip_keyword(&self.input_value, active.keyword());
            return vec![OptionSource::Action {
                action: active.clone(),
                tokens: tokenize_in_progress(text),
            }];
        }

        let (_, candidates) = matching_actions(&self.input_value, actions);
        candidates
            .into_iter()
            .map(|action| {
                if action.keyword().is_empty() {
                    OptionSource::Action {
                        tokens: tokenize_in_progress(&self.input_value),
                        action,
                    }
                } else {
                    OptionSource::Keyword(action)
                }
            })
            .collect()
    }

    fn refresh(&mut self, actions: &[ActionRef]) -> Effect {
        self.options_generation += 1;
        self.focused_index = None;
        self.preview_input_value = None;
        Effect::FetchOptions {
            generation: self.options_generation,
            sources: self.option_sources(actions),
        }
    }

    fn notify_change(&self) -> Effect {
        Effect::NotifyChange(group_values(&self.action_values))
    }

    fn cancel_blur(&mut self) -> Option<Effect> {
        self.blur_ticket.take().map(|ticket| Effect::CancelBlur { ticket })
    }

    fn clear_composition(&mut self) {
        self.input_value.clear();
        self.active_action = None;
        self.focused_index = None;
        self.preview_input_value = None;
    }

    fn close(&mut self) {
        self.is_open = false;
        self.focused_index = None;
        self.preview_input_value = None;
    }

    fn reset_closed(&mut self) {
        self.clear_composition();
        self.close();
        self.options.clear();
        // late option responses must not reopen anything
        self.options_generation += 1;
    }
}
