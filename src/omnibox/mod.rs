//! The omnibox controller.
//!
//! [`OmniBoxState`] is a pure transition function from events to effects.
//! [`OmniBox`] runs those effects on tokio: option fetches and completions
//! are spawned and report back as events, and the blur debounce is a
//! cancellable timer task.

mod events;
mod state;


use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actions::{ActionRef, ActionValue, ActionValueCollection};
use crate::config::OmniBoxConfig;

pub use events::{CompletionOrigin, Effect, Event, Key, KeyPress, MouseButton, OptionSource};
pub use state::{default_action, matching_actions, OmniBoxState};

type ChangeCallback = Box<dyn FnMut(&[ActionValueCollection], &[ActionRef]) + Send>;

struct BlurTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

/// Drives an [`OmniBoxState`] against a set of actions.
///
/// Must be used from within a tokio runtime.
pub struct OmniBox {
    actions: Vec<ActionRef>,
    config: OmniBoxConfig,
    state: OmniBoxState,
    on_change: Option<ChangeCallback>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    /// spawned fetches and completions that have not reported back
    in_flight: usize,
    blur_timer: Option<BlurTimer>,
}

impl OmniBox {
    pub fn new(actions: Vec<ActionRef>, config: OmniBoxConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            actions,
            config,
            state: OmniBoxState::default(),
            on_change: None,
            tx,
            rx,
            in_flight: 0,
            blur_timer: None,
        }
    }

    /// Pre-seeds committed chips, e.g. restored from a URL.
    pub fn with_values(mut self, values: Vec<ActionValue>) -> Self {
        self.state = OmniBoxState::new(values);
        self
    }

    /// Called with the regrouped chips whenever a chip is committed or removed.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[ActionValueCollection], &[ActionRef]) + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &OmniBoxState {
        &self.state
    }

    pub fn values(&self) -> &[ActionValue] {
        &self.state.action_values
    }

    /// Applies an event and starts the work it requires without waiting.
    pub fn dispatch(&mut self, event: Event) {
        match &event {
            Event::OptionsLoaded { .. } | Event::ActionCompleted { .. } => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            Event::BlurTimerFired { ticket } => {
                if self.blur_timer.as_ref().is_some_and(|t| t.ticket == *ticket) {
                    self.blur_timer = None;
                }
            }
            _ => {}
        }

        let effects = self.state.apply(event, &self.actions, &self.config);
        for effect in effects {
            self.run(effect);
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::FetchOptions { generation, sources } => {
                self.in_flight += 1;
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let mut options = Vec::new();
                    for source in sources {
                        options.extend(source.load().await);
                    }
                    if tx.send(Event::OptionsLoaded { generation, options }).is_err() {
                        log::debug!("omnibox dropped before options {generation} arrived");
                    }
                });
            }
            Effect::Complete { action, tokens, origin } => {
                self.in_flight += 1;
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let value = action.complete_action(&tokens).await;
                    if tx.send(Event::ActionCompleted { action, value, origin }).is_err() {
                        log::debug!("omnibox dropped before completion arrived");
                    }
                });
            }
            Effect::ScheduleBlur { ticket, delay } => {
                self.abort_blur_timer();
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::BlurTimerFired { ticket });
                });
                self.blur_timer = Some(BlurTimer { ticket, handle });
            }
            Effect::CancelBlur { ticket } => {
                if self.blur_timer.as_ref().is_some_and(|t| t.ticket == ticket) {
                    self.abort_blur_timer();
                }
            }
            Effect::NotifyChange(collections) => {
                if let Some(callback) = self.on_change.as_mut() {
                    callback(&collections, &self.actions);
                }
            }
        }
    }

    fn abort_blur_timer(&mut self) {
        if let Some(timer) = self.blur_timer.take() {
            timer.handle.abort();
        }
    }

    /// Waits for the next background result and applies it. Returns `false`
    /// when nothing is pending.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 && self.blur_timer.is_none() {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Applies background results until no fetch or completion is pending.
    /// A scheduled blur timer is left running.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }
    }

    /// Types `text` one character at a time, as a user would.
    pub async fn type_text(&mut self, text: &str) {
        let mut typed = self.state.input_value.clone();
        for c in text.chars() {
            typed.push(c);
            self.dispatch(Event::InputChange(typed.clone()));
        }
        self.settle().await;
    }

    pub async fn press(&mut self, key: impl Into<KeyPress>) {
        self.dispatch(Event::KeyDown(key.into()));
        self.settle().await;
    }

    /// Sends an event and waits for its consequences.
    pub async fn send(&mut self, event: Event) {
        self.dispatch(event);
        self.settle().await;
    }
}

impl Drop for OmniBox {
    fn drop(&mut self) {
        self.abort_blur_timer();
    }
}
