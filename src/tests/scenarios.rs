use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::actions::{build_query_string, parse_query_string, ActionKind, ActionValueCollection};
use crate::config::Config;
use crate::omnibox::{Event, Key, KeyPress, OmniBox};

use super::fixture_actions;

type Changes = Arc<Mutex<Vec<Vec<ActionValueCollection>>>>;

fn omnibox(config: &Config) -> (OmniBox, Changes) {
    let changes: Changes = Arc::default();
    let recorded = changes.clone();
    let omnibox = OmniBox::new(fixture_actions(config), config.omnibox.clone()).on_change(
        move |collections, _actions| {
            recorded.lock().unwrap().push(collections.to_vec());
        },
    );
    (omnibox, changes)
}

fn change_count(changes: &Changes) -> usize {
    changes.lock().unwrap().len()
}

#[tokio::test]
async fn test_typed_filter_commits_one_chip() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;

    omnibox.type_text("filter height =< 10").await;
    omnibox.press(Key::Enter).await;

    let values = omnibox.values();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].display_value(), "Height =< 10");
    assert_eq!(values[0].param(), Some("height~lte=10"));

    assert_eq!(change_count(&changes), 1);
    let last = changes.lock().unwrap()[0].clone();
    assert_eq!(build_query_string(&last), "height~lte=10");

    // composition resets and the menu stays open on the default list
    let state = omnibox.state();
    assert_eq!(state.input_value, "");
    assert!(state.active_action.is_none());
    assert!(state.is_open);
    assert!(!state.options.is_empty());
}

#[tokio::test]
async fn test_typed_sort_commits() {
    let (mut omnibox, _changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("sort name desc").await;
    omnibox.press(Key::Enter).await;

    let values = omnibox.values();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value.value, "name desc");
    assert_eq!(values[0].param(), Some("-name"));
}

#[tokio::test]
async fn test_empty_enter_commits_nothing() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.press(Key::Enter).await;

    assert!(omnibox.values().is_empty());
    assert_eq!(change_count(&changes), 0);
}

#[tokio::test]
async fn test_invalid_input_stays_editable() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("filter height =<").await;
    omnibox.press(Key::Enter).await;

    assert!(omnibox.values().is_empty());
    assert_eq!(change_count(&changes), 0);
    assert_eq!(omnibox.state().input_value, "filter height =<");
}

#[tokio::test]
async fn test_options_drive_composition() {
    let (mut omnibox, _changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;

    // keyword options for every action
    let labels: Vec<String> = omnibox.state().options.iter().map(|o| o.label.clone()).collect();
    assert_eq!(labels, vec!["filter", "sort", "search", "view"]);

    omnibox.type_text("fil").await;
    omnibox.press(Key::ArrowDown).await;
    assert_eq!(omnibox.state().preview_input_value.as_deref(), Some("filter "));
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.state().input_value, "filter ");

    // column, then operator, then value
    omnibox.type_text("hei").await;
    omnibox.press(Key::ArrowDown).await;
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.state().input_value, "filter height ");

    let operators: Vec<String> = omnibox.state().options.iter().map(|o| o.label.clone()).collect();
    assert!(operators.contains(&"=<".to_string()));
    omnibox.type_text("=<").await;
    omnibox.press(Key::ArrowDown).await;
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.state().input_value, "filter height =< ");

    let values: Vec<String> = omnibox.state().options.iter().map(|o| o.label.clone()).collect();
    assert_eq!(values, vec!["3", "7", "10", "12.5"]);
    omnibox.press(Key::ArrowDown).await;
    omnibox.press(Key::ArrowDown).await;
    omnibox.press(Key::ArrowDown).await;
    omnibox.press(Key::Enter).await;

    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(omnibox.values()[0].display_value(), "Height =< 10");
}

#[tokio::test]
async fn test_tab_only_accepts_highlighted_option() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;

    omnibox.press(Key::Tab).await;
    assert!(omnibox.values().is_empty());

    omnibox.press(Key::ArrowDown).await;
    omnibox.press(KeyPress::shifted(Key::Tab)).await;
    assert!(omnibox.values().is_empty());

    omnibox.press(Key::Tab).await;
    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(omnibox.values()[0].param(), Some("apple"));
    assert_eq!(change_count(&changes), 1);
}

#[tokio::test]
async fn test_backspace_reactivates_last_chip() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("sort name desc").await;
    omnibox.press(Key::Enter).await;
    omnibox.type_text("search apple").await;
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.values().len(), 2);

    omnibox.press(Key::Backspace).await;
    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(omnibox.state().input_value, "search apple");
    assert_eq!(omnibox.state().active_action.as_ref().map(|a| a.name()), Some("search"));
    assert_eq!(change_count(&changes), 3);

    // editing and committing again replaces the chip
    omnibox.type_text(" pie").await;
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.values().len(), 2);
    assert_eq!(omnibox.values()[1].param(), Some("apple pie"));
}

#[tokio::test]
async fn test_backspace_disabled() {
    let mut config = Config::default();
    config.omnibox.backspace_removes = false;
    let (mut omnibox, _changes) = omnibox(&config);
    omnibox.send(Event::Focus).await;
    omnibox.type_text("sort name").await;
    omnibox.press(Key::Enter).await;

    omnibox.press(Key::Backspace).await;
    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(omnibox.state().input_value, "");
}

#[tokio::test]
async fn test_clearing_input_notifies() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("sort").await;
    omnibox.send(Event::InputChange(String::new())).await;
    assert_eq!(change_count(&changes), 1);
    assert!(changes.lock().unwrap()[0].is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_blur_completes_pending_input_after_debounce() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;

    omnibox.send(Event::Blur).await;
    assert!(omnibox.values().is_empty());
    assert!(omnibox.state().pending_blur().is_some());

    tokio::time::advance(Duration::from_millis(200)).await;
    assert!(omnibox.next_event().await);
    omnibox.settle().await;

    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(change_count(&changes), 1);
    assert!(!omnibox.state().is_open);
    assert_eq!(omnibox.state().input_value, "");
}

#[tokio::test(start_paused = true)]
async fn test_refocus_cancels_blur() {
    let (mut omnibox, _changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;

    omnibox.send(Event::Blur).await;
    tokio::time::advance(Duration::from_millis(100)).await;
    omnibox.send(Event::Focus).await;
    assert!(omnibox.state().pending_blur().is_none());

    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(!omnibox.next_event().await);
    assert!(omnibox.values().is_empty());
    assert_eq!(omnibox.state().input_value, "search apple");
}

#[tokio::test(start_paused = true)]
async fn test_blur_with_unusable_input_resets() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("view nope").await;

    omnibox.send(Event::Blur).await;
    tokio::time::advance(Duration::from_millis(200)).await;
    assert!(omnibox.next_event().await);
    omnibox.settle().await;

    assert!(omnibox.values().is_empty());
    assert_eq!(change_count(&changes), 0);
    assert_eq!(omnibox.state().input_value, "");
    assert!(!omnibox.state().is_open);
}

#[tokio::test(start_paused = true)]
async fn test_option_click_after_blur_keeps_composing() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;

    omnibox.send(Event::Blur).await;
    omnibox.send(Event::SelectOption(0)).await;
    assert!(omnibox.state().pending_blur().is_none());
    assert!(omnibox.state().is_focused);

    assert_eq!(omnibox.values().len(), 1);
    assert_eq!(change_count(&changes), 1);
    assert!(omnibox.state().is_open);
    assert!(!omnibox.state().options.is_empty());

    // a non-complete option splices and stays open for further typing
    omnibox.type_text("fil").await;
    omnibox.send(Event::Blur).await;
    omnibox.send(Event::SelectOption(0)).await;
    assert_eq!(omnibox.state().input_value, "filter ");
    assert!(omnibox.state().is_focused);
    assert!(omnibox.state().is_open);

    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(!omnibox.next_event().await);
    assert_eq!(omnibox.state().input_value, "filter ");
}

#[tokio::test]
async fn test_blur_without_input_closes_immediately() {
    let (mut omnibox, _changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    assert!(omnibox.state().is_open);

    omnibox.send(Event::Blur).await;
    assert!(!omnibox.state().is_open);
    assert!(omnibox.state().pending_blur().is_none());
}

#[tokio::test]
async fn test_default_action_takes_bare_input() {
    let mut config = Config::default();
    config.default_action = Some(ActionKind::Search);
    let (mut omnibox, _changes) = omnibox(&config);
    omnibox.send(Event::Focus).await;

    omnibox.type_text("green apple").await;
    assert_eq!(omnibox.state().active_action.as_ref().map(|a| a.name()), Some("search"));
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.values()[0].param(), Some("green apple"));

    // keywords still select their action
    omnibox.type_text("sort height").await;
    omnibox.press(Key::Enter).await;
    assert_eq!(omnibox.values()[1].param(), Some("height"));
}

#[tokio::test]
async fn test_close_on_complete() {
    let mut config = Config::default();
    config.omnibox.close_on_complete = true;
    let (mut omnibox, _changes) = omnibox(&config);
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;
    omnibox.press(Key::Enter).await;

    assert_eq!(omnibox.values().len(), 1);
    assert!(!omnibox.state().is_open);
}

#[tokio::test]
async fn test_restore_from_query_string() {
    let config = Config::default();
    let actions = fixture_actions(&config);
    let restored = parse_query_string("?height~lte=10&sort=-name", &actions).await;

    let changes: Changes = Arc::default();
    let recorded = changes.clone();
    let mut omnibox = OmniBox::new(actions, config.omnibox.clone())
        .with_values(restored)
        .on_change(move |collections, _| recorded.lock().unwrap().push(collections.to_vec()));

    assert_eq!(omnibox.values().len(), 2);
    assert_eq!(omnibox.values()[0].display_value(), "Height =< 10");
    assert_eq!(omnibox.values()[1].display_value(), "Name DESC");

    omnibox.send(Event::RemoveValue(0)).await;
    assert_eq!(omnibox.values().len(), 1);
    let last = changes.lock().unwrap().last().cloned().unwrap_or_default();
    assert_eq!(build_query_string(&last), "sort=-name");
}

#[tokio::test]
async fn test_set_values_replaces_chips_silently() {
    let (mut omnibox, changes) = omnibox(&Config::default());
    omnibox.send(Event::Focus).await;
    omnibox.type_text("search apple").await;
    omnibox.press(Key::Enter).await;
    assert_eq!(change_count(&changes), 1);

    omnibox.send(Event::SetValues(Vec::new())).await;
    assert!(omnibox.values().is_empty());
    assert!(!omnibox.state().is_open);
    assert_eq!(change_count(&changes), 1);
}
