//! Shared fixtures and crate-level scenario tests.

mod scenarios;

use std::cell::RefCell;
use std::sync::{Arc, Once};

use serde_json::{json, Map, Value as JsonValue};

use crate::actions::{standard_actions, ActionRef};
use crate::config::Config;
use crate::filter_types::FilterTypeRegistry;
use crate::memory::StaticQuery;
use crate::schema::{JsonType, QueryColumn, QueryView};

fn row(fields: JsonValue) -> Map<String, JsonValue> {
    match fields {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

/// A small sample query used across tests.
pub fn fixture_query() -> StaticQuery {
    let columns = vec![
        QueryColumn::new("height", "Height", JsonType::Float),
        QueryColumn::new("name", "Name", JsonType::String),
        QueryColumn::new("category", "Category", JsonType::Int).with_lookup("lists", "categories", "label"),
        QueryColumn::new("molecules", "Molecule Count", JsonType::Int),
        QueryColumn::new("created", "Created", JsonType::Date),
    ];

    let mut default_view = QueryView::new("", None);
    default_view.is_default = true;
    let views = vec![
        default_view,
        QueryView::new("Details", Some("Detailed view")),
        QueryView::new("Summary Grid", None),
        QueryView::new("~~DEFAULT~~", None),
    ];

    let rows = vec![
        row(json!({
            "height": 10,
            "name": "apple",
            "category": { "value": 1, "displayValue": "Fruit" },
            "molecules": 5
        })),
        row(json!({
            "height": 12.5,
            "name": "apple pie",
            "category": { "value": 3, "displayValue": "Dessert" },
            "molecules": 12
        })),
        row(json!({
            "height": 3,
            "name": "Pineapple",
            "category": { "value": 1, "displayValue": "Fruit" }
        })),
        row(json!({
            "height": 7,
            "name": "banana",
            "category": null
        })),
    ];

    StaticQuery::new(columns).with_views(views).with_rows(rows)
}

pub fn fixture_actions(config: &Config) -> Vec<ActionRef> {
    let query = Arc::new(fixture_query());
    standard_actions(
        config,
        query.clone(),
        query,
        Arc::new(FilterTypeRegistry::standard()),
    )
}

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Records log output of the current thread.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT_LOGGER: Once = Once::new();

/// Starts capturing this thread's log records, dropping earlier ones.
pub fn capture_logs() {
    INIT_LOGGER.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Messages captured at warn level since [`capture_logs`].
pub fn captured_warnings() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == log::Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
