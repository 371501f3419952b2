pub mod columns;
pub mod filter;
pub mod params;
pub mod search;
pub mod sort;
mod values;
pub mod view;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::filter_types::FilterTypeRegistry;
use crate::schema::{DataProvider, QueryInfoProvider};

pub use filter::FilterAction;
pub use params::{build_query_string, parse_query_string};
pub use search::SearchAction;
pub use sort::SortAction;
pub use view::ViewAction;

pub type ActionRef = Arc<dyn Action>;

/// A pluggable parser/serializer for one kind of query fragment.
///
/// Parsing failures are data: `complete_action` returns a [`Value`] with
/// `is_valid == false` instead of an error.
#[async_trait]
pub trait Action: Send + Sync + fmt::Debug {
    /// Name of this action kind for logging/debugging
    fn name(&self) -> &'static str;

    /// Leading word selecting this action. Empty for the default action.
    fn keyword(&self) -> &str;

    fn icon_cls(&self) -> &str;

    fn optional_label(&self) -> Option<&str> {
        None
    }

    /// Turns a fully typed token sequence (keyword already stripped) into a
    /// committed value.
    async fn complete_action(&self, tokens: &[String]) -> Value;

    /// Candidates for the in-progress token, which is always the last one.
    async fn fetch_options(&self, tokens: &[String]) -> Vec<ActionOption>;

    fn build_params(&self, values: &[ActionValue]) -> Vec<ParamPair>;

    fn match_param(&self, key: &str, value: &str) -> bool;

    async fn parse_param(&self, key: &str, value: &str) -> Vec<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Filter,
    Sort,
    Search,
    View,
}

/// Builds the standard action set in menu order. The configured default
/// action loses its keyword and becomes the keyword-less fallback.
pub fn standard_actions(
    config: &Config,
    query_info: Arc<dyn QueryInfoProvider>,
    data: Arc<dyn DataProvider>,
    registry: Arc<FilterTypeRegistry>,
) -> Vec<ActionRef> {
    let prefix = config.param_prefix.clone();
    let keyword = |kind: ActionKind, keyword: &str| {
        if config.default_action == Some(kind) {
            String::new()
        } else {
            keyword.to_string()
        }
    };

    let filter: ActionRef = Arc::new(
        FilterAction::new(query_info.clone(), data, registry)
            .with_keyword(keyword(ActionKind::Filter, filter::KEYWORD))
            .with_param_prefix(prefix.clone())
            .with_max_value_suggestions(config.max_value_suggestions)
            .with_multi_value_display_limit(config.multi_value_display_limit),
    );
    let sort: ActionRef = Arc::new(
        SortAction::new(query_info.clone())
            .with_keyword(keyword(ActionKind::Sort, sort::KEYWORD))
            .with_param_prefix(prefix.clone()),
    );
    let search: ActionRef = Arc::new(
        SearchAction::new()
            .with_keyword(keyword(ActionKind::Search, search::KEYWORD))
            .with_param_prefix(prefix.clone()),
    );
    let view: ActionRef = Arc::new(
        ViewAction::new(query_info)
            .with_keyword(keyword(ActionKind::View, view::KEYWORD))
            .with_param_prefix(prefix),
    );

    vec![filter, sort, search, view]
}

/// Identity comparison for shared actions.
pub fn same_action(a: &ActionRef, b: &ActionRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// A completion candidate shown in the dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOption {
    pub label: String,
    pub next_label: Option<String>,
    /// Text spliced into the input. For complete options, the whole
    /// action-relative text to complete with.
    pub value: Option<String>,
    pub is_complete: bool,
    pub selectable: bool,
    pub append_value: bool,
}

impl ActionOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next_label: None,
            value: None,
            is_complete: false,
            selectable: true,
            append_value: true,
        }
    }

    pub fn next_label(mut self, next_label: impl Into<String>) -> Self {
        self.next_label = Some(next_label.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    pub fn replacing(mut self) -> Self {
        self.append_value = false;
        self
    }

    pub fn input_value(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.label)
    }
}

/// An option together with the action that produced it.
#[derive(Debug, Clone)]
pub struct MenuOption {
    pub action: ActionRef,
    pub option: ActionOption,
}

impl MenuOption {
    pub fn new(action: ActionRef, option: ActionOption) -> Self {
        Self { action, option }
    }

    /// Option that selects `action` by typing its keyword.
    pub fn keyword(action: &ActionRef) -> Self {
        let mut option = ActionOption::new(action.keyword())
            .value(action.keyword())
            .replacing();
        if let Some(label) = action.optional_label() {
            option = option.next_label(label);
        }
        Self::new(action.clone(), option)
    }
}

impl Deref for MenuOption {
    type Target = ActionOption;

    fn deref(&self) -> &Self::Target {
        &self.option
    }
}

/// Result of completing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Canonical text, re-tokenizable by the owning action.
    pub value: String,
    pub display_value: Option<String>,
    pub param: Option<String>,
    pub is_valid: bool,
    pub is_read_only: bool,
    pub is_removable: bool,
}

impl Value {
    pub fn new(value: impl Into<String>, display_value: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: Some(display_value.into()),
            param: Some(param.into()),
            is_valid: true,
            is_read_only: false,
            is_removable: true,
        }
    }

    /// Tokens were consumed but produced nothing usable.
    pub fn invalid(tokens: &[String]) -> Self {
        Self {
            value: tokens.join(" "),
            display_value: None,
            param: None,
            is_valid: false,
            is_read_only: false,
            is_removable: true,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.is_read_only = read_only;
        self
    }
}

/// A committed value (chip) and its owning action.
#[derive(Debug, Clone)]
pub struct ActionValue {
    pub action: ActionRef,
    pub value: Value,
}

impl ActionValue {
    pub fn new(action: ActionRef, value: Value) -> Self {
        Self { action, value }
    }

    pub fn display_value(&self) -> &str {
        self.value.display_value.as_deref().unwrap_or(&self.value.value)
    }

    pub fn param(&self) -> Option<&str> {
        self.value.param.as_deref()
    }

    /// Input text that re-opens this chip for editing.
    pub fn to_input(&self) -> String {
        join_keyword(self.action.keyword(), &self.value.value)
    }
}

impl PartialEq for ActionValue {
    fn eq(&self, other: &Self) -> bool {
        same_action(&self.action, &other.action) && self.value == other.value
    }
}

pub(crate) fn join_keyword(keyword: &str, text: &str) -> String {
    if keyword.is_empty() {
        text.to_string()
    } else {
        format!("{keyword} {text}")
    }
}

/// Committed values of one action, in insertion order.
#[derive(Debug, Clone)]
pub struct ActionValueCollection {
    pub action: ActionRef,
    pub values: Vec<ActionValue>,
}

impl ActionValueCollection {
    pub fn params(&self) -> Vec<ParamPair> {
        self.action.build_params(&self.values)
    }
}

/// Groups values by action; groups follow first occurrence.
pub fn group_values(values: &[ActionValue]) -> Vec<ActionValueCollection> {
    let mut collections: Vec<ActionValueCollection> = Vec::new();
    for value in values {
        match collections
            .iter_mut()
            .find(|c| same_action(&c.action, &value.action))
        {
            Some(collection) => collection.values.push(value.clone()),
            None => collections.push(ActionValueCollection {
                action: value.action.clone(),
                values: vec![value.clone()],
            }),
        }
    }
    collections
}

/// A URL parameter before percent-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamPair {
    pub key: String,
    pub value: String,
}

impl ParamPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `key=value` with both sides percent-encoded.
    pub fn encode(&self) -> String {
        format!(
            "{}={}",
            urlencoding::encode(&self.key),
            urlencoding::encode(&self.value)
        )
    }

    /// Inverse of [`ParamPair::encode`].
    pub fn decode(encoded: &str) -> Option<Self> {
        let (key, value) = encoded.split_once('=')?;
        let key = urlencoding::decode(key).ok()?;
        let value = urlencoding::decode(value).ok()?;
        Some(Self::new(key, value))
    }
}

pub(crate) fn prefixed_key(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}.{name}"),
        _ => name.to_string(),
    }
}

pub(crate) fn unprefixed_key<'a>(prefix: Option<&str>, key: &'a str) -> Option<&'a str> {
    match prefix {
        Some(prefix) if !prefix.is_empty() => key.strip_prefix(prefix)?.strip_prefix('.'),
        _ => Some(key),
    }
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}
