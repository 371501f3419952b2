use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::filter_types::{FilterType, FilterTypeRegistry};
use crate::schema::{DataProvider, FieldKey, JsonType, QueryColumn, QueryInfoProvider};
use crate::tokenizer::quote_words;

use super::columns::{column_options, load_columns, parse_column, ColumnMatch};
use super::values::resolve_values;
use super::{prefixed_key, unprefixed_key, Action, ActionOption, ActionValue, ParamPair, Value};

pub const KEYWORD: &str = "filter";

const DEFAULT_MAX_VALUE_SUGGESTIONS: usize = 15;
const DEFAULT_MULTI_VALUE_DISPLAY_LIMIT: usize = 3;
const MULTI_VALUE_SEPARATOR: char = ';';

static FILTER_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<field>[^~]+)~(?P<suffix>[^~]+)$").unwrap());

/// `[column] [operator] [value...]`
pub struct FilterAction {
    query_info: Arc<dyn QueryInfoProvider>,
    data: Arc<dyn DataProvider>,
    registry: Arc<FilterTypeRegistry>,
    keyword: String,
    param_prefix: Option<String>,
    max_value_suggestions: usize,
    multi_value_display_limit: usize,
}

impl fmt::Debug for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterAction")
            .field("keyword", &self.keyword)
            .field("param_prefix", &self.param_prefix)
            .finish_non_exhaustive()
    }
}

impl FilterAction {
    pub fn new(
        query_info: Arc<dyn QueryInfoProvider>,
        data: Arc<dyn DataProvider>,
        registry: Arc<FilterTypeRegistry>,
    ) -> Self {
        Self {
            query_info,
            data,
            registry,
            keyword: KEYWORD.to_string(),
            param_prefix: None,
            max_value_suggestions: DEFAULT_MAX_VALUE_SUGGESTIONS,
            multi_value_display_limit: DEFAULT_MULTI_VALUE_DISPLAY_LIMIT,
        }
    }

    pub fn with_keyword(mut self, keyword: String) -> Self {
        self.keyword = keyword;
        self
    }

    pub fn with_param_prefix(mut self, prefix: Option<String>) -> Self {
        self.param_prefix = prefix;
        self
    }

    pub fn with_max_value_suggestions(mut self, max: usize) -> Self {
        self.max_value_suggestions = max;
        self
    }

    pub fn with_multi_value_display_limit(mut self, limit: usize) -> Self {
        self.multi_value_display_limit = limit;
        self
    }

    /// Text that re-tokenizes to the same column, operator and value.
    fn canonical_text(&self, column: &ColumnMatch, filter_type: &FilterType, raw_value: &str) -> String {
        let operator = self.registry.operator_token(filter_type, column.json_type());
        if filter_type.data_value_required {
            format!("{} {} {}", column.token(), operator, quote_words(raw_value))
        } else {
            format!("{} {}", column.token(), operator)
        }
    }

    /// Returns the rendered value list and whether it was summarized. Only
    /// multi-valued operators split their value.
    fn display_values(&self, filter_type: &FilterType, raw_value: &str) -> (String, bool) {
        if !filter_type.multi_valued || !raw_value.contains(MULTI_VALUE_SEPARATOR) {
            return (raw_value.to_string(), false);
        }

        let values: Vec<&str> = raw_value
            .split(MULTI_VALUE_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if values.len() > self.multi_value_display_limit {
            (format!("({} values)", values.len()), true)
        } else {
            (values.join(", "), false)
        }
    }

    fn build_value(&self, column: &ColumnMatch, filter_type: &FilterType, raw_value: &str) -> Value {
        let raw_value = if filter_type.data_value_required {
            raw_value.trim()
        } else {
            ""
        };

        let key = format!("{}~{}", column.field_key(), filter_type.url_suffix);
        let param = ParamPair::new(prefixed_key(self.param_prefix.as_deref(), &key), raw_value);

        let (display, summarized) = if filter_type.data_value_required {
            let (values, summarized) = self.display_values(filter_type, raw_value);
            (
                format!("{} {} {}", column.caption(), filter_type.label(), values),
                summarized,
            )
        } else {
            (format!("{} {}", column.caption(), filter_type.label()), false)
        };

        Value::new(
            self.canonical_text(column, filter_type, raw_value),
            display,
            param.encode(),
        )
        .read_only(summarized)
    }

    fn operator_options(&self, json_type: JsonType, partial: &str) -> Vec<ActionOption> {
        self.registry
            .symbols_for(json_type)
            .into_iter()
            .filter_map(|t| {
                let symbol = t.display_symbol.as_deref()?;
                symbol
                    .starts_with(partial)
                    .then(|| ActionOption::new(symbol).next_label(&t.display_value).value(symbol))
            })
            .collect()
    }

    async fn value_options(&self, column: &ColumnMatch, filter_type: &FilterType, typed: &str) -> Vec<ActionOption> {
        if !filter_type.data_value_required {
            let text = self.canonical_text(column, filter_type, "");
            return vec![ActionOption::new(filter_type.display_value.clone()).value(text).complete()];
        }

        let suggestions = resolve_values(
            self.data.as_ref(),
            &column.field_key(),
            typed,
            self.max_value_suggestions,
        )
        .await;

        if !suggestions.is_empty() {
            return suggestions
                .into_iter()
                .map(|s| {
                    let text = self.canonical_text(column, filter_type, &s.value);
                    ActionOption::new(s.label).value(text).complete()
                })
                .collect();
        }

        if typed.is_empty() {
            vec![ActionOption::new("Enter a value").selectable(false)]
        } else {
            let text = self.canonical_text(column, filter_type, typed);
            vec![ActionOption::new(typed).value(text).complete()]
        }
    }

    /// Column for a decoded field key. Unknown columns are kept as-is so a
    /// restored filter never silently disappears.
    fn column_for_key(columns: &[QueryColumn], field_key: &FieldKey) -> ColumnMatch {
        let root = field_key.root();
        let mut column = columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(root))
            .cloned()
            .unwrap_or_else(|| QueryColumn::new(root, root, JsonType::String));

        let path = field_key.parts().get(1..).unwrap_or_default().to_vec();
        match path.first() {
            Some(first) if column.lookup.is_none() => column = column.with_lookup("", "", first),
            _ => {}
        }
        ColumnMatch { column, path }
    }
}

#[async_trait]
impl Action for FilterAction {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn icon_cls(&self) -> &str {
        "filter"
    }

    async fn complete_action(&self, tokens: &[String]) -> Value {
        let columns = load_columns(self.query_info.as_ref()).await;

        let Some(column) = tokens.first().and_then(|t| parse_column(&columns, t)) else {
            return Value::invalid(tokens);
        };
        let Some(filter_type) = tokens
            .get(1)
            .and_then(|t| self.registry.resolve_filter_type(t, column.json_type()))
        else {
            return Value::invalid(tokens);
        };

        let raw_value = tokens.get(2..).unwrap_or_default().join(" ");
        if filter_type.data_value_required && raw_value.trim().is_empty() {
            return Value::invalid(tokens);
        }

        self.build_value(&column, filter_type, &raw_value)
    }

    async fn fetch_options(&self, tokens: &[String]) -> Vec<ActionOption> {
        let columns = load_columns(self.query_info.as_ref()).await;

        if tokens.len() <= 1 {
            let partial = tokens.first().map(String::as_str).unwrap_or_default();
            return column_options(&columns, partial);
        }

        let Some(column) = parse_column(&columns, &tokens[0]) else {
            return Vec::new();
        };
        let json_type = column.json_type();

        if tokens.len() == 2 {
            return self.operator_options(json_type, &tokens[1]);
        }

        let Some(filter_type) = self.registry.resolve_filter_type(&tokens[1], json_type) else {
            return Vec::new();
        };

        let typed = tokens[2..].join(" ");
        self.value_options(&column, filter_type, typed.trim()).await
    }

    fn build_params(&self, values: &[ActionValue]) -> Vec<ParamPair> {
        values
            .iter()
            .filter_map(|v| v.param().and_then(ParamPair::decode))
            .collect()
    }

    fn match_param(&self, key: &str, _value: &str) -> bool {
        let Some(key) = unprefixed_key(self.param_prefix.as_deref(), key) else {
            return false;
        };
        FILTER_PARAM_RE
            .captures(key)
            .and_then(|caps| caps.name("suffix"))
            .is_some_and(|suffix| self.registry.by_suffix(suffix.as_str()).is_some())
    }

    async fn parse_param(&self, key: &str, value: &str) -> Vec<Value> {
        let Some(caps) = unprefixed_key(self.param_prefix.as_deref(), key).and_then(|k| FILTER_PARAM_RE.captures(k))
        else {
            return Vec::new();
        };
        let Some(filter_type) = self.registry.by_suffix(&caps["suffix"]) else {
            log::debug!("unknown filter suffix in param '{key}'");
            return Vec::new();
        };

        let columns = load_columns(self.query_info.as_ref()).await;
        let column = Self::column_for_key(&columns, &FieldKey::parse(&caps["field"]));
        vec![self.build_value(&column, filter_type, value)]
    }
}
