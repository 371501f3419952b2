use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::schema::{JsonType, QueryColumn, QueryInfoProvider};
use crate::tokenizer::quote_token;

use super::columns::{column_options, load_columns, parse_column};
use super::{prefixed_key, starts_with_ignore_case, unprefixed_key, Action, ActionOption, ActionValue, ParamPair, Value};

pub const KEYWORD: &str = "sort";
const PARAM: &str = "sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// `[column] [ASC|DESC]`. Always sorts on the column itself, never through
/// a lookup.
pub struct SortAction {
    query_info: Arc<dyn QueryInfoProvider>,
    keyword: String,
    param_prefix: Option<String>,
}

impl fmt::Debug for SortAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortAction")
            .field("keyword", &self.keyword)
            .field("param_prefix", &self.param_prefix)
            .finish_non_exhaustive()
    }
}

impl SortAction {
    pub fn new(query_info: Arc<dyn QueryInfoProvider>) -> Self {
        Self {
            query_info,
            keyword: KEYWORD.to_string(),
            param_prefix: None,
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

    fn canonical_text(column: &QueryColumn, direction: SortDirection) -> String {
        format!("{} {}", quote_token(&column.name), direction.token())
    }

    fn build_value(column: &QueryColumn, direction: SortDirection) -> Value {
        let param = match direction {
            SortDirection::Asc => column.name.clone(),
            SortDirection::Desc => format!("-{}", column.name),
        };
        Value::new(
            Self::canonical_text(column, direction),
            format!("{} {}", column.caption(), direction.label()),
            param,
        )
    }
}

#[async_trait]
impl Action for SortAction {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn icon_cls(&self) -> &str {
        "sort"
    }

    async fn complete_action(&self, tokens: &[String]) -> Value {
        let columns = load_columns(self.query_info.as_ref()).await;

        let Some(bound) = tokens.first().and_then(|t| parse_column(&columns, t)) else {
            return Value::invalid(tokens);
        };
        let direction = match tokens.get(1..).unwrap_or_default() {
            [] => SortDirection::Asc,
            [direction] => match SortDirection::parse(direction) {
                Some(direction) => direction,
                None => return Value::invalid(tokens),
            },
            _ => return Value::invalid(tokens),
        };

        Self::build_value(&bound.column, direction)
    }

    async fn fetch_options(&self, tokens: &[String]) -> Vec<ActionOption> {
        let columns = load_columns(self.query_info.as_ref()).await;

        if tokens.len() <= 1 {
            let partial = tokens.first().map(String::as_str).unwrap_or_default();
            return column_options(&columns, partial);
        }
        if tokens.len() > 2 {
            return Vec::new();
        }

        let Some(bound) = parse_column(&columns, &tokens[0]) else {
            return Vec::new();
        };
        [SortDirection::Asc, SortDirection::Desc]
            .into_iter()
            .filter(|d| starts_with_ignore_case(d.token(), &tokens[1]))
            .map(|d| {
                ActionOption::new(d.label())
                    .next_label(bound.column.caption())
                    .value(Self::canonical_text(&bound.column, d))
                    .complete()
            })
            .collect()
    }

    fn build_params(&self, values: &[ActionValue]) -> Vec<ParamPair> {
        let fragments: Vec<&str> = values.iter().filter_map(ActionValue::param).collect();
        if fragments.is_empty() {
            return Vec::new();
        }
        vec![ParamPair::new(
            prefixed_key(self.param_prefix.as_deref(), PARAM),
            fragments.join(","),
        )]
    }

    fn match_param(&self, key: &str, _value: &str) -> bool {
        unprefixed_key(self.param_prefix.as_deref(), key) == Some(PARAM)
    }

    async fn parse_param(&self, _key: &str, value: &str) -> Vec<Value> {
        let columns = load_columns(self.query_info.as_ref()).await;

        value
            .split(',')
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| {
                let (name, direction) = match fragment.strip_prefix('-') {
                    Some(name) => (name, SortDirection::Desc),
                    None => (fragment, SortDirection::Asc),
                };
                let column = columns
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .cloned()
                    .unwrap_or_else(|| QueryColumn::new(name, name, JsonType::String));
                Self::build_value(&column, direction)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixture_query;

    fn action() -> SortAction {
        SortAction::new(Arc::new(fixture_query()))
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_complete_sort() {
        let value = action().complete_action(&tokens(&["name", "desc"])).await;
        assert!(value.is_valid);
        assert_eq!(value.value, "name desc");
        assert_eq!(value.param.as_deref(), Some("-name"));
        assert_eq!(value.display_value.as_deref(), Some("Name DESC"));

        let value = action().complete_action(&tokens(&["Height"])).await;
        assert_eq!(value.value, "height asc");
        assert_eq!(value.param.as_deref(), Some("height"));
    }

    #[tokio::test]
    async fn test_sort_on_lookup_uses_column_name() {
        let value = action().complete_action(&tokens(&["category/label", "asc"])).await;
        assert!(value.is_valid);
        assert_eq!(value.param.as_deref(), Some("category"));
    }

    #[tokio::test]
    async fn test_invalid_sorts() {
        let action = action();
        assert!(!action.complete_action(&[]).await.is_valid);
        assert!(!action.complete_action(&tokens(&["nope"])).await.is_valid);
        assert!(!action.complete_action(&tokens(&["name", "sideways"])).await.is_valid);
        assert!(!action.complete_action(&tokens(&["name", "asc", "extra"])).await.is_valid);
    }

    #[tokio::test]
    async fn test_direction_options() {
        let options = action().fetch_options(&tokens(&["name", ""])).await;
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["ASC", "DESC"]);

        let options = action().fetch_options(&tokens(&["name", "d"])).await;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value.as_deref(), Some("name desc"));
        assert!(options[0].is_complete);
    }

    #[tokio::test]
    async fn test_sort_params() {
        let action: Arc<dyn Action> = Arc::new(action());
        let values = vec![
            ActionValue::new(action.clone(), action.complete_action(&tokens(&["name", "desc"])).await),
            ActionValue::new(action.clone(), action.complete_action(&tokens(&["height"])).await),
        ];

        let params = action.build_params(&values);
        assert_eq!(params, vec![ParamPair::new("sort", "-name,height")]);
        assert!(action.match_param("sort", "-name,height"));

        let restored = action.parse_param("sort", "-name,height").await;
        let restored: Vec<&str> = restored.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(restored, vec!["name desc", "height asc"]);
    }
}
