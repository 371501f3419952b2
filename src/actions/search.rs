use async_trait::async_trait;

use super::{prefixed_key, unprefixed_key, Action, ActionOption, ActionValue, ParamPair, Value};

pub const KEYWORD: &str = "search";
const PARAM: &str = "q";
const TERM_SEPARATOR: &str = ";";

/// The whole remaining input is the search term.
#[derive(Debug, Clone)]
pub struct SearchAction {
    keyword: String,
    param_prefix: Option<String>,
}

impl Default for SearchAction {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchAction {
    pub fn new() -> Self {
        Self {
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

    fn term(tokens: &[String]) -> String {
        tokens.join(" ").trim().to_string()
    }
}

#[async_trait]
impl Action for SearchAction {
    fn name(&self) -> &'static str {
        "search"
    }

    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn icon_cls(&self) -> &str {
        "search"
    }

    async fn complete_action(&self, tokens: &[String]) -> Value {
        let term = Self::term(tokens);
        if term.is_empty() {
            return Value::invalid(tokens);
        }
        Value::new(term.clone(), term.clone(), term)
    }

    async fn fetch_options(&self, tokens: &[String]) -> Vec<ActionOption> {
        let term = Self::term(tokens);
        vec![ActionOption::new(format!("search for \"{term}\""))
            .value(term.clone())
            .complete()
            .selectable(!term.is_empty())]
    }

    fn build_params(&self, values: &[ActionValue]) -> Vec<ParamPair> {
        let terms: Vec<&str> = values.iter().filter_map(ActionValue::param).collect();
        if terms.is_empty() {
            return Vec::new();
        }
        vec![ParamPair::new(
            prefixed_key(self.param_prefix.as_deref(), PARAM),
            terms.join(TERM_SEPARATOR),
        )]
    }

    fn match_param(&self, key: &str, _value: &str) -> bool {
        unprefixed_key(self.param_prefix.as_deref(), key) == Some(PARAM)
    }

    async fn parse_param(&self, _key: &str, value: &str) -> Vec<Value> {
        value
            .split(TERM_SEPARATOR)
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| Value::new(term, term, term))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_search_term() {
        let value = SearchAction::new().complete_action(&tokens(&["green", "apple"])).await;
        assert!(value.is_valid);
        assert_eq!(value.value, "green apple");
        assert_eq!(value.param.as_deref(), Some("green apple"));

        let empty = SearchAction::new().complete_action(&tokens(&[""])).await;
        assert!(!empty.is_valid);
    }

    #[tokio::test]
    async fn test_search_option() {
        let options = SearchAction::new().fetch_options(&tokens(&["apple", ""])).await;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, "search for \"apple\"");
        assert!(options[0].selectable);

        let options = SearchAction::new().fetch_options(&[]).await;
        assert!(!options[0].selectable);
    }

    #[tokio::test]
    async fn test_search_params() {
        let action: Arc<dyn Action> = Arc::new(SearchAction::new().with_param_prefix(Some("query".to_string())));
        let values = vec![
            ActionValue::new(action.clone(), Value::new("apple", "apple", "apple")),
            ActionValue::new(action.clone(), Value::new("pear", "pear", "pear")),
        ];
        assert_eq!(action.build_params(&values), vec![ParamPair::new("query.q", "apple;pear")]);
        assert!(action.match_param("query.q", ""));
        assert!(!action.match_param("q", ""));

        let restored = action.parse_param("query.q", "apple; pear;").await;
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[1].value, "pear");
    }
}
