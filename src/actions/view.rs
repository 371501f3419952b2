use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::schema::{QueryInfoProvider, QueryView};
use crate::tokenizer::quote_token;

use super::columns::load_views;
use super::{eq_ignore_case, prefixed_key, unprefixed_key, Action, ActionOption, ActionValue, ParamPair, Value};

pub const KEYWORD: &str = "view";
const PARAM: &str = "view";

/// Selects a named, non-default view.
pub struct ViewAction {
    query_info: Arc<dyn QueryInfoProvider>,
    keyword: String,
    param_prefix: Option<String>,
}

impl fmt::Debug for ViewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewAction")
            .field("keyword", &self.keyword)
            .field("param_prefix", &self.param_prefix)
            .finish_non_exhaustive()
    }
}

impl ViewAction {
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

    async fn find_view(&self, name: &str) -> Option<QueryView> {
        load_views(self.query_info.as_ref())
            .await
            .into_iter()
            .find(|v| !v.is_hidden() && eq_ignore_case(&v.name, name))
    }

    fn build_value(view: &QueryView) -> Value {
        Value::new(view.name.clone(), view.label(), view.name.clone())
    }
}

#[async_trait]
impl Action for ViewAction {
    fn name(&self) -> &'static str {
        "view"
    }

    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn icon_cls(&self) -> &str {
        "table"
    }

    async fn complete_action(&self, tokens: &[String]) -> Value {
        let name = tokens.join(" ");
        match self.find_view(name.trim()).await {
            Some(view) => Self::build_value(&view),
            None => Value::invalid(tokens),
        }
    }

    async fn fetch_options(&self, tokens: &[String]) -> Vec<ActionOption> {
        let partial = tokens.join(" ").trim().to_lowercase();
        load_views(self.query_info.as_ref())
            .await
            .into_iter()
            .filter(|v| !v.is_hidden())
            .filter(|v| v.label().to_lowercase().contains(&partial) || v.name.to_lowercase().starts_with(&partial))
            .map(|v| {
                let option = ActionOption::new(v.label()).value(quote_token(&v.name)).complete();
                if v.label() != v.name {
                    option.next_label(&v.name)
                } else {
                    option
                }
            })
            .collect()
    }

    fn build_params(&self, values: &[ActionValue]) -> Vec<ParamPair> {
        // only one view applies at a time
        values
            .iter()
            .rev()
            .find_map(ActionValue::param)
            .map(|name| vec![ParamPair::new(prefixed_key(self.param_prefix.as_deref(), PARAM), name)])
            .unwrap_or_default()
    }

    fn match_param(&self, key: &str, _value: &str) -> bool {
        unprefixed_key(self.param_prefix.as_deref(), key) == Some(PARAM)
    }

    async fn parse_param(&self, _key: &str, value: &str) -> Vec<Value> {
        match self.find_view(value).await {
            Some(view) => vec![Self::build_value(&view)],
            None => {
                log::debug!("view '{value}' is unknown or hidden");
                Vec::new()
            }
        }
    }
}
