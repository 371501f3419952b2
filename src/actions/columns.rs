use crate::schema::{FieldKey, JsonType, QueryColumn, QueryInfoProvider, QueryView};
use crate::tokenizer::quote_token;

use super::{eq_ignore_case, starts_with_ignore_case, ActionOption};

/// A column bound from a typed token, possibly addressed through a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    pub column: QueryColumn,
    /// Lookup path after the column name (`category/label` -> `["label"]`).
    pub path: Vec<String>,
}

impl ColumnMatch {
    pub fn new(column: QueryColumn) -> Self {
        Self { column, path: Vec::new() }
    }

    fn is_default_path(&self) -> bool {
        match (&self.column.lookup, self.path.as_slice()) {
            (_, []) => true,
            (Some(lookup), [only]) => only.eq_ignore_ascii_case(&lookup.display_column),
            _ => false,
        }
    }

    /// Field the filter applies to. Lookup columns filter on their display column.
    pub fn field_key(&self) -> FieldKey {
        if !self.path.is_empty() {
            let mut parts = vec![self.column.name.clone()];
            parts.extend(self.path.iter().cloned());
            return FieldKey::from_parts(parts);
        }
        match &self.column.lookup {
            Some(lookup) => FieldKey::from_parts([self.column.name.clone(), lookup.display_column.clone()]),
            None => FieldKey::from_name(&self.column.name),
        }
    }

    /// Token that re-binds to this match when typed.
    pub fn token(&self) -> String {
        if self.is_default_path() {
            quote_token(&self.column.name)
        } else {
            quote_token(&format!("{}/{}", self.column.name, self.path.join("/")))
        }
    }

    pub fn caption(&self) -> String {
        if self.is_default_path() {
            self.column.caption().to_string()
        } else {
            format!("{}/{}", self.column.caption(), self.path.join("/"))
        }
    }

    /// Values reached through a lookup are compared as display text.
    pub fn json_type(&self) -> JsonType {
        if self.column.lookup.is_some() {
            JsonType::String
        } else {
            self.column.json_type
        }
    }
}

/// Binds `token` to a column. Exact name or lookup-name matches win over
/// caption matches. Partial names never bind.
pub fn parse_column(columns: &[QueryColumn], token: &str) -> Option<ColumnMatch> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Some((head, tail)) = token.split_once('/') {
        let path: Vec<String> = tail
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        let lookup = columns
            .iter()
            .find(|c| c.lookup.is_some() && eq_ignore_case(&c.name, head));
        if let (Some(column), false) = (lookup, path.is_empty()) {
            return Some(ColumnMatch {
                column: column.clone(),
                path,
            });
        }
    }

    columns
        .iter()
        .find(|c| eq_ignore_case(&c.name, token))
        .or_else(|| columns.iter().find(|c| eq_ignore_case(c.caption(), token)))
        .cloned()
        .map(ColumnMatch::new)
}

/// Column suggestions for a partially typed column token.
pub fn column_options(columns: &[QueryColumn], partial: &str) -> Vec<ActionOption> {
    columns
        .iter()
        .filter(|c| starts_with_ignore_case(&c.name, partial) || starts_with_ignore_case(c.caption(), partial))
        .map(|c| {
            let option = ActionOption::new(&c.name).value(&c.name);
            if c.caption() != c.name {
                option.next_label(c.caption())
            } else {
                option
            }
        })
        .collect()
}

/// Column metadata, degrading to nothing when the collaborator fails.
pub(crate) async fn load_columns(query_info: &dyn QueryInfoProvider) -> Vec<QueryColumn> {
    match query_info.columns().await {
        Ok(columns) => columns,
        Err(err) => {
            log::warn!("failed to load query columns: {err:#}");
            Vec::new()
        }
    }
}

pub(crate) async fn load_views(query_info: &dyn QueryInfoProvider) -> Vec<QueryView> {
    match query_info.views().await {
        Ok(views) => views,
        Err(err) => {
            log::warn!("failed to load query views: {err:#}");
            Vec::new()
        }
    }
}
