use std::cmp::Ordering;
use std::collections::HashSet;

use crate::schema::{CellValue, DataProvider, FieldKey};

/// An existing value offered for a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValueSuggestion {
    pub label: String,
    pub value: String,
}

impl ValueSuggestion {
    fn from_cell(cell: &CellValue) -> Option<Self> {
        let label = cell.label()?;
        let value = cell.value_text().unwrap_or_else(|| label.clone());
        Some(Self { label, value })
    }
}

/// Distinct existing values of `field_key` containing `typed` in any of their
/// representations, naturally ordered and capped at `max`.
pub(crate) async fn resolve_values(
    data: &dyn DataProvider,
    field_key: &FieldKey,
    typed: &str,
    max: usize,
) -> Vec<ValueSuggestion> {
    let cells = match data.select_distinct(field_key).await {
        Ok(cells) => cells,
        Err(err) => {
            log::warn!("failed to load values for {field_key}: {err:#}");
            return Vec::new();
        }
    };

    let needle = typed.trim().to_lowercase();
    let mut seen = HashSet::new();
    let mut suggestions: Vec<ValueSuggestion> = cells
        .iter()
        .filter(|cell| cell.representations().any(|r| r.to_lowercase().contains(&needle)))
        .filter_map(ValueSuggestion::from_cell)
        .filter(|s| seen.insert(s.value.clone()))
        .collect();

    suggestions.sort_by(|a, b| natural_cmp(&a.label, &b.label));
    suggestions.truncate(max);
    suggestions
}

/// Case-insensitive ordering that compares digit runs by numeric value, so
/// `item2` sorts before `item10`.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x_run = take_digits(&mut a_chars);
                let y_run = take_digits(&mut b_chars);
                let ord = compare_digit_runs(&x_run, &y_run);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticQuery;
    use crate::schema::{JsonType, QueryColumn};
    use serde_json::json;

    fn sorted(mut items: Vec<&str>) -> Vec<&str> {
        items.sort_by(|a, b| natural_cmp(a, b));
        items
    }

    #[test]
    fn test_natural_order() {
        assert_eq!(
            sorted(vec!["item10", "item2", "Item1", "apple"]),
            vec!["apple", "Item1", "item2", "item10"]
        );
        assert_eq!(sorted(vec!["10", "9", "100", "09"]), vec!["09", "9", "10", "100"]);
    }

    fn query() -> StaticQuery {
        let rows = ["apple", "Pineapple", "banana", "apple", "grape 10", "grape 2"]
            .iter()
            .map(|name| {
                let mut row = serde_json::Map::new();
                row.insert("name".to_string(), json!(name));
                row
            })
            .collect();
        StaticQuery::new(vec![QueryColumn::new("name", "Name", JsonType::String)]).with_rows(rows)
    }

    #[tokio::test]
    async fn test_resolve_values_contains_match() {
        let query = query();
        let key = FieldKey::from_name("name");
        let labels: Vec<String> = resolve_values(&query, &key, "APPLE", 15)
            .await
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["apple", "Pineapple"]);
    }

    #[tokio::test]
    async fn test_resolve_values_caps_and_orders() {
        let query = query();
        let key = FieldKey::from_name("name");
        let all: Vec<String> = resolve_values(&query, &key, "", 15)
            .await
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(all, vec!["apple", "banana", "grape 2", "grape 10", "Pineapple"]);

        let capped = resolve_values(&query, &key, "", 2).await;
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_values_collaborator_failure_is_empty() {
        let query = query();
        let missing = FieldKey::from_name("nope");
        assert!(resolve_values(&query, &missing, "", 15).await.is_empty());
    }
}
