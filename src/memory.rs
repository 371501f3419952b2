use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::errors::SchemaError;
use crate::schema::{CellValue, DataProvider, FieldKey, QueryColumn, QueryInfoProvider, QueryView};

/// In-memory query description: columns, views and sample rows.
///
/// Row cells are either plain scalars or objects carrying `value`,
/// `displayValue` and `formattedValue`. Lookup field keys (`col/display`)
/// read the display value of the cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticQuery {
    #[serde(default)]
    pub columns: Vec<QueryColumn>,
    #[serde(default)]
    pub views: Vec<QueryView>,
    #[serde(default)]
    pub rows: Vec<Map<String, JsonValue>>,
}

impl StaticQuery {
    pub fn new(columns: Vec<QueryColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_views(mut self, views: Vec<QueryView>) -> Self {
        self.views = views;
        self
    }

    pub fn with_rows(mut self, rows: Vec<Map<String, JsonValue>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let query: Self = serde_yml::from_str(yaml)?;
        query.validate()?;
        Ok(query)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.to_lowercase()) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(())
    }

    fn cell(raw: &JsonValue, through_lookup: bool) -> Option<CellValue> {
        let cell = match raw {
            JsonValue::Null => return None,
            JsonValue::Object(fields) => {
                let text = |key: &str| fields.get(key).and_then(JsonValue::as_str).map(str::to_string);
                let cell = CellValue {
                    value: fields.get("value").cloned().unwrap_or(JsonValue::Null),
                    display_value: text("displayValue"),
                    formatted_value: text("formattedValue"),
                };
                if through_lookup {
                    CellValue::new(JsonValue::String(cell.label()?))
                } else {
                    cell
                }
            }
            scalar => CellValue::new(scalar.clone()),
        };
        cell.label().map(|_| cell)
    }
}

#[async_trait]
impl QueryInfoProvider for StaticQuery {
    async fn columns(&self) -> anyhow::Result<Vec<QueryColumn>> {
        Ok(self.columns.clone())
    }

    async fn views(&self) -> anyhow::Result<Vec<QueryView>> {
        Ok(self.views.clone())
    }
}

#[async_trait]
impl DataProvider for StaticQuery {
    async fn select_distinct(&self, field_key: &FieldKey) -> anyhow::Result<Vec<CellValue>> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(field_key.root()))
            .ok_or_else(|| anyhow::anyhow!("unknown column '{}'", field_key.root()))?;

        let mut seen = HashSet::new();
        let cells = self
            .rows
            .iter()
            .filter_map(|row| row.get(&column.name))
            .filter_map(|raw| Self::cell(raw, field_key.is_lookup()))
            .filter(|cell| seen.insert(cell.value_text().or_else(|| cell.label())))
            .collect();
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
columns:
  - name: name
    shortCaption: Name
  - name: category
    shortCaption: Category
    jsonType: int
    lookup:
      schemaName: lists
      queryName: categories
      displayColumn: label
views:
  - name: Details
rows:
  - name: apple
    category: { value: 1, displayValue: Fruit }
  - name: apple
    category: { value: 2, displayValue: Vegetable }
  - name: carrot
    category: null
"#;

    #[tokio::test]
    async fn test_load_from_yaml() {
        let query = StaticQuery::from_yaml(YAML).unwrap();
        let columns = query.columns().await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].lookup.as_ref().unwrap().display_column, "label");
        assert_eq!(query.views().await.unwrap()[0].name, "Details");
    }

    #[tokio::test]
    async fn test_select_distinct_dedups() {
        let query = StaticQuery::from_yaml(YAML).unwrap();
        let names = query.select_distinct(&FieldKey::from_name("name")).await.unwrap();
        let texts: Vec<String> = names.iter().filter_map(CellValue::value_text).collect();
        assert_eq!(texts, vec!["apple", "carrot"]);
    }

    #[tokio::test]
    async fn test_select_distinct_through_lookup() {
        let query = StaticQuery::from_yaml(YAML).unwrap();
        let key = FieldKey::from_parts(["category", "label"]);
        let labels: Vec<String> = query
            .select_distinct(&key)
            .await
            .unwrap()
            .iter()
            .filter_map(CellValue::value_text)
            .collect();
        assert_eq!(labels, vec!["Fruit", "Vegetable"]);
    }

    #[tokio::test]
    async fn test_unknown_column_is_an_error() {
        let query = StaticQuery::from_yaml(YAML).unwrap();
        assert!(query.select_distinct(&FieldKey::from_name("nope")).await.is_err());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let yaml = "columns:\n  - name: a\n  - name: A\n";
        assert!(matches!(
            StaticQuery::from_yaml(yaml),
            Err(SchemaError::DuplicateColumn(_))
        ));
    }
}
