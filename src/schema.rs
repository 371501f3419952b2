use std::fmt::{self, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// View names starting with this prefix are internal and never offered.
pub const HIDDEN_VIEW_PREFIX: &str = "~~";

/// Declared value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    Date,
    Time,
}

impl Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::String => "string",
            JsonType::Int => "int",
            JsonType::Float => "float",
            JsonType::Boolean => "boolean",
            JsonType::Date => "date",
            JsonType::Time => "time",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLookup {
    pub schema_name: String,
    pub query_name: String,
    pub display_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryColumn {
    pub name: String,
    #[serde(default)]
    pub short_caption: String,
    #[serde(default)]
    pub json_type: JsonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<ColumnLookup>,
}

impl QueryColumn {
    pub fn new(name: &str, short_caption: &str, json_type: JsonType) -> Self {
        Self {
            name: name.to_string(),
            short_caption: short_caption.to_string(),
            json_type,
            lookup: None,
        }
    }

    pub fn with_lookup(mut self, schema_name: &str, query_name: &str, display_column: &str) -> Self {
        self.lookup = Some(ColumnLookup {
            schema_name: schema_name.to_string(),
            query_name: query_name.to_string(),
            display_column: display_column.to_string(),
        });
        self
    }

    /// Caption shown to users, falling back to the column name.
    pub fn caption(&self) -> &str {
        if self.short_caption.is_empty() {
            &self.name
        } else {
            &self.short_caption
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryView {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl QueryView {
    pub fn new(name: &str, label: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            label: label.map(str::to_string),
            is_default: false,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Default and internal views are never addressable by name.
    pub fn is_hidden(&self) -> bool {
        self.is_default || self.name.is_empty() || self.name.starts_with(HIDDEN_VIEW_PREFIX)
    }
}

/// One cell as returned by the data collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellValue {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

impl CellValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    /// Raw value as text; `None` for nulls, arrays and objects.
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Best human representation of the cell.
    pub fn label(&self) -> Option<String> {
        self.display_value
            .clone()
            .or_else(|| self.formatted_value.clone())
            .or_else(|| self.value_text())
    }

    /// Every textual representation, used for case-insensitive matching.
    pub fn representations(&self) -> impl Iterator<Item = String> + '_ {
        self.display_value
            .iter()
            .cloned()
            .chain(self.formatted_value.iter().cloned())
            .chain(self.value_text())
    }
}

const FIELD_KEY_ESCAPES: [(char, &str); 6] = [
    ('$', "$D"),
    ('/', "$S"),
    ('&', "$A"),
    ('}', "$B"),
    ('~', "$T"),
    (',', "$C"),
];

/// Path to a column, possibly through lookups. Rendered as `/`-joined parts
/// with reserved characters inside each part escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    parts: Vec<String>,
}

impl FieldKey {
    pub fn from_name(name: &str) -> Self {
        Self {
            parts: vec![name.to_string()],
        }
    }

    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses an encoded key such as `category/label` or `a$Sb`.
    pub fn parse(encoded: &str) -> Self {
        Self {
            parts: encoded.split('/').map(decode_part).collect(),
        }
    }

    pub fn root(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or_default()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_lookup(&self) -> bool {
        self.parts.len() > 1
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded: Vec<String> = self.parts.iter().map(|p| encode_part(p)).collect();
        write!(f, "{}", encoded.join("/"))
    }
}

fn encode_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match FIELD_KEY_ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

fn decode_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    let mut chars = part.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(&code) = chars.peek() {
                let found = FIELD_KEY_ESCAPES
                    .iter()
                    .find(|(_, escaped)| escaped.ends_with(code));
                if let Some((raw, _)) = found {
                    out.push(*raw);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Read-only metadata about the queryable being filtered.
#[async_trait]
pub trait QueryInfoProvider: Send + Sync {
    async fn columns(&self) -> anyhow::Result<Vec<QueryColumn>>;

    async fn views(&self) -> anyhow::Result<Vec<QueryView>>;
}

/// Read-only access to existing row values.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Distinct values present for a field.
    async fn select_distinct(&self, field_key: &FieldKey) -> anyhow::Result<Vec<CellValue>>;
}
