use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::schema::JsonType;

/// A catalogued comparison operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterType {
    pub url_suffix: String,
    pub display_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_symbol: Option<String>,
    #[serde(default = "default_true")]
    pub data_value_required: bool,
    #[serde(default)]
    pub multi_valued: bool,
    pub json_types: Vec<JsonType>,
}

fn default_true() -> bool {
    true
}

impl FilterType {
    pub fn new(url_suffix: &str, display_value: &str, display_symbol: Option<&str>, json_types: &[JsonType]) -> Self {
        Self {
            url_suffix: url_suffix.to_string(),
            display_value: display_value.to_string(),
            display_symbol: display_symbol.map(str::to_string),
            data_value_required: true,
            multi_valued: false,
            json_types: json_types.to_vec(),
        }
    }

    pub fn without_value(mut self) -> Self {
        self.data_value_required = false;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn applies_to(&self, json_type: JsonType) -> bool {
        self.json_types.contains(&json_type)
    }

    /// Symbol when there is one, otherwise the descriptive name.
    pub fn label(&self) -> &str {
        self.display_symbol.as_deref().unwrap_or(&self.display_value)
    }
}

/// The standard operator catalogue.
pub fn catalogue() -> Vec<FilterType> {
    use JsonType::*;

    let all = [String, Int, Float, Boolean, Date, Time];
    let not_date = [String, Int, Float, Boolean, Time];
    let ordered = [String, Int, Float, Time];
    let listable = [String, Int, Float, Date];

    vec![
        FilterType::new("eq", "Equals", Some("="), &not_date),
        FilterType::new("neqornull", "Does Not Equal", Some("<>"), &not_date),
        FilterType::new("dateeq", "Equals", Some("="), &[Date]),
        FilterType::new("dateneq", "Does Not Equal", Some("<>"), &[Date]),
        FilterType::new("isblank", "Is Blank", None, &all).without_value(),
        FilterType::new("isnonblank", "Is Not Blank", None, &all).without_value(),
        FilterType::new("gt", "Is Greater Than", Some(">"), &ordered),
        FilterType::new("lt", "Is Less Than", Some("<"), &ordered),
        FilterType::new("gte", "Is Greater Than or Equal To", Some(">="), &ordered),
        FilterType::new("lte", "Is Less Than or Equal To", Some("=<"), &ordered),
        FilterType::new("dategt", "Is Greater Than", Some(">"), &[Date]),
        FilterType::new("datelt", "Is Less Than", Some("<"), &[Date]),
        FilterType::new("dategte", "Is Greater Than or Equal To", Some(">="), &[Date]),
        FilterType::new("datelte", "Is Less Than or Equal To", Some("=<"), &[Date]),
        FilterType::new("contains", "Contains", None, &[String]),
        FilterType::new("doesnotcontain", "Does Not Contain", None, &[String]),
        FilterType::new("startswith", "Starts With", None, &[String]),
        FilterType::new("doesnotstartwith", "Does Not Start With", None, &[String]),
        FilterType::new("in", "Equals One Of", None, &listable).multi_valued(),
        FilterType::new("notin", "Does Not Equal Any Of", None, &listable).multi_valued(),
    ]
}

/// Operator lookup tables, built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FilterTypeRegistry {
    /// symbol -> suffix -> type
    by_symbol: HashMap<String, BTreeMap<String, FilterType>>,
    by_suffix: HashMap<String, FilterType>,
    /// suffixes in catalogue order
    order: Vec<String>,
}

impl FilterTypeRegistry {
    /// Builds the registry. The first catalogue entry for a suffix wins.
    pub fn new<I>(catalogue: I) -> Self
    where
        I: IntoIterator<Item = FilterType>,
    {
        let mut registry = Self::default();

        for filter_type in catalogue {
            let suffix = filter_type.url_suffix.to_lowercase();
            if registry.by_suffix.contains_key(&suffix) {
                log::debug!("skipping duplicate filter type suffix '{suffix}'");
                continue;
            }

            if let Some(symbol) = &filter_type.display_symbol {
                registry
                    .by_symbol
                    .entry(symbol.clone())
                    .or_default()
                    .insert(suffix.clone(), filter_type.clone());
            }
            registry.order.push(suffix.clone());
            registry.by_suffix.insert(suffix, filter_type);
        }

        registry
    }

    pub fn standard() -> Self {
        Self::new(catalogue())
    }

    pub fn by_suffix(&self, suffix: &str) -> Option<&FilterType> {
        self.by_suffix.get(&suffix.to_lowercase())
    }

    /// Resolves an operator token typed against a column of `json_type`.
    ///
    /// URL suffixes resolve directly. Display symbols resolve only when exactly
    /// one type valid for `json_type` carries the symbol; an ambiguous symbol is
    /// logged and left unresolved.
    pub fn resolve_filter_type(&self, token: &str, json_type: JsonType) -> Option<&FilterType> {
        if let Some(filter_type) = self.by_suffix(token) {
            return Some(filter_type);
        }

        let Some(types) = self.by_symbol.get(token) else {
            log::debug!("unknown filter operator '{token}'");
            return None;
        };

        let candidates: Vec<&FilterType> = types.values().filter(|t| t.applies_to(json_type)).collect();
        match candidates.as_slice() {
            [only] => Some(*only),
            [] => {
                log::debug!("operator '{token}' does not apply to {json_type} columns");
                None
            }
            many => {
                let suffixes: Vec<&str> = many.iter().map(|t| t.url_suffix.as_str()).collect();
                log::warn!(
                    "ambiguous operator '{token}' for {json_type} columns: matches {}",
                    suffixes.join(", ")
                );
                None
            }
        }
    }

    /// Types valid for `json_type`, in catalogue order.
    pub fn types_for(&self, json_type: JsonType) -> impl Iterator<Item = &FilterType> + '_ {
        self.order
            .iter()
            .filter_map(move |suffix| self.by_suffix.get(suffix))
            .filter(move |t| t.applies_to(json_type))
    }

    /// One entry per distinct display symbol valid for `json_type`. Suffix-only
    /// types are left out.
    pub fn symbols_for(&self, json_type: JsonType) -> Vec<&FilterType> {
        let mut seen = HashSet::new();
        self.types_for(json_type)
            .filter(|t| match &t.display_symbol {
                Some(symbol) => seen.insert(symbol.clone()),
                None => false,
            })
            .collect()
    }

    /// The token that re-resolves to `filter_type` for `json_type`: its symbol
    /// when unambiguous, else its suffix.
    pub fn operator_token(&self, filter_type: &FilterType, json_type: JsonType) -> String {
        if let Some(symbol) = &filter_type.display_symbol {
            let unique = self
                .by_symbol
                .get(symbol)
                .map(|types| types.values().filter(|t| t.applies_to(json_type)).count() == 1)
                .unwrap_or(false);
            if unique && filter_type.applies_to(json_type) {
                return symbol.clone();
            }
        }
        filter_type.url_suffix.clone()
    }
}
