use super::{ActionRef, ActionValue, ActionValueCollection};

/// Serializes every collection into one `&`-joined, percent-encoded query.
pub fn build_query_string(collections: &[ActionValueCollection]) -> String {
    collections
        .iter()
        .flat_map(ActionValueCollection::params)
        .map(|pair| pair.encode())
        .collect::<Vec<_>>()
        .join("&")
}

/// Restores committed values from a query string. Each parameter goes to the
/// first action that claims it; unclaimed parameters are ignored.
pub async fn parse_query_string(query: &str, actions: &[ActionRef]) -> Vec<ActionValue> {
    let query = query.trim_start_matches('?');
    let mut restored = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let Some(action) = actions.iter().find(|a| a.match_param(&key, &value)) else {
            log::debug!("ignoring unclaimed query parameter '{key}'");
            continue;
        };

        for parsed in action.parse_param(&key, &value).await {
            restored.push(ActionValue::new(action.clone(), parsed));
        }
    }

    restored
}
