use std::collections::BTreeMap;

use crate::APP_LABEL;

/// Labels stamped on both children: every parent label, plus
/// `app=<parent name>` which always wins over a user-supplied `app`.
pub fn propagate_labels(
    parent_labels: &BTreeMap<String, String>,
    parent_name: &str,
) -> BTreeMap<String, String> {
    let mut labels = parent_labels.clone();
    labels.insert(APP_LABEL.to_string(), parent_name.to_string());
    labels
}

/// Selector the Service uses to find the EventListener pods.
pub fn identity_selector(parent_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), parent_name.to_string())])
}
