//! Shared test utilities for config module tests.

use std::collections::HashMap;

/// Environment lookup backed by a fixed set of variables.
pub fn fake_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}
