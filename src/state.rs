//! Inspector state panel: module state plus namespace-local getters, and
//! edits written back into the store's state tree.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{InspectorError, Result};
use crate::getters::LocalGetters;
use crate::path::{self, SEPARATOR};
use crate::store::{GetterSource, Store};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateField {
    pub key: String,
    pub editable: bool,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectorState {
    pub state: Vec<StateField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getters: Option<Vec<StateField>>,
}

impl InspectorState {
    pub fn state_value(&self, key: &str) -> Option<&Value> {
        self.state.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn getter_value(&self, key: &str) -> Option<&Value> {
        self.getters
            .as_ref()?
            .iter()
            .find(|f| f.key == key)
            .map(|f| &f.value)
    }
}

/// Snapshot of a module's own state keys (editable) and, when the view is
/// non-empty, its getters (read-only, evaluated now).
pub fn format_state(
    module_state: &Value,
    getters: &LocalGetters,
    source: &dyn GetterSource,
) -> InspectorState {
    let state: Vec<StateField> = match module_state {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| StateField {
                key: key.clone(),
                editable: true,
                value: value.clone(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let getters: Option<Vec<StateField>> = (!getters.is_empty()).then(|| {
        getters
            .entries(source)
            .into_iter()
            .map(|(key, value)| StateField {
                key: getter_label(&key),
                editable: false,
                value,
            })
            .collect()
    });

    InspectorState { state, getters }
}

fn getter_label(key: &str) -> String {
    if key.ends_with(SEPARATOR) {
        path::display_label(key).to_string()
    } else {
        key.to_string()
    }
}

/// State panel for the node `node_id` of `store`.
pub fn inspector_state(store: &Store, node_id: &str) -> Result<InspectorState> {
    let module_state = store.module_state(node_id)?;
    let getters = store.local_getters(node_id);
    Ok(format_state(module_state, &getters, store))
}

/// Absolute key sequence in the state tree for a field of a node.
pub fn edit_path(node_id: &str, field_path: &[String]) -> Vec<String> {
    path::segments(node_id)
        .into_iter()
        .map(String::from)
        .chain(field_path.iter().cloned())
        .collect()
}

/// Overwrite an existing value. Object keys must already exist and array
/// segments must be in-bounds indices.
pub fn set_at_path(state: &mut Value, keys: &[String], value: Value) -> Result<()> {
    if keys.is_empty() {
        return Err(InspectorError::InvalidEditPath {
            path: String::new(),
            reason: "empty field path".to_string(),
        });
    }

    let mut target = state;
    for (depth, key) in keys.iter().enumerate() {
        target = child_mut(target, key).ok_or_else(|| InspectorError::InvalidEditPath {
            path: keys.join("."),
            reason: format!("no value at \"{}\"", keys[..=depth].join(".")),
        })?;
    }
    *target = value;
    Ok(())
}

fn child_mut<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Apply an inspector edit under the store's commit wrapper.
pub fn apply_edit(
    store: &mut Store,
    node_id: &str,
    field_path: &[String],
    value: Value,
) -> Result<()> {
    store.module(node_id)?;
    let keys = edit_path(node_id, field_path);
    debug!(node = %node_id, path = %keys.join("."), "editing inspector state");
    store.with_commit(|store| set_at_path(store.state_mut()?, &keys, value))
}
