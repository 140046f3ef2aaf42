//! Module tree structure and module definitions.
//!
//! [`Module`] is the shape the inspector walks: namespaced flag, ordered
//! children and declared getter names. State lives in the store's single
//! state tree, nested by child name. [`ModuleDef`] is what callers register
//! with a [`Store`](crate::store::Store); [`ModuleSpec`] is its JSON form.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{InspectorError, Result};
use crate::path;
use crate::store::ActionContext;

/// Getter over the module's local state.
pub type GetterFn = Rc<dyn Fn(&Value) -> Value>;
/// Mutation over the module's local state with an optional payload.
pub type MutationFn = Rc<dyn Fn(&mut Value, Option<&Value>)>;
/// Action handler; commits and dispatches through the context.
pub type ActionFn = Rc<dyn Fn(&mut ActionContext<'_>, Option<&Value>) -> Result<()>>;

/// A node of the registered module tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub namespaced: bool,
    /// Children in declaration order.
    pub children: Vec<(String, Module)>,
    /// Getter names declared directly on this module (unprefixed).
    pub getter_names: Vec<String>,
}

impl Module {
    pub fn new(namespaced: bool) -> Self {
        Self {
            namespaced,
            ..Self::default()
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: Module) -> Self {
        self.add_child(name, child);
        self
    }

    /// Add a child, replacing any existing child of the same name in place.
    pub fn add_child(&mut self, name: impl Into<String>, child: Module) {
        let name = name.into();
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = child,
            None => self.children.push((name, child)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Module> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    /// Number of modules in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|(_, c)| c.count()).sum::<usize>()
    }

    /// Resolve a node id (`"root"` or a namespace path) below this module.
    pub fn resolve(&self, node_id: &str) -> Result<&Module> {
        let mut current = self;
        for segment in path::segments(node_id) {
            current = current
                .child(segment)
                .ok_or_else(|| InspectorError::ModuleNotFound {
                    segment: segment.to_string(),
                    path: node_id.to_string(),
                })?;
        }
        Ok(current)
    }
}

/// Registration-time description of a module and its handlers.
#[derive(Clone, Default)]
pub struct ModuleDef {
    pub(crate) namespaced: bool,
    pub(crate) state: Map<String, Value>,
    pub(crate) getters: Vec<(String, GetterFn)>,
    pub(crate) mutations: Vec<(String, MutationFn)>,
    pub(crate) actions: Vec<(String, ActionFn)>,
    pub(crate) modules: Vec<(String, ModuleDef)>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Initial local state. Must be a JSON object; anything else is ignored.
    pub fn state(mut self, state: Value) -> Self {
        match state {
            Value::Object(map) => self.state = map,
            other => warn!(state = %other, "module state must be an object, ignoring"),
        }
        self
    }

    pub fn getter(mut self, name: impl Into<String>, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.getters.push((name.into(), Rc::new(f)));
        self
    }

    pub fn mutation(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Value, Option<&Value>) + 'static,
    ) -> Self {
        self.mutations.push((name.into(), Rc::new(f)));
        self
    }

    pub fn action(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut ActionContext<'_>, Option<&Value>) -> Result<()> + 'static,
    ) -> Self {
        self.actions.push((name.into(), Rc::new(f)));
        self
    }

    pub fn module(mut self, name: impl Into<String>, def: ModuleDef) -> Self {
        self.modules.push((name.into(), def));
        self
    }

    /// Tree shape of this definition.
    pub(crate) fn structure(&self) -> Module {
        let mut module = Module::new(self.namespaced);
        module.getter_names = self.getters.iter().map(|(n, _)| n.clone()).collect();
        for (name, child) in &self.modules {
            module.add_child(name.clone(), child.structure());
        }
        module
    }

    /// Own state with every child's initial state nested under its name.
    pub(crate) fn initial_state(&self) -> Value {
        let mut state = self.state.clone();
        for (name, child) in &self.modules {
            state.insert(name.clone(), child.initial_state());
        }
        Value::Object(state)
    }
}

/// JSON description of a module tree.
///
/// ```json
/// {"state": {"count": 1},
///  "getters": {"current": "/count"},
///  "modules": {"cart": {"namespaced": true, "state": {"items": []}}}}
/// ```
///
/// Getters are JSON pointers into the module's local state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSpec {
    #[serde(default)]
    pub namespaced: bool,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub getters: Map<String, Value>,
    #[serde(default)]
    pub modules: Map<String, Value>,
}

impl ModuleSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_def(self) -> Result<ModuleDef> {
        let mut def = ModuleDef::new()
            .namespaced(self.namespaced)
            .state(Value::Object(self.state));
        for (name, pointer) in self.getters {
            let pointer: String = serde_json::from_value(pointer)?;
            def = def.getter(name, move |local: &Value| {
                local.pointer(&pointer).cloned().unwrap_or(Value::Null)
            });
        }
        for (name, child) in self.modules {
            let child: ModuleSpec = serde_json::from_value(child)?;
            def = def.module(name, child.into_def()?);
        }
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop() -> Module {
        Module::new(false)
            .with_child(
                "cart",
                Module::new(true).with_child("items", Module::new(false)),
            )
            .with_child("auth", Module::new(true))
    }

    #[test]
    fn test_resolve_root_and_nested() {
        let root = shop();
        assert_eq!(root.resolve("root").unwrap(), &root);
        assert!(root.resolve("cart/").unwrap().namespaced);
        assert!(!root.resolve("cart/items/").unwrap().namespaced);
    }

    #[test]
    fn test_resolve_missing_segment() {
        let err = shop().resolve("cart/missing/").unwrap_err();
        match err {
            InspectorError::ModuleNotFound { segment, path } => {
                assert_eq!(segment, "missing");
                assert_eq!(path, "cart/missing/");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_add_child_replaces_in_place() {
        let mut root = shop();
        root.add_child("cart", Module::new(false));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].0, "cart");
        assert!(!root.children[0].1.namespaced);
    }

    #[test]
    fn test_count() {
        assert_eq!(shop().count(), 4);
        assert_eq!(Module::default().count(), 1);
    }

    #[test]
    fn test_def_structure_and_state() {
        let def = ModuleDef::new()
            .state(json!({"count": 0}))
            .getter("double", |s| json!(s["count"].as_i64().unwrap_or(0) * 2))
            .module(
                "cart",
                ModuleDef::new().namespaced(true).state(json!({"items": []})),
            );

        let module = def.structure();
        assert_eq!(module.getter_names, vec!["double"]);
        assert!(module.child("cart").unwrap().namespaced);
        assert_eq!(
            def.initial_state(),
            json!({"count": 0, "cart": {"items": []}})
        );
    }

    #[test]
    fn test_non_object_state_ignored() {
        let def = ModuleDef::new().state(json!(42));
        assert_eq!(def.initial_state(), json!({}));
    }

    #[test]
    fn test_spec_from_json() {
        let spec = ModuleSpec::from_json(
            r#"{"state": {"count": 3},
                "getters": {"current": "/count"},
                "modules": {"b": {"namespaced": true}, "a": {}}}"#,
        )
        .unwrap();
        let def = spec.into_def().unwrap();
        let module = def.structure();

        let names: Vec<&str> = module.children.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(module.getter_names, vec!["current"]);

        let getter = &def.getters[0].1;
        assert_eq!(getter(&json!({"count": 3})), json!(3));
        assert_eq!(getter(&json!({})), Value::Null);
    }

    #[test]
    fn test_spec_rejects_non_string_getter() {
        let spec = ModuleSpec::from_json(r#"{"getters": {"bad": 1}}"#).unwrap();
        assert!(matches!(spec.into_def(), Err(InspectorError::Json(_))));
    }
}
