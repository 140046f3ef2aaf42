//! Minimal hierarchical store: one state tree, flat namespaced getters,
//! mutations and actions, and synchronous subscriber channels.
//!
//! Handlers register under the concatenated names of their namespaced
//! ancestors (a non-namespaced module shares its parent's namespace), so
//! `cart/total` is the getter `total` of the namespaced module `cart`.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{InspectorError, Result};
use crate::getters::{LocalGetters, LocalGettersCache};
use crate::module::{ActionFn, GetterFn, Module, ModuleDef, ModuleSpec, MutationFn};
use crate::path;
use crate::timeline::ActionRecord;

/// A committed mutation as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub mutation_type: String,
    pub payload: Option<Value>,
}

/// A dispatched action. Subscribers may attach a record in `before` and
/// consume it in `after`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: String,
    pub payload: Option<Value>,
    pub record: Option<ActionRecord>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            record: None,
        }
    }
}

/// Receives every mutation after it has been applied.
pub trait MutationSubscriber {
    fn on_mutation(&self, mutation: &Mutation, state: &Value);
}

/// Brackets every dispatched action.
pub trait ActionSubscriber {
    fn before(&self, action: &mut Action, state: &Value);
    fn after(&self, action: &mut Action, state: &Value);
}

/// Read access to the flat getters table.
pub trait GetterSource {
    /// Every fully-qualified getter name, in registration order.
    fn getter_names(&self) -> Vec<String>;
    /// Getter names declared directly on the root module.
    fn root_getter_names(&self) -> Vec<String>;
    /// Compute a getter against the current state.
    fn evaluate(&self, name: &str) -> Option<Value>;
}

#[derive(Clone)]
struct RegisteredGetter {
    name: String,
    module_path: Vec<String>,
    f: GetterFn,
}

#[derive(Clone)]
struct RegisteredMutation {
    module_path: Vec<String>,
    f: MutationFn,
}

#[derive(Clone)]
struct RegisteredAction {
    module_path: Vec<String>,
    namespace: String,
    f: ActionFn,
}

pub struct Store {
    root: Module,
    state: Value,
    getters: Vec<RegisteredGetter>,
    mutations: HashMap<String, Vec<RegisteredMutation>>,
    actions: HashMap<String, Vec<RegisteredAction>>,
    mutation_subscribers: Vec<Rc<dyn MutationSubscriber>>,
    action_subscribers: Vec<Rc<dyn ActionSubscriber>>,
    committing: bool,
    strict: bool,
    local_getters: LocalGettersCache,
}

impl Store {
    /// Build a store from a root module definition.
    pub fn new(root: ModuleDef) -> Self {
        let mut store = Self {
            root: root.structure(),
            state: root.initial_state(),
            getters: Vec::new(),
            mutations: HashMap::new(),
            actions: HashMap::new(),
            mutation_subscribers: Vec::new(),
            action_subscribers: Vec::new(),
            committing: false,
            strict: false,
            local_getters: LocalGettersCache::new(),
        };
        store.install(&root, Vec::new(), String::new());
        info!(
            modules = store.root.count(),
            getters = store.getters.len(),
            "store created"
        );
        store
    }

    pub fn from_spec(spec: ModuleSpec) -> Result<Self> {
        Ok(Self::new(spec.into_def()?))
    }

    /// In strict mode the state can only be written while a commit is running.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn install(&mut self, def: &ModuleDef, module_path: Vec<String>, namespace: String) {
        for (name, f) in &def.getters {
            let qualified = format!("{}{}", namespace, name);
            if self.getters.iter().any(|g| g.name == qualified) {
                warn!(getter = %qualified, "duplicate getter key, keeping the first");
                continue;
            }
            self.getters.push(RegisteredGetter {
                name: qualified,
                module_path: module_path.clone(),
                f: Rc::clone(f),
            });
        }

        for (name, f) in &def.mutations {
            self.mutations
                .entry(format!("{}{}", namespace, name))
                .or_default()
                .push(RegisteredMutation {
                    module_path: module_path.clone(),
                    f: Rc::clone(f),
                });
        }

        for (name, f) in &def.actions {
            self.actions
                .entry(format!("{}{}", namespace, name))
                .or_default()
                .push(RegisteredAction {
                    module_path: module_path.clone(),
                    namespace: namespace.clone(),
                    f: Rc::clone(f),
                });
        }

        for (name, child) in &def.modules {
            let mut child_path = module_path.clone();
            child_path.push(name.clone());
            let child_namespace = if child.namespaced {
                path::child_path(&namespace, name)
            } else {
                namespace.clone()
            };
            self.install(child, child_path, child_namespace);
        }
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    /// The whole state tree.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Writable state tree. Fails in strict mode outside of a commit.
    pub fn state_mut(&mut self) -> Result<&mut Value> {
        if self.strict && !self.committing {
            return Err(InspectorError::OutsideCommit);
        }
        Ok(&mut self.state)
    }

    /// Resolve a node id (`"root"` or `"a/b/"`) to its module.
    pub fn module(&self, node_id: &str) -> Result<&Module> {
        self.root.resolve(node_id)
    }

    /// Local state of the module at `node_id`.
    pub fn module_state(&self, node_id: &str) -> Result<&Value> {
        self.module(node_id)?;
        let segments: Vec<String> = path::segments(node_id)
            .into_iter()
            .map(String::from)
            .collect();
        local_state(&self.state, &segments).ok_or_else(|| InspectorError::ModuleNotFound {
            segment: segments.last().cloned().unwrap_or_default(),
            path: node_id.to_string(),
        })
    }

    /// Current value of a fully-qualified getter.
    pub fn getter(&self, name: &str) -> Option<Value> {
        self.evaluate(name)
    }

    /// Namespace-local view of the getters, created once per namespace.
    pub fn local_getters(&self, namespace: &str) -> Rc<LocalGetters> {
        self.local_getters.resolve(namespace, self)
    }

    pub fn local_getters_cache(&self) -> &LocalGettersCache {
        &self.local_getters
    }

    pub fn subscribe(&mut self, subscriber: Rc<dyn MutationSubscriber>) {
        self.mutation_subscribers.push(subscriber);
    }

    pub fn subscribe_action(&mut self, subscriber: Rc<dyn ActionSubscriber>) {
        self.action_subscribers.push(subscriber);
    }

    pub fn is_committing(&self) -> bool {
        self.committing
    }

    /// Run `f` with the committing flag raised.
    pub fn with_commit<T>(&mut self, f: impl FnOnce(&mut Store) -> T) -> T {
        let previous = self.committing;
        self.committing = true;
        let out = f(self);
        self.committing = previous;
        out
    }

    /// Apply every handler registered for `mutation_type`, then notify
    /// mutation subscribers. If any handler's module state is gone, nothing
    /// runs and nobody is notified.
    pub fn commit(&mut self, mutation_type: &str, payload: Option<Value>) -> Result<()> {
        let handlers = self
            .mutations
            .get(mutation_type)
            .cloned()
            .ok_or_else(|| InspectorError::UnknownMutation(mutation_type.to_string()))?;
        debug!(mutation = %mutation_type, handlers = handlers.len(), "commit");

        if let Some(handler) = handlers
            .iter()
            .find(|h| local_state(&self.state, &h.module_path).is_none())
        {
            warn!(
                mutation = %mutation_type,
                module = %path::join(&handler.module_path),
                "module state missing, commit rejected"
            );
            return Err(state_missing(&handler.module_path));
        }

        let payload_ref = payload.as_ref();
        self.with_commit(|store| -> Result<()> {
            let state = store.state_mut()?;
            for handler in &handlers {
                let local = local_state_mut(state, &handler.module_path)
                    .ok_or_else(|| state_missing(&handler.module_path))?;
                (handler.f)(local, payload_ref);
            }
            Ok(())
        })?;

        let mutation = Mutation {
            mutation_type: mutation_type.to_string(),
            payload,
        };
        let subscribers = self.mutation_subscribers.clone();
        for subscriber in &subscribers {
            subscriber.on_mutation(&mutation, &self.state);
        }
        Ok(())
    }

    /// Run every handler registered for `action_type`, bracketed by the
    /// action subscribers' `before` and `after` hooks. A failing handler
    /// aborts the dispatch before the `after` hooks run.
    pub fn dispatch(&mut self, action_type: &str, payload: Option<Value>) -> Result<()> {
        let handlers = self
            .actions
            .get(action_type)
            .cloned()
            .ok_or_else(|| InspectorError::UnknownAction(action_type.to_string()))?;
        debug!(action = %action_type, handlers = handlers.len(), "dispatch");

        let subscribers = self.action_subscribers.clone();
        let mut action = Action::new(action_type, payload);
        for subscriber in &subscribers {
            subscriber.before(&mut action, &self.state);
        }

        for handler in &handlers {
            let mut ctx = ActionContext {
                store: &mut *self,
                namespace: handler.namespace.clone(),
                module_path: handler.module_path.clone(),
            };
            (handler.f)(&mut ctx, action.payload.as_ref())?;
        }

        for subscriber in &subscribers {
            subscriber.after(&mut action, &self.state);
        }
        Ok(())
    }
}

impl GetterSource for Store {
    fn getter_names(&self) -> Vec<String> {
        self.getters.iter().map(|g| g.name.clone()).collect()
    }

    fn root_getter_names(&self) -> Vec<String> {
        self.root.getter_names.clone()
    }

    fn evaluate(&self, name: &str) -> Option<Value> {
        let getter = self.getters.iter().find(|g| g.name == name)?;
        let null = Value::Null;
        let local = local_state(&self.state, &getter.module_path).unwrap_or(&null);
        Some((getter.f)(local))
    }
}

/// Handle given to action handlers; names are resolved in the action's
/// own namespace.
pub struct ActionContext<'a> {
    store: &'a mut Store,
    namespace: String,
    module_path: Vec<String>,
}

impl ActionContext<'_> {
    pub fn commit(&mut self, mutation_type: &str, payload: Option<Value>) -> Result<()> {
        let qualified = format!("{}{}", self.namespace, mutation_type);
        self.store.commit(&qualified, payload)
    }

    pub fn dispatch(&mut self, action_type: &str, payload: Option<Value>) -> Result<()> {
        let qualified = format!("{}{}", self.namespace, action_type);
        self.store.dispatch(&qualified, payload)
    }

    /// Local state of the module that registered the action.
    pub fn state(&self) -> Option<&Value> {
        local_state(&self.store.state, &self.module_path)
    }

    pub fn root_state(&self) -> &Value {
        &self.store.state
    }

    pub fn getter(&self, name: &str) -> Option<Value> {
        self.store.getter(&format!("{}{}", self.namespace, name))
    }
}

fn state_missing(module_path: &[String]) -> InspectorError {
    InspectorError::ModuleNotFound {
        segment: module_path.last().cloned().unwrap_or_default(),
        path: path::join(module_path),
    }
}

fn local_state<'a>(state: &'a Value, module_path: &[String]) -> Option<&'a Value> {
    module_path
        .iter()
        .try_fold(state, |s, segment| s.get(segment.as_str()))
}

fn local_state_mut<'a>(state: &'a mut Value, module_path: &[String]) -> Option<&'a mut Value> {
    module_path
        .iter()
        .try_fold(state, |s, segment| s.get_mut(segment.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn counter_store() -> Store {
        Store::new(
            ModuleDef::new()
                .state(json!({"count": 0}))
                .getter("double", |s| json!(s["count"].as_i64().unwrap_or(0) * 2))
                .mutation("increment", |s, payload| {
                    let by = payload.and_then(Value::as_i64).unwrap_or(1);
                    s["count"] = json!(s["count"].as_i64().unwrap_or(0) + by);
                })
                .module(
                    "cart",
                    ModuleDef::new()
                        .namespaced(true)
                        .state(json!({"lines": []}))
                        .getter("size", |s| json!(s["lines"].as_array().map_or(0, Vec::len)))
                        .mutation("add", |s, payload| {
                            if let (Some(items), Some(p)) = (s["lines"].as_array_mut(), payload) {
                                items.push(p.clone());
                            }
                        })
                        .action("addTwice", |ctx, payload| {
                            ctx.commit("add", payload.cloned())?;
                            ctx.commit("add", payload.cloned())
                        })
                        .module(
                            "items",
                            ModuleDef::new()
                                .state(json!({"loaded": false}))
                                .getter("loaded", |s| s["loaded"].clone()),
                        ),
                ),
        )
    }

    #[derive(Default)]
    struct Recorded {
        mutations: RefCell<Vec<(String, Value)>>,
        actions: RefCell<Vec<String>>,
    }

    impl MutationSubscriber for Recorded {
        fn on_mutation(&self, mutation: &Mutation, state: &Value) {
            self.mutations
                .borrow_mut()
                .push((mutation.mutation_type.clone(), state.clone()));
        }
    }

    impl ActionSubscriber for Recorded {
        fn before(&self, action: &mut Action, _state: &Value) {
            self.actions
                .borrow_mut()
                .push(format!("before:{}", action.action_type));
        }

        fn after(&self, action: &mut Action, _state: &Value) {
            self.actions
                .borrow_mut()
                .push(format!("after:{}", action.action_type));
        }
    }

    #[test]
    fn test_state_nests_children() {
        let store = counter_store();
        assert_eq!(
            store.state(),
            &json!({"count": 0, "cart": {"lines": [], "items": {"loaded": false}}})
        );
        assert_eq!(store.module_state("cart/items/").unwrap(), &json!({"loaded": false}));
        assert_eq!(store.module_state("root").unwrap()["count"], json!(0));
    }

    #[test]
    fn test_getter_namespacing() {
        let store = counter_store();
        assert_eq!(
            store.getter_names(),
            vec!["double", "cart/size", "cart/loaded"]
        );
        assert_eq!(store.root_getter_names(), vec!["double"]);
        assert_eq!(store.getter("cart/loaded"), Some(json!(false)));
        assert_eq!(store.getter("missing"), None);
    }

    #[test]
    fn test_commit_applies_and_notifies() {
        let mut store = counter_store();
        let recorded = Rc::new(Recorded::default());
        store.subscribe(recorded.clone());

        store.commit("increment", Some(json!(5))).unwrap();
        assert_eq!(store.state()["count"], json!(5));
        assert_eq!(store.getter("double"), Some(json!(10)));

        let mutations = recorded.mutations.borrow();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].0, "increment");
        assert_eq!(mutations[0].1["count"], json!(5));
        assert!(!store.is_committing());
    }

    #[test]
    fn test_unknown_mutation_and_action() {
        let mut store = counter_store();
        assert!(matches!(
            store.commit("nope", None),
            Err(InspectorError::UnknownMutation(t)) if t == "nope"
        ));
        assert!(matches!(
            store.dispatch("nope", None),
            Err(InspectorError::UnknownAction(t)) if t == "nope"
        ));
    }

    #[test]
    fn test_dispatch_brackets_handlers() {
        let mut store = counter_store();
        let recorded = Rc::new(Recorded::default());
        store.subscribe(recorded.clone());
        store.subscribe_action(recorded.clone());

        store.dispatch("cart/addTwice", Some(json!({"id": 1}))).unwrap();

        assert_eq!(store.state()["cart"]["lines"], json!([{"id": 1}, {"id": 1}]));
        assert_eq!(
            *recorded.actions.borrow(),
            vec!["before:cart/addTwice", "after:cart/addTwice"]
        );
        assert_eq!(recorded.mutations.borrow().len(), 2);
        assert_eq!(recorded.mutations.borrow()[0].0, "cart/add");
    }

    #[test]
    fn test_failed_action_skips_after() {
        let mut store = Store::new(ModuleDef::new().action("fail", |_, _| {
            Err(InspectorError::ActionFailed {
                action: "fail".into(),
                message: "boom".into(),
            })
        }));
        let recorded = Rc::new(Recorded::default());
        store.subscribe_action(recorded.clone());

        assert!(store.dispatch("fail", None).is_err());
        assert_eq!(*recorded.actions.borrow(), vec!["before:fail"]);
    }

    #[test]
    fn test_with_commit_raises_flag() {
        let mut store = counter_store();
        let seen = store.with_commit(|store| {
            store.state_mut().unwrap()["count"] = json!(9);
            store.is_committing()
        });
        assert!(seen);
        assert_eq!(store.state()["count"], json!(9));
        assert!(!store.is_committing());
    }

    #[test]
    fn test_commit_rejects_missing_module_state() {
        let mut store = counter_store();
        let recorded = Rc::new(Recorded::default());
        store.subscribe(recorded.clone());

        store.state_mut().unwrap().as_object_mut().unwrap().remove("cart");
        let err = store.commit("cart/add", Some(json!({"id": 1}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing module \"cart\" for path \"cart/\".");
        assert!(recorded.mutations.borrow().is_empty());
        assert!(!store.is_committing());
    }

    #[test]
    fn test_strict_store_guards_state() {
        let mut store = counter_store().strict(true);
        assert!(matches!(store.state_mut(), Err(InspectorError::OutsideCommit)));

        store.commit("increment", Some(json!(2))).unwrap();
        assert_eq!(store.state()["count"], json!(2));
        assert!(store.with_commit(|store| store.state_mut().is_ok()));
    }

    #[test]
    fn test_module_state_missing() {
        let store = counter_store();
        assert!(matches!(
            store.module_state("nope/"),
            Err(InspectorError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn test_action_context_reads() {
        let mut store = Store::new(
            ModuleDef::new().module(
                "auth",
                ModuleDef::new()
                    .namespaced(true)
                    .state(json!({"user": "ada", "seen": null}))
                    .getter("user", |s| s["user"].clone())
                    .mutation("seen", |s, p| s["seen"] = p.cloned().unwrap_or(Value::Null))
                    .action("check", |ctx, _| {
                        let user = ctx.getter("user").unwrap_or(Value::Null);
                        assert_eq!(ctx.state().map(|s| s["user"].clone()), Some(user.clone()));
                        assert!(ctx.root_state().get("auth").is_some());
                        ctx.commit("seen", Some(user))
                    }),
            ),
        );
        store.dispatch("auth/check", None).unwrap();
        assert_eq!(store.state()["auth"]["seen"], json!("ada"));
    }
}
