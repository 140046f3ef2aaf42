//! Per-namespace views over the flat getters table.
//!
//! A view binds local names to fully-qualified getter names and reads
//! through to the [`GetterSource`] on every access, so it never holds a
//! stale value. Views are created on first request and kept for the life of
//! the store; they are not rebuilt if modules are added later.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::path::{self, ROOT_ID};
use crate::store::GetterSource;

/// Local name -> fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GetterBinding {
    local: String,
    qualified: String,
}

#[derive(Debug)]
pub struct LocalGetters {
    namespace: String,
    bindings: Vec<GetterBinding>,
}

impl LocalGetters {
    /// Bind every getter visible from `namespace`.
    ///
    /// The root sees only the getters declared on the root module. Any other
    /// namespace sees each flat getter whose name starts with the namespace
    /// path, under the remainder of the name.
    pub fn build(namespace: &str, source: &dyn GetterSource) -> Self {
        let bindings = if path::is_root(namespace) {
            source
                .root_getter_names()
                .into_iter()
                .map(|name| GetterBinding {
                    local: name.clone(),
                    qualified: name,
                })
                .collect()
        } else {
            source
                .getter_names()
                .into_iter()
                .filter_map(|qualified| {
                    let local = qualified.strip_prefix(namespace)?.to_string();
                    Some(GetterBinding { local, qualified })
                })
                .collect()
        };

        Self {
            namespace: namespace.to_string(),
            bindings,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.local.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bindings.iter().any(|b| b.local == key)
    }

    /// Read one getter through to the source.
    pub fn get(&self, source: &dyn GetterSource, key: &str) -> Option<Value> {
        let binding = self.bindings.iter().find(|b| b.local == key)?;
        source.evaluate(&binding.qualified)
    }

    /// Read every bound getter now, in binding order.
    pub fn entries(&self, source: &dyn GetterSource) -> Vec<(String, Value)> {
        self.bindings
            .iter()
            .map(|b| {
                let value = source.evaluate(&b.qualified).unwrap_or(Value::Null);
                (b.local.clone(), value)
            })
            .collect()
    }
}

/// Append-only namespace -> view cache.
#[derive(Debug, Default)]
pub struct LocalGettersCache {
    views: RefCell<HashMap<String, Rc<LocalGetters>>>,
}

impl LocalGettersCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the view for `namespace`, building it on first request.
    /// `""` and `"root"` share the root entry.
    pub fn resolve(&self, namespace: &str, source: &dyn GetterSource) -> Rc<LocalGetters> {
        let key = if path::is_root(namespace) {
            ROOT_ID
        } else {
            namespace
        };

        let cached = self.views.borrow().get(key).cloned();
        if let Some(view) = cached {
            return view;
        }

        let view = Rc::new(LocalGetters::build(key, source));
        debug!(namespace = %key, getters = view.len(), "local getters view created");
        self.views
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&view));
        view
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.views.borrow().contains_key(namespace)
    }

    pub fn len(&self) -> usize {
        self.views.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.borrow().is_empty()
    }
}
