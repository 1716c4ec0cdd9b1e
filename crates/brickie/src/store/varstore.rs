use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::{Scope, ScopeRef, Subscriber, path_segments};

struct Level {
    label: String,
    values: RefCell<Map<String, Value>>,
    subscribers: RefCell<HashMap<String, Vec<Subscriber>>>,
    parent: Option<VarStore>,
}

/// Reference [`Scope`] implementation: a tree of variable maps.
///
/// The root level owns every name that is not bound by a fork. A fork owns
/// only the names it was created with; reads, writes and subscriptions for
/// anything else go to its parent. `VarStore` is a cheap handle and clones
/// share state.
///
/// ```rust
/// use brickie::store::{Scope, VarStore};
/// use serde_json::json;
///
/// let store = VarStore::from_json(json!({ "greeting": "hi" }));
/// store.set_value("user.name", json!("Ada"));
/// assert_eq!(store.evaluate("greeting + ', ' + user.name").unwrap(), json!("hi, Ada"));
/// ```
#[derive(Clone)]
pub struct VarStore(Rc<Level>);

impl VarStore {
    pub fn new() -> Self {
        Self::with_values(Map::new())
    }

    pub fn with_values(values: Map<String, Value>) -> Self {
        Self(Rc::new(Level {
            label: "root".to_string(),
            values: RefCell::new(values),
            subscribers: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Root store from a JSON object; any other value yields an empty store.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::with_values(map),
            _ => Self::new(),
        }
    }

    /// This store as a shared [`ScopeRef`].
    pub fn scope(&self) -> ScopeRef {
        Rc::new(self.clone())
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Shallow copy of the variables bound at this level.
    pub fn values(&self) -> Map<String, Value> {
        self.0.values.borrow().clone()
    }

    /// Number of callbacks subscribed to `name`, counted where `name` lives.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.owner(name)
            .0
            .subscribers
            .borrow()
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Total subscriptions held at this level across all names.
    pub fn total_subscriptions(&self) -> usize {
        self.0.subscribers.borrow().values().map(Vec::len).sum()
    }

    /// The level that owns `name`: the nearest fork binding it, else the root.
    fn owner(&self, name: &str) -> &VarStore {
        let mut level = self;
        while let Some(parent) = &level.0.parent {
            if level.0.values.borrow().contains_key(name) {
                break;
            }
            level = parent;
        }
        level
    }

    fn notify(&self, name: &str) {
        let Some(subscribers) = self.0.subscribers.borrow().get(name).cloned() else {
            return;
        };
        let value = self.0.values.borrow().get(name).cloned().unwrap_or(Value::Null);
        // Borrows are released here; callbacks may read or write the store.
        for subscriber in subscribers {
            subscriber.notify(name, &value);
        }
    }
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarStore")
            .field("label", &self.0.label)
            .field("values", &self.0.values.borrow())
            .field("forked", &self.0.parent.is_some())
            .finish()
    }
}

impl Scope for VarStore {
    fn lookup(&self, name: &str) -> Option<Value> {
        let owner = self.owner(name);
        let found = owner.0.values.borrow().get(name).cloned();
        found
    }

    fn subscribe(&self, name: &str, subscriber: &Subscriber) {
        let owner = self.owner(name);
        let mut subscribers = owner.0.subscribers.borrow_mut();
        let list = subscribers.entry(name.to_string()).or_default();
        if !list.iter().any(|s| s.same(subscriber)) {
            list.push(subscriber.clone());
        }
    }

    fn unsubscribe(&self, name: &str, subscriber: &Subscriber) {
        let owner = self.owner(name);
        let mut subscribers = owner.0.subscribers.borrow_mut();
        if let Some(list) = subscribers.get_mut(name) {
            list.retain(|s| !s.same(subscriber));
            if list.is_empty() {
                subscribers.remove(name);
            }
        }
    }

    fn fork(&self, label: &str, bindings: Map<String, Value>) -> ScopeRef {
        Rc::new(VarStore(Rc::new(Level {
            label: label.to_string(),
            values: RefCell::new(bindings),
            subscribers: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        })))
    }

    fn set_value(&self, path: &str, value: Value) {
        let segments = path_segments(path);
        let Some((root, rest)) = segments.split_first() else {
            log::warn!("ignoring write to empty path");
            return;
        };
        let owner = self.owner(root);
        log::debug!("set {} = {} (scope '{}')", path, value, owner.0.label);
        {
            let mut values = owner.0.values.borrow_mut();
            if rest.is_empty() {
                values.insert(root.to_string(), value);
            } else {
                let slot = values.entry(root.to_string()).or_insert(Value::Null);
                write_path(slot, rest, value);
            }
        }
        owner.notify(root);
    }
}

/// Write `value` under `segments`, replacing non-container intermediates with objects.
fn write_path(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    if let Value::Array(items) = slot {
        if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            write_path(item, rest, value);
            return;
        }
    }
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        write_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    fn counter() -> (Subscriber, Rc<Cell<usize>>) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (Subscriber::new(move |_, _| h.set(h.get() + 1)), hits)
    }

    #[test]
    fn set_value_creates_nested_objects() {
        let store = VarStore::new();
        store.set_value("login.username", json!("ada"));
        assert_eq!(store.lookup("login"), Some(json!({ "username": "ada" })));
    }

    #[test]
    fn set_value_overwrites_scalar_intermediate() {
        let store = VarStore::from_json(json!({ "login": 5 }));
        store.set_value("login.username", json!("ada"));
        assert_eq!(store.lookup("login"), Some(json!({ "username": "ada" })));
    }

    #[test]
    fn set_value_writes_into_array() {
        let store = VarStore::from_json(json!({ "rows": [{ "n": 1 }, { "n": 2 }] }));
        store.set_value("rows.1.n", json!(20));
        assert_eq!(store.lookup("rows"), Some(json!([{ "n": 1 }, { "n": 20 }])));
    }

    #[test]
    fn subscribers_fire_on_root_name() {
        let store = VarStore::new();
        let (sub, hits) = counter();
        store.subscribe("login", &sub);
        store.set_value("login.username", json!("ada"));
        store.set_value("other", json!(1));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unsubscribe_matches_identity() {
        let store = VarStore::new();
        let (a, a_hits) = counter();
        let (b, b_hits) = counter();
        store.subscribe("x", &a);
        store.subscribe("x", &b);
        store.unsubscribe("x", &a);
        store.set_value("x", json!(1));
        assert_eq!(a_hits.get(), 0);
        assert_eq!(b_hits.get(), 1);
        assert_eq!(store.subscriber_count("x"), 1);
    }

    #[test]
    fn double_subscribe_is_one_subscription() {
        let store = VarStore::new();
        let (sub, _) = counter();
        store.subscribe("x", &sub);
        store.subscribe("x", &sub);
        assert_eq!(store.subscriber_count("x"), 1);
        store.unsubscribe("x", &sub);
        assert_eq!(store.total_subscriptions(), 0);
    }

    #[test]
    fn fork_shadows_and_delegates() {
        let store = VarStore::from_json(json!({ "item": "outer", "title": "T" }));
        let fork = store.fork("loop", json!({ "item": "inner" }).as_object().unwrap().clone());
        assert_eq!(fork.lookup("item"), Some(json!("inner")));
        assert_eq!(fork.lookup("title"), Some(json!("T")));
        assert_eq!(store.lookup("item"), Some(json!("outer")));

        fork.set_value("title", json!("changed"));
        assert_eq!(store.lookup("title"), Some(json!("changed")));
    }

    #[test]
    fn fork_subscriptions_land_on_owner() {
        let store = VarStore::new();
        let fork = store.fork("loop", json!({ "item": 1 }).as_object().unwrap().clone());
        let (sub, hits) = counter();
        fork.subscribe("title", &sub);
        fork.subscribe("item", &sub);
        assert_eq!(store.subscriber_count("title"), 1);

        store.set_value("title", json!("x"));
        assert_eq!(hits.get(), 1);
        fork.unsubscribe("title", &sub);
        assert_eq!(store.subscriber_count("title"), 0);
    }

    #[test]
    fn subscriber_may_write_back() {
        let store = VarStore::new();
        let inner = store.clone();
        let sub = Subscriber::new(move |_, v| {
            if v == &json!(1) {
                inner.set_value("mirror", json!("seen"));
            }
        });
        store.subscribe("x", &sub);
        store.set_value("x", json!(1));
        assert_eq!(store.lookup("mirror"), Some(json!("seen")));
    }

    #[test]
    fn evaluate_reads_through_forks() {
        let store = VarStore::from_json(json!({ "n": 2 }));
        let fork = store.fork("loop", json!({ "m": 3 }).as_object().unwrap().clone());
        assert_eq!(fork.evaluate("n * m").unwrap(), json!(6));
    }
}
