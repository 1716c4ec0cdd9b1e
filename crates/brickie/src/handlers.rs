use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::vnode::Handler;

/// Where handler props find their functions: a layout writes
/// `"onClick": "save"` and the source is asked for `"save"`.
pub trait HandlerSource {
    fn handler(&self, id: &str) -> Option<Handler>;
}

/// Map-backed [`HandlerSource`].
///
/// ```rust
/// use brickie::{HandlerSource, Handlers};
///
/// let handlers = Handlers::new().on("save", |args| println!("saving {:?}", args));
/// assert!(handlers.handler("save").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Handlers {
    map: HashMap<String, Handler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, id: impl Into<String>, f: impl Fn(&[Value]) + 'static) -> Self {
        self.map.insert(id.into(), Handler::new(f));
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, handler: Handler) {
        self.map.insert(id.into(), handler);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl HandlerSource for Handlers {
    fn handler(&self, id: &str) -> Option<Handler> {
        self.map.get(id).cloned()
    }
}

impl<F> HandlerSource for F
where
    F: Fn(&str) -> Option<Handler>,
{
    fn handler(&self, id: &str) -> Option<Handler> {
        self(id)
    }
}

/// Handlers bound so far, keyed by id.
///
/// Repeated renders hand out the same [`Handler`] for the same id, so props
/// stay pointer-equal between passes. Swapping the source drops every
/// binding.
pub(crate) struct HandlerCache {
    source: RefCell<Option<Rc<dyn HandlerSource>>>,
    bound: RefCell<HashMap<String, Option<Handler>>>,
}

impl HandlerCache {
    pub fn new(source: Option<Rc<dyn HandlerSource>>) -> Self {
        Self { source: RefCell::new(source), bound: RefCell::new(HashMap::new()) }
    }

    pub fn get(&self, id: &str) -> Option<Handler> {
        if let Some(cached) = self.bound.borrow().get(id) {
            return cached.clone();
        }
        let source = self.source.borrow().clone();
        let resolved = source.and_then(|s| s.handler(id));
        self.bound.borrow_mut().insert(id.to_string(), resolved.clone());
        resolved
    }

    pub fn replace(&self, source: Option<Rc<dyn HandlerSource>>) {
        *self.source.borrow_mut() = source;
        self.bound.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.bound.borrow().len()
    }
}
