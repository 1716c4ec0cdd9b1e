//! Flattened view of a mounted tree: elements and primitives only.

use serde_json::{Map, Value};

use crate::vnode::{Prop, Props};

/// One node of a host tree snapshot.
#[derive(Debug, Clone)]
pub enum Output {
    Primitive(Value),
    Element(Element),
}

/// A rendered host element.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    /// Identity key, prefixed by any enclosing fragment keys.
    pub key: Option<String>,
    pub props: Props,
    pub children: Vec<Output>,
}

impl Output {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Output::Element(e) => Some(e),
            Output::Primitive(_) => None,
        }
    }

    /// Concatenated text of every primitive in this subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Output::Primitive(Value::String(s)) => out.push_str(s),
            Output::Primitive(other) => out.push_str(&other.to_string()),
            Output::Element(e) => {
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.as_element()?.prop(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.as_element()?.value(name)
    }

    /// Depth-first search for the element with `key`.
    pub fn find(&self, key: &str) -> Option<&Element> {
        match self {
            Output::Primitive(_) => None,
            Output::Element(e) => e.find(key),
        }
    }

    /// JSON rendition for printing; handlers become placeholders.
    pub fn to_json(&self) -> Value {
        match self {
            Output::Primitive(v) => v.clone(),
            Output::Element(e) => e.to_json(),
        }
    }
}

impl Element {
    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.props.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.prop(name).and_then(Prop::as_value)
    }

    pub fn find(&self, key: &str) -> Option<&Element> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    pub fn text(&self) -> String {
        self.children.iter().map(Output::text).collect()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("tag".to_string(), Value::String(self.tag.clone()));
        if let Some(key) = &self.key {
            map.insert("key".to_string(), Value::String(key.clone()));
        }
        let props: Map<String, Value> = self.props.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        if !props.is_empty() {
            map.insert("props".to_string(), Value::Object(props));
        }
        if !self.children.is_empty() {
            map.insert(
                "children".to_string(),
                Value::Array(self.children.iter().map(Output::to_json).collect()),
            );
        }
        Value::Object(map)
    }
}

/// Search a list of roots.
pub fn find<'o>(roots: &'o [Output], key: &str) -> Option<&'o Element> {
    roots.iter().find_map(|r| r.find(key))
}

/// Concatenated text of a list of roots.
pub fn text(roots: &[Output]) -> String {
    roots.iter().map(Output::text).collect()
}
