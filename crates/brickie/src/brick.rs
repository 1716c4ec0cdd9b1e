//! The input data model: a brick is a JSON object naming a renderable type.
//!
//! ```json
//! { "type": "Text", "id": "greeting", "content": "{greeting}", "children": [] }
//! ```
//!
//! A handful of keys carry meaning to the interpreter itself; everything else
//! is an open property bag resolved at render time.

use serde_json::{Map, Value};

// ── Meta fields ───────────────────────────────────────────────────────────

/// The renderable type name.
pub const TYPE: &str = "type";
/// Legacy spelling of [`TYPE`].
pub const BRICK: &str = "brick";
/// Nested brick(s) rendered as the node's children.
pub const CHILDREN: &str = "children";
/// Stable identity, assigned by the annotator when absent.
pub const ID: &str = "id";
/// Annotation marker: names of properties that hold expressions.
pub const EXPRESSIONS: &str = "_expressions";
/// Form name on form-field bricks, explicit or inherited from a container.
pub const FORM: &str = "form";
/// Name of a form container or of a form field.
pub const NAME: &str = "name";
/// Generic class property renamed to the platform class-list attribute.
pub const CLASS: &str = "class";

/// Keys that never become rendered properties.
pub fn is_meta_field(key: &str) -> bool {
    matches!(key, TYPE | BRICK | CHILDREN | EXPRESSIONS)
}

// ── Expression predicate ──────────────────────────────────────────────────

/// `true` when `raw`, once trimmed, is at least two characters long and is
/// wrapped in a single pair of braces: `"{a}"`, `" {a + 1} "`, `"{}"`.
pub fn is_expression(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// The expression text inside the braces, or `None` for plain strings.
pub fn expression_text(raw: &str) -> Option<&str> {
    if !is_expression(raw) {
        return None;
    }
    let trimmed = raw.trim();
    Some(&trimmed[1..trimmed.len() - 1])
}

/// Event handler props follow the `onEvent` / `on-event` / `on_event` convention.
pub fn is_handler_name(key: &str) -> bool {
    let mut chars = key.chars();
    if chars.next() != Some('o') || chars.next() != Some('n') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '-' || c == '_')
}

// ── Brick view ────────────────────────────────────────────────────────────

/// Borrowed, typed view over one brick object.
#[derive(Debug, Clone, Copy)]
pub struct Brick<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Brick<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// View `value` as a brick if it is an object.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    /// The trimmed type name; `None` when missing, empty, or not a string.
    pub fn type_name(&self) -> Option<&'a str> {
        self.map
            .get(TYPE)
            .or_else(|| self.map.get(BRICK))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn id(&self) -> Option<&'a str> {
        self.map.get(ID).and_then(Value::as_str)
    }

    pub fn children(&self) -> Option<&'a Value> {
        self.map.get(CHILDREN)
    }

    pub fn form(&self) -> Option<&'a str> {
        self.map.get(FORM).and_then(Value::as_str)
    }

    /// Literal `name` property, ignoring expression-valued names.
    pub fn name(&self) -> Option<&'a str> {
        self.map
            .get(NAME)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty() && !is_expression(s))
    }

    /// Property names the annotator marked as expressions.
    pub fn expressions(&self) -> Vec<&'a str> {
        match self.map.get(EXPRESSIONS) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    /// Every non-meta property, in declaration order.
    pub fn props(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map.iter().filter(|(k, _)| !is_meta_field(k))
    }

    pub fn as_map(&self) -> &'a Map<String, Value> {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn expression_requires_both_braces() {
        assert!(is_expression("{a}"));
        assert!(is_expression("  {a + 1}\n"));
        assert!(is_expression("{}"));
        assert!(!is_expression("{"));
        assert!(!is_expression("}"));
        assert!(!is_expression("{a"));
        assert!(!is_expression("a}"));
        assert!(!is_expression("x{a}"));
        assert!(!is_expression(""));
    }

    #[test]
    fn expression_text_strips_braces_after_trim() {
        assert_eq!(expression_text(" {user.name} "), Some("user.name"));
        assert_eq!(expression_text("{}"), Some(""));
        assert_eq!(expression_text("plain"), None);
    }

    #[test]
    fn handler_names() {
        assert!(is_handler_name("onClick"));
        assert!(is_handler_name("on-change"));
        assert!(is_handler_name("on_submit"));
        assert!(!is_handler_name("one"));
        assert!(!is_handler_name("online"));
        assert!(!is_handler_name("on"));
        assert!(!is_handler_name("content"));
    }

    #[test]
    fn type_name_falls_back_to_brick_alias() {
        let node = json!({ "brick": " Button " });
        assert_eq!(Brick::from_value(&node).unwrap().type_name(), Some("Button"));
    }

    #[test]
    fn blank_type_name_is_missing() {
        let node = json!({ "type": "  " });
        assert_eq!(Brick::from_value(&node).unwrap().type_name(), None);
    }

    #[test]
    fn props_skip_meta_fields() {
        let node = json!({ "type": "Text", "children": [], "_expressions": ["a"], "a": "{x}", "id": "t" });
        let keys: Vec<_> = Brick::from_value(&node).unwrap().props().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "id"]);
    }
}
