//! One in-place pass over a layout before it is rendered.
//!
//! Every typed brick gets an `id` if it lacks one, an up-to-date
//! `_expressions` marker, and (for form fields) the name of the form
//! container it sits in. Running the pass again over its own output changes
//! nothing.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::brick::{self, Brick, is_expression, is_handler_name, is_meta_field};
use crate::registry::Registry;
use crate::special::SpecialKind;

/// Options for [`annotate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Generated ids look like `{key_prefix}-{n}`.
    pub key_prefix: String,
    /// Form name inherited by top-level form fields.
    pub form_name: Option<String>,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self { key_prefix: "brick".to_string(), form_name: None }
    }
}

impl AnnotateOptions {
    pub fn key_prefix(mut self, v: impl Into<String>) -> Self { self.key_prefix = v.into(); self }
    pub fn form_name(mut self, v: impl Into<String>) -> Self { self.form_name = Some(v.into()); self }
}

/// Annotate `tree` in place. Non-container values are left untouched.
///
/// ```rust
/// use brickie::{AnnotateOptions, Registry, annotate};
/// use serde_json::json;
///
/// let mut tree = json!({ "type": "Text", "content": "{greeting}" });
/// annotate(&mut tree, &Registry::new(), &AnnotateOptions::default());
/// assert_eq!(tree["id"], "brick-1");
/// assert_eq!(tree["_expressions"], json!(["content"]));
/// ```
pub fn annotate(tree: &mut Value, registry: &Registry, options: &AnnotateOptions) {
    let mut taken = HashSet::new();
    collect_ids(tree, &mut taken);
    let mut pass = Annotator { registry, prefix: &options.key_prefix, counter: 0, taken };
    pass.value(tree, options.form_name.as_deref());
}

struct Annotator<'a> {
    registry: &'a Registry,
    prefix: &'a str,
    counter: usize,
    /// Ids present before the pass plus those handed out so far.
    taken: HashSet<String>,
}

impl Annotator<'_> {
    fn value(&mut self, value: &mut Value, form: Option<&str>) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.value(item, form);
                }
            }
            Value::Object(map) if Brick::new(map).type_name().is_some() => self.node(map, form),
            // An untyped object groups named sub-trees, e.g. a slot map.
            Value::Object(map) => {
                for (_, subtree) in map.iter_mut() {
                    self.value(subtree, form);
                }
            }
            _ => {}
        }
    }

    fn node(&mut self, map: &mut Map<String, Value>, form: Option<&str>) {
        self.identify(map);
        mark_expressions(map);

        let view = Brick::new(map);
        let type_name = view.type_name().unwrap_or_default().to_string();
        let own_name = view.name().map(str::to_string);
        let has_form = view.form().is_some_and(|f| !f.is_empty());

        let child_form = match own_name {
            Some(name) if self.registry.is_form_container(&type_name) => Some(name),
            _ => form.map(str::to_string),
        };
        if self.registry.is_form_field(&type_name) && !has_form {
            if let Some(inherited) = form {
                map.insert(brick::FORM.to_string(), Value::String(inherited.to_string()));
            }
        }

        let mut nested: Vec<String> = vec![brick::CHILDREN.to_string()];
        match SpecialKind::resolve(&type_name) {
            Some(kind) => nested.extend(kind.nested_attributes(map)),
            None => {
                if let Some(config) = self.registry.resolve(&type_name) {
                    nested.extend(config.child_attributes.iter().cloned());
                }
            }
        }
        for attribute in nested {
            if let Some(subtree) = map.get_mut(&attribute) {
                self.value(subtree, child_form.as_deref());
            }
        }
    }

    /// Give the node an id unless it already has a usable one.
    fn identify(&mut self, map: &mut Map<String, Value>) {
        match map.get(brick::ID) {
            Some(Value::String(id)) if !id.is_empty() => return,
            Some(Value::Number(n)) => {
                let id = n.to_string();
                map.insert(brick::ID.to_string(), Value::String(id));
                return;
            }
            _ => {}
        }
        let id = loop {
            self.counter += 1;
            let candidate = format!("{}-{}", self.prefix, self.counter);
            if self.taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        map.insert(brick::ID.to_string(), Value::String(id));
    }
}

/// Recompute `_expressions` from the node's current properties.
fn mark_expressions(map: &mut Map<String, Value>) {
    let marked: Vec<Value> = map
        .iter()
        .filter(|(key, _)| is_dynamic_candidate(key))
        .filter(|(_, value)| value.as_str().is_some_and(is_expression))
        .map(|(key, _)| Value::String(key.clone()))
        .collect();
    if marked.is_empty() {
        map.remove(brick::EXPRESSIONS);
    } else {
        map.insert(brick::EXPRESSIONS.to_string(), Value::Array(marked));
    }
}

/// Handler props name handler ids, and `id`/`form` are bookkeeping; none of
/// them is ever evaluated. `children` is the one meta field that may be.
fn is_dynamic_candidate(key: &str) -> bool {
    if key == brick::CHILDREN {
        return true;
    }
    !is_meta_field(key) && !is_handler_name(key) && key != brick::ID && key != brick::FORM
}

fn collect_ids(value: &Value, taken: &mut HashSet<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_ids(item, taken)),
        Value::Object(map) => {
            match map.get(brick::ID) {
                Some(Value::String(id)) => { taken.insert(id.clone()); }
                Some(Value::Number(n)) => { taken.insert(n.to_string()); }
                _ => {}
            }
            map.values().for_each(|v| collect_ids(v, taken));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::registry::HandlerConfig;
    use crate::vnode::Constructor;

    fn run(tree: &mut Value, registry: &Registry) {
        annotate(tree, registry, &AnnotateOptions::default());
    }

    #[test]
    fn assigns_ids_depth_first() {
        let mut tree = json!({ "type": "Box", "children": [ { "type": "Text" }, { "type": "Text", "id": "keep" } ] });
        run(&mut tree, &Registry::new());
        assert_eq!(tree["id"], "brick-1");
        assert_eq!(tree["children"][0]["id"], "brick-2");
        assert_eq!(tree["children"][1]["id"], "keep");
    }

    #[test]
    fn generated_ids_skip_existing_ones() {
        let mut tree = json!([ { "type": "A" }, { "type": "B", "id": "brick-1" } ]);
        run(&mut tree, &Registry::new());
        assert_eq!(tree[0]["id"], "brick-2");
    }

    #[test]
    fn custom_prefix() {
        let mut tree = json!({ "type": "A" });
        annotate(&mut tree, &Registry::new(), &AnnotateOptions::default().key_prefix("ui"));
        assert_eq!(tree["id"], "ui-1");
    }

    #[test]
    fn numeric_ids_become_strings() {
        let mut tree = json!({ "type": "A", "id": 7 });
        run(&mut tree, &Registry::new());
        assert_eq!(tree["id"], "7");
    }

    #[test]
    fn is_idempotent() {
        let mut registry = Registry::new();
        registry.register_form_container("Form", Vec::<String>::new()).unwrap();
        registry.register_form_field("Input", [("onChange", HandlerConfig::default())]).unwrap();
        let mut tree = json!({
            "type": "Form", "name": "login",
            "children": [
                { "type": "Input", "name": "user", "value": "{login.user}", "onChange": "typed" },
                { "type": "If", "condition": "{ok}", "then": { "type": "Text", "content": "{msg}" } },
            ],
        });
        run(&mut tree, &registry);
        let once = tree.clone();
        run(&mut tree, &registry);
        assert_eq!(tree, once);
    }

    #[test]
    fn stale_markers_are_recomputed() {
        let mut tree = json!({ "type": "Text", "content": "{a}", "title": "{b}" });
        run(&mut tree, &Registry::new());
        assert_eq!(tree["_expressions"], json!(["content", "title"]));

        tree["title"] = json!("plain");
        run(&mut tree, &Registry::new());
        assert_eq!(tree["_expressions"], json!(["content"]));

        tree["content"] = json!(3);
        run(&mut tree, &Registry::new());
        assert!(tree.get("_expressions").is_none());
    }

    #[test]
    fn handlers_and_bookkeeping_are_never_marked() {
        let mut tree = json!({ "type": "Button", "onClick": "{save}", "id": "{x}", "children": "{label}" });
        run(&mut tree, &Registry::new());
        assert_eq!(tree["_expressions"], json!(["children"]));
    }

    #[test]
    fn special_child_attributes_are_annotated() {
        let mut tree = json!({
            "type": "Slot", "slot": "a",
            "slots": { "a": { "type": "Text", "content": "{x}" }, "b": [ { "type": "Text" } ] },
        });
        run(&mut tree, &Registry::new());
        assert_eq!(tree["slots"]["a"]["_expressions"], json!(["content"]));
        assert!(tree["slots"]["b"][0]["id"].is_string());
    }

    #[test]
    fn registered_child_attributes_are_annotated() {
        let mut registry = Registry::new();
        registry.register_with_children("Card", Constructor::element("card"), ["header"]).unwrap();
        let mut tree = json!({ "type": "Card", "header": { "type": "Text" }, "other": { "type": "Text" } });
        run(&mut tree, &registry);
        assert!(tree["header"]["id"].is_string());
        assert!(tree["other"].get("id").is_none());
    }

    #[test]
    fn form_name_flows_to_fields() {
        let mut registry = Registry::new();
        registry.register_form_container("Form", Vec::<String>::new()).unwrap();
        registry.register_form_field("Input", [("onChange", HandlerConfig::default())]).unwrap();
        let mut tree = json!({
            "type": "Form", "name": "login",
            "children": [
                { "type": "Box", "children": { "type": "Input", "name": "user" } },
                { "type": "Input", "name": "other", "form": "explicit" },
            ],
        });
        run(&mut tree, &registry);
        assert_eq!(tree["children"][0]["children"]["form"], "login");
        assert_eq!(tree["children"][1]["form"], "explicit");
        assert!(tree.get("form").is_none());
    }

    #[test]
    fn inherited_form_name_from_options() {
        let mut registry = Registry::new();
        registry.register_form_field("Input", [("onChange", HandlerConfig::default())]).unwrap();
        let mut tree = json!([ { "type": "Input", "name": "a" } ]);
        annotate(&mut tree, &registry, &AnnotateOptions::default().form_name("outer"));
        assert_eq!(tree[0]["form"], "outer");
    }

    #[test]
    fn primitives_are_unchanged() {
        let mut tree = json!("text");
        run(&mut tree, &Registry::new());
        assert_eq!(tree, json!("text"));
    }
}
