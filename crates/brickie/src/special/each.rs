use serde_json::{Map, Value};

use crate::component::{Component, Context, downcast};
use crate::vnode::{Props, VNode};

use super::{render_kids, string, value};

/// `ForEach`: renders `template` once per element of `items`, each time in a
/// fork of the scope binding the element under the name given by `as`.
///
/// ```json
/// { "type": "ForEach", "items": "{todos}", "as": "todo",
///   "template": { "type": "Text", "content": "{todo.title}" } }
/// ```
///
/// Each element's output is grouped in a fragment keyed by the element's own
/// `id`/`key` field when it has one, else by its index, so repeated template
/// ids stay unique in the rendered tree.
pub struct ForEach {
    props: Props,
}

impl ForEach {
    pub fn new(props: Props) -> Self {
        Self { props }
    }
}

fn item_key(item: &Value, index: usize) -> String {
    let own = item
        .as_object()
        .and_then(|m| m.get("id").or_else(|| m.get("key")))
        .and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    match own {
        Some(k) => format!("#{k}"),
        None => format!("#{index}"),
    }
}

impl Component for ForEach {
    fn name(&self) -> &'static str {
        "ForEach"
    }

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        self.props = downcast::<ForEach>(next)?.props;
        Ok(())
    }

    fn render(&mut self, _cx: &Context) -> Vec<VNode> {
        let (Some(kids), Some(Value::Array(items)), Some(binding), Some(template)) = (
            render_kids(&self.props),
            value(&self.props, "items"),
            string(&self.props, "as"),
            value(&self.props, "template"),
        ) else {
            return Vec::new();
        };

        let mut seen = std::collections::HashSet::new();
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut bindings = Map::new();
                bindings.insert(binding.to_string(), item.clone());
                let mut key = item_key(item, index);
                // Duplicate element ids fall back to the index.
                if !seen.insert(key.clone()) {
                    key = format!("#{index}@dup");
                }
                VNode::fragment(key, kids.render_with(template, "ForEach", bindings))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::host::Host;
    use crate::output;
    use crate::vnode::{Prop, RENDER_KIDS, RenderKids};

    /// Records every binding set it is asked to render with.
    fn recorder(log: Rc<RefCell<Vec<Value>>>) -> Prop {
        Prop::RenderKids(RenderKids::new(move |_, bindings| {
            let bound = bindings.map(|(_, b)| Value::Object(b)).unwrap_or(Value::Null);
            log.borrow_mut().push(bound.clone());
            vec![VNode::Primitive(bound)]
        }))
    }

    fn props(items: Value, log: Rc<RefCell<Vec<Value>>>) -> Props {
        let mut props = Props::new();
        props.insert(RENDER_KIDS.to_string(), recorder(log));
        props.insert("items".to_string(), items.into());
        props.insert("as".to_string(), json!("item").into());
        props.insert("template".to_string(), json!({ "type": "Text" }).into());
        props
    }

    #[test]
    fn renders_once_per_item_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut host = Host::new();
        host.render(vec![VNode::component(ForEach::new(props(json!(["a", "b", "c"]), log.clone())))]);

        assert_eq!(
            *log.borrow(),
            vec![json!({ "item": "a" }), json!({ "item": "b" }), json!({ "item": "c" })]
        );
    }

    #[test]
    fn empty_or_absent_items_render_nothing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut host = Host::new();
        host.render(vec![VNode::component(ForEach::new(props(json!([]), log.clone())))]);
        host.render(vec![VNode::component(ForEach::new(props(Value::Null, log.clone())))]);

        assert!(log.borrow().is_empty());
        assert!(output::text(&host.snapshot()).is_empty());
    }

    #[test]
    fn missing_binding_name_renders_nothing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut p = props(json!([1]), log.clone());
        p.remove("as");
        let mut host = Host::new();
        host.render(vec![VNode::component(ForEach::new(p))]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn item_keys_prefer_element_ids() {
        assert_eq!(item_key(&json!({ "id": "u1" }), 0), "#u1");
        assert_eq!(item_key(&json!({ "key": 7 }), 0), "#7");
        assert_eq!(item_key(&json!("plain"), 3), "#3");
    }
}
