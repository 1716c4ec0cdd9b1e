use crate::component::{Component, Context, downcast};
use crate::vnode::{Props, VNode};

use super::{SLOT_KEY, render_kids, string, value};

/// `Slot`: renders the entry of `slots` named by `slot`.
///
/// ```json
/// { "type": "Slot", "slot": "{mode}",
///   "slots": { "view": { "type": "Text" }, "edit": { "type": "Input" } } }
/// ```
///
/// With `slotKey` it renders the property of that name instead:
/// `{ "type": "Fit", "slotKey": "header", "header": { ... } }`.
pub struct Slot {
    props: Props,
}

impl Slot {
    pub fn new(props: Props) -> Self {
        Self { props }
    }
}

impl Component for Slot {
    fn name(&self) -> &'static str {
        "Slot"
    }

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        self.props = downcast::<Slot>(next)?.props;
        Ok(())
    }

    fn render(&mut self, _cx: &Context) -> Vec<VNode> {
        let kids = match string(&self.props, SLOT_KEY) {
            Some(named) => value(&self.props, named),
            None => string(&self.props, "slot").and_then(|name| {
                value(&self.props, "slots")
                    .and_then(|slots| slots.get(name))
                    .filter(|k| !k.is_null())
            }),
        };
        match (render_kids(&self.props), kids) {
            (Some(render), Some(kids)) => render.render(kids),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::host::Host;
    use crate::output;
    use crate::vnode::{Prop, RENDER_KIDS, RenderKids};

    fn render(slot: Option<&str>) -> String {
        let mut props = Props::new();
        props.insert(
            RENDER_KIDS.to_string(),
            Prop::RenderKids(RenderKids::new(|kids, _| vec![VNode::Primitive(kids.clone())])),
        );
        props.insert("slots".to_string(), json!({ "view": "viewing", "edit": "editing" }).into());
        if let Some(s) = slot {
            props.insert("slot".to_string(), Value::from(s).into());
        }
        let mut host = Host::new();
        host.render(vec![VNode::component(Slot::new(props))]);
        output::text(&host.snapshot())
    }

    #[test]
    fn renders_matching_slot() {
        assert_eq!(render(Some("edit")), "editing");
    }

    #[test]
    fn unknown_slot_renders_nothing() {
        assert_eq!(render(Some("delete")), "");
    }

    #[test]
    fn absent_slot_name_renders_nothing() {
        assert_eq!(render(None), "");
    }

    #[test]
    fn slot_key_selects_a_property() {
        let mut props = Props::new();
        props.insert(
            RENDER_KIDS.to_string(),
            Prop::RenderKids(RenderKids::new(|kids, _| vec![VNode::Primitive(kids.clone())])),
        );
        props.insert(SLOT_KEY.to_string(), json!("header").into());
        props.insert("header".to_string(), json!("HEAD").into());
        props.insert("footer".to_string(), json!("FOOT").into());
        let mut host = Host::new();
        host.render(vec![VNode::component(Slot::new(props))]);
        assert_eq!(output::text(&host.snapshot()), "HEAD");
    }
}
