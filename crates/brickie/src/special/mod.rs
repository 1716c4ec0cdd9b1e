//! Control-flow bricks implemented by the core: `If`, `ForEach`, `Fetch`, `Slot`.
//!
//! Each receives a [`RenderKids`](crate::vnode::RenderKids) callback in its
//! props and uses it to render the sub-trees it declares.

mod conditional;
mod each;
mod fetch;
mod slot;

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::store::ScopeRef;
use crate::transport::Transport;
use crate::vnode::{Prop, Props, RENDER_KIDS, RenderKids, VNode};

pub use conditional::Conditional;
pub use each::ForEach;
pub use fetch::{Fetch, FetchState};
pub use slot::Slot;

/// The built-in special bricks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKind {
    If,
    ForEach,
    Fetch,
    Slot,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 4] = [SpecialKind::If, SpecialKind::ForEach, SpecialKind::Fetch, SpecialKind::Slot];

    pub fn name(self) -> &'static str {
        match self {
            SpecialKind::If => "If",
            SpecialKind::ForEach => "ForEach",
            SpecialKind::Fetch => "Fetch",
            SpecialKind::Slot => "Slot",
        }
    }

    /// Case-insensitive lookup, accepting the older `IfClause`, `ForLoop`,
    /// `Http` and `Fit` spellings.
    pub fn resolve(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "if" | "ifclause" => Some(SpecialKind::If),
            "foreach" | "forloop" => Some(SpecialKind::ForEach),
            "fetch" | "http" => Some(SpecialKind::Fetch),
            "slot" | "fit" => Some(SpecialKind::Slot),
            _ => None,
        }
    }

    /// Attributes holding nested brick trees.
    pub fn child_attributes(self) -> &'static [&'static str] {
        match self {
            SpecialKind::If => &["then", "else"],
            SpecialKind::ForEach => &["template"],
            SpecialKind::Fetch => &["loading", "load", "success", "error"],
            SpecialKind::Slot => &["slots"],
        }
    }

    /// [`child_attributes`](Self::child_attributes) plus the attribute a
    /// `Slot` names through `slotKey`.
    pub fn nested_attributes(self, brick: &Map<String, Value>) -> Vec<String> {
        let mut nested: Vec<String> = self.child_attributes().iter().map(|a| a.to_string()).collect();
        if self == SpecialKind::Slot {
            if let Some(Value::String(named)) = brick.get(SLOT_KEY) {
                if !named.is_empty() && !nested.contains(named) {
                    nested.push(named.clone());
                }
            }
        }
        nested
    }
}

/// `Slot` property naming another property to render.
pub const SLOT_KEY: &str = "slotKey";

/// What special bricks need beyond their props.
#[derive(Clone, Default)]
pub(crate) struct SpecialEnv {
    pub transport: Option<Rc<dyn Transport>>,
}

/// Build the component for a special brick.
pub(crate) fn create(kind: SpecialKind, props: Props, scope: &ScopeRef, env: &SpecialEnv) -> VNode {
    match kind {
        SpecialKind::If => VNode::component(Conditional::new(props)),
        SpecialKind::ForEach => VNode::component(ForEach::new(props)),
        SpecialKind::Fetch => VNode::component(Fetch::new(props, scope.clone(), env.transport.clone())),
        SpecialKind::Slot => VNode::component(Slot::new(props)),
    }
}

// ── prop helpers shared by the special bricks ─────────────────────────────

fn render_kids(props: &Props) -> Option<&RenderKids> {
    props.get(RENDER_KIDS).and_then(Prop::as_render_kids)
}

fn value<'p>(props: &'p Props, key: &str) -> Option<&'p Value> {
    props.get(key).and_then(Prop::as_value).filter(|v| !v.is_null())
}

fn string<'p>(props: &'p Props, key: &str) -> Option<&'p str> {
    value(props, key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Render `key`'s sub-tree, if both it and the callback are present.
fn render_attr(props: &Props, key: &str) -> Vec<VNode> {
    match (render_kids(props), value(props, key)) {
        (Some(kids), Some(tree)) => kids.render(tree),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(SpecialKind::resolve("if"), Some(SpecialKind::If));
        assert_eq!(SpecialKind::resolve("FOREACH"), Some(SpecialKind::ForEach));
        assert_eq!(SpecialKind::resolve("Http"), Some(SpecialKind::Fetch));
        assert_eq!(SpecialKind::resolve("fit"), Some(SpecialKind::Slot));
        assert_eq!(SpecialKind::resolve("Text"), None);
    }

    #[test]
    fn slot_key_names_an_extra_nested_attribute() {
        let brick = serde_json::json!({ "type": "Fit", "slotKey": "header", "header": "HEAD" });
        let brick = brick.as_object().unwrap();
        assert_eq!(SpecialKind::Slot.nested_attributes(brick), vec!["slots", "header"]);
        assert_eq!(SpecialKind::If.nested_attributes(brick), vec!["then", "else"]);
    }

    #[test]
    fn every_kind_resolves_by_its_name() {
        for kind in SpecialKind::ALL {
            assert_eq!(SpecialKind::resolve(kind.name()), Some(kind));
        }
    }
}
