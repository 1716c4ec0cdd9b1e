//! Renderables produced by the interpreter and consumed by the host.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::component::Component;

// ── Handler ───────────────────────────────────────────────────────────────

/// An event handler bound to a rendered property.
///
/// Arguments are whatever the emitting element passes, as JSON values.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&[Value])>);

impl Handler {
    pub fn new(f: impl Fn(&[Value]) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

// ── RenderKids ────────────────────────────────────────────────────────────

/// Callback handed to special bricks so they can render their own sub-trees.
///
/// It closes over the scope the special brick was rendered in. Passing
/// bindings forks that scope first; the fork is labelled for diagnostics.
#[derive(Clone)]
pub struct RenderKids(Rc<dyn Fn(&Value, Option<(&str, Map<String, Value>)>) -> Vec<VNode>>);

impl RenderKids {
    pub fn new(f: impl Fn(&Value, Option<(&str, Map<String, Value>)>) -> Vec<VNode> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Render `kids` against the captured scope.
    pub fn render(&self, kids: &Value) -> Vec<VNode> {
        (self.0)(kids, None)
    }

    /// Render `kids` against a fork of the captured scope extended with `bindings`.
    pub fn render_with(&self, kids: &Value, label: &str, bindings: Map<String, Value>) -> Vec<VNode> {
        (self.0)(kids, Some((label, bindings)))
    }
}

impl fmt::Debug for RenderKids {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenderKids(..)")
    }
}

// ── Prop ──────────────────────────────────────────────────────────────────

/// Property key under which special bricks receive their [`RenderKids`].
pub const RENDER_KIDS: &str = "renderKids";

/// One computed property of a renderable.
#[derive(Debug, Clone)]
pub enum Prop {
    Value(Value),
    Handler(Handler),
    RenderKids(RenderKids),
}

impl Prop {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Prop::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_render_kids(&self) -> Option<&RenderKids> {
        match self {
            Prop::RenderKids(r) => Some(r),
            _ => None,
        }
    }

    /// JSON stand-in used when printing a tree.
    pub fn to_json(&self) -> Value {
        match self {
            Prop::Value(v) => v.clone(),
            Prop::Handler(_) => Value::String("<handler>".to_string()),
            Prop::RenderKids(_) => Value::String("<render-kids>".to_string()),
        }
    }
}

impl From<Value> for Prop {
    fn from(v: Value) -> Self {
        Prop::Value(v)
    }
}

impl From<Handler> for Prop {
    fn from(h: Handler) -> Self {
        Prop::Handler(h)
    }
}

/// Computed properties, ordered by key.
pub type Props = BTreeMap<String, Prop>;

/// Read a data property.
pub fn prop_value<'p>(props: &'p Props, key: &str) -> Option<&'p Value> {
    props.get(key).and_then(Prop::as_value)
}

// ── VNode ─────────────────────────────────────────────────────────────────

/// A host element: a tag with properties and children.
#[derive(Debug)]
pub struct ElementNode {
    pub tag: String,
    pub key: Option<String>,
    pub props: Props,
    pub children: Vec<VNode>,
}

/// A component instance waiting to be mounted (or to update a mounted one).
pub struct ComponentNode {
    pub key: Option<String>,
    pub component: Box<dyn Component>,
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("key", &self.key)
            .field("component", &self.component.name())
            .finish()
    }
}

/// A virtual node: the output of one render pass.
#[derive(Debug)]
pub enum VNode {
    /// A string, number or boolean rendered as-is.
    Primitive(Value),
    Element(ElementNode),
    Component(ComponentNode),
    /// A keyed group of siblings; its key scopes the keys inside it.
    Fragment { key: Option<String>, children: Vec<VNode> },
}

impl VNode {
    pub fn element(tag: impl Into<String>, props: Props, children: Vec<VNode>) -> Self {
        VNode::Element(ElementNode { tag: tag.into(), key: None, props, children })
    }

    pub fn component(component: impl Component) -> Self {
        VNode::Component(ComponentNode { key: None, component: Box::new(component) })
    }

    pub fn boxed_component(component: Box<dyn Component>) -> Self {
        VNode::Component(ComponentNode { key: None, component })
    }

    pub fn fragment(key: impl Into<String>, children: Vec<VNode>) -> Self {
        VNode::Fragment { key: Some(key.into()), children }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Primitive(_) => None,
            VNode::Element(e) => e.key.as_deref(),
            VNode::Component(c) => c.key.as_deref(),
            VNode::Fragment { key, .. } => key.as_deref(),
        }
    }

    /// Set the reconciliation key. Primitives have no identity and ignore it.
    pub fn with_key(mut self, new_key: impl Into<String>) -> Self {
        match &mut self {
            VNode::Primitive(_) => {}
            VNode::Element(e) => e.key = Some(new_key.into()),
            VNode::Component(c) => c.key = Some(new_key.into()),
            VNode::Fragment { key, .. } => *key = Some(new_key.into()),
        }
        self
    }
}

// ── Constructor ───────────────────────────────────────────────────────────

/// How a registered brick type turns properties and children into a renderable.
#[derive(Clone)]
pub enum Constructor {
    /// Render as a host element with this tag.
    Element(String),
    /// Arbitrary factory, e.g. one that returns a [`Component`].
    Factory(Rc<dyn Fn(Props, Vec<VNode>) -> VNode>),
}

impl Constructor {
    pub fn element(tag: impl Into<String>) -> Self {
        Constructor::Element(tag.into())
    }

    pub fn factory(f: impl Fn(Props, Vec<VNode>) -> VNode + 'static) -> Self {
        Constructor::Factory(Rc::new(f))
    }

    pub fn create(&self, props: Props, children: Vec<VNode>) -> VNode {
        match self {
            Constructor::Element(tag) => VNode::element(tag.clone(), props, children),
            Constructor::Factory(f) => f(props, children),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        match self {
            Constructor::Element(tag) => !tag.trim().is_empty(),
            Constructor::Factory(_) => true,
        }
    }

    /// Two constructors are the same when they would build the same thing.
    pub fn same_as(&self, other: &Constructor) -> bool {
        match (self, other) {
            (Constructor::Element(a), Constructor::Element(b)) => a == b,
            (Constructor::Factory(a), Constructor::Factory(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Element(tag) => f.debug_tuple("Element").field(tag).finish(),
            Constructor::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
