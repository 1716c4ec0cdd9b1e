//! The layout interpreter: brick tree + scope → renderables.
//!
//! One call to [`Interpreter::render_tree`] is one synchronous walk. Nothing
//! is thrown mid-walk; a node that cannot be rendered is logged and dropped
//! and its siblings carry on.

use std::collections::HashSet;
use std::rc::Rc;

use serde_json::Value;

use crate::brick::{self, Brick, expression_text, is_handler_name};
use crate::config::BrickieConfig;
use crate::error::BrickieError;
use crate::form;
use crate::handlers::{HandlerCache, HandlerSource};
use crate::logging::trace_render;
use crate::proxy::{ProxyNode, ProxyParts};
use crate::registry::{FormContainerConfig, FormFieldConfig, SharedRegistry};
use crate::special::{self, SpecialEnv, SpecialKind};
use crate::store::ScopeRef;
use crate::transport::Transport;
use crate::vnode::{Constructor, Handler, Prop, Props, RENDER_KIDS, RenderKids, VNode};

// ── Target ────────────────────────────────────────────────────────────────

/// What a brick type resolved to.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Special(SpecialKind),
    Constructor(Constructor),
    /// Native element, named by the brick type itself.
    Tag(String),
}

impl Target {
    pub fn same_as(&self, other: &Target) -> bool {
        match (self, other) {
            (Target::Special(a), Target::Special(b)) => a == b,
            (Target::Constructor(a), Target::Constructor(b)) => a.same_as(b),
            (Target::Tag(a), Target::Tag(b)) => a == b,
            _ => false,
        }
    }

    pub fn build(&self, props: Props, children: Vec<VNode>, scope: &ScopeRef, env: &SpecialEnv) -> VNode {
        match self {
            Target::Special(kind) => special::create(*kind, props, scope, env),
            Target::Constructor(constructor) => constructor.create(props, children),
            Target::Tag(tag) => VNode::element(tag.clone(), props, children),
        }
    }
}

// ── Interpreter ───────────────────────────────────────────────────────────

struct Inner {
    registry: SharedRegistry,
    config: BrickieConfig,
    env: SpecialEnv,
    handlers: HandlerCache,
}

/// Renders annotated brick trees. Cheap to clone; clones share the handler
/// cache.
///
/// ```rust
/// use brickie::{Host, Interpreter, Registry, output};
/// use brickie::store::VarStore;
/// use serde_json::json;
///
/// let interpreter = Interpreter::new(Registry::new().shared());
/// let store = VarStore::from_json(json!({ "name": "Ada" }));
/// let tree = json!({ "type": "p", "id": "hello", "children": "{'Hi ' + name}" });
///
/// let mut host = Host::new();
/// host.render(interpreter.render_tree(&tree, &store.scope()));
/// assert_eq!(output::text(&host.snapshot()), "Hi Ada");
/// ```
#[derive(Clone)]
pub struct Interpreter {
    inner: Rc<Inner>,
}

impl Interpreter {
    pub fn new(registry: SharedRegistry) -> Self {
        Self::with_parts(registry, BrickieConfig::default(), None, None)
    }

    pub fn with_parts(
        registry: SharedRegistry,
        config: BrickieConfig,
        transport: Option<Rc<dyn Transport>>,
        handlers: Option<Rc<dyn HandlerSource>>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                registry,
                config,
                env: SpecialEnv { transport },
                handlers: HandlerCache::new(handlers),
            }),
        }
    }

    pub fn config(&self) -> &BrickieConfig {
        &self.inner.config
    }

    /// Swap the handler source; bindings made so far are forgotten.
    pub fn set_handlers(&self, handlers: Option<Rc<dyn HandlerSource>>) {
        self.inner.handlers.replace(handlers);
    }

    /// Render a brick, a primitive, or a sequence of them.
    pub fn render_tree(&self, tree: &Value, scope: &ScopeRef) -> Vec<VNode> {
        match tree {
            Value::Array(items) => items.iter().filter_map(|item| self.render_node(item, scope)).collect(),
            other => self.render_node(other, scope).into_iter().collect(),
        }
    }

    /// Render one node; `None` when it is dropped.
    pub fn render_node(&self, node: &Value, scope: &ScopeRef) -> Option<VNode> {
        let map = match node {
            Value::Null => return None,
            Value::String(_) | Value::Number(_) | Value::Bool(_) => return Some(VNode::Primitive(node.clone())),
            Value::Array(_) => return Some(VNode::Fragment { key: None, children: self.render_tree(node, scope) }),
            Value::Object(map) => map,
        };
        let brick = Brick::new(map);
        let Some(type_name) = brick.type_name() else {
            log::warn!("dropping a brick without a type: {}", node);
            return None;
        };
        let target = self.resolve(type_name)?;
        trace_render!("render {} as {:?} (id {:?})", type_name, target, brick.id());

        let dynamic: HashSet<&str> = brick.expressions().into_iter().collect();
        let mut props = self.static_props(&brick, type_name, &dynamic, scope);

        // Registered bricks with nested sub-trees render them the same way.
        if matches!(target, Target::Special(_)) || self.declares_child_attributes(type_name) {
            props.insert(RENDER_KIDS.to_string(), Prop::RenderKids(self.render_kids(scope)));
        }

        let rendered = if dynamic.is_empty() {
            let children = self.children(brick.children(), scope);
            target.build(props, children, scope, &self.inner.env)
        } else {
            let bundle = dynamic_bundle(&brick, &dynamic, &self.inner.config.class_attribute);
            VNode::component(ProxyNode::new(ProxyParts {
                target,
                key: brick.id().map(str::to_string),
                static_props: props,
                dynamic: bundle,
                scope: scope.clone(),
                child_bricks: brick.children().cloned(),
                render_kids: self.render_kids(scope),
                env: self.inner.env.clone(),
            }))
        };
        Some(match brick.id() {
            Some(id) => rendered.with_key(id),
            None => rendered,
        })
    }

    /// Evaluate a raw property value. Plain strings come back unchanged;
    /// `None` means the expression failed and the property stays unset.
    pub fn evaluate(&self, raw: &str, scope: &ScopeRef) -> Option<Value> {
        let Some(text) = expression_text(raw) else {
            return Some(Value::String(raw.to_string()));
        };
        match scope.evaluate(text) {
            Ok(value) => Some(value),
            Err(e) => {
                let error = BrickieError::ExpressionEvaluationFailure {
                    expression: text.to_string(),
                    message: e.to_string(),
                };
                log::warn!("{}", error);
                None
            }
        }
    }

    /// A [`RenderKids`] closing over `scope`.
    pub fn render_kids(&self, scope: &ScopeRef) -> RenderKids {
        let interpreter = self.clone();
        let scope = scope.clone();
        RenderKids::new(move |kids, bindings| match bindings {
            None => interpreter.render_tree(kids, &scope),
            Some((label, bindings)) => {
                let fork = scope.fork(label, bindings);
                interpreter.render_tree(kids, &fork)
            }
        })
    }

    // ── steps ─────────────────────────────────────────────────────────────

    fn resolve(&self, type_name: &str) -> Option<Target> {
        if let Some(kind) = SpecialKind::resolve(type_name) {
            return Some(Target::Special(kind));
        }
        if let Some(config) = self.inner.registry.borrow().resolve(type_name) {
            return Some(Target::Constructor(config.constructor.clone()));
        }
        if type_name.starts_with(|c: char| c.is_lowercase()) {
            return Some(Target::Tag(type_name.to_string()));
        }
        let error = BrickieError::UnresolvedBrickType(type_name.to_string());
        if self.inner.config.passthrough_unknown {
            log::warn!("{}, passing it through as a tag", error);
            Some(Target::Tag(type_name.to_string()))
        } else {
            log::warn!("{}, dropping the node", error);
            None
        }
    }

    fn declares_child_attributes(&self, type_name: &str) -> bool {
        self.inner
            .registry
            .borrow()
            .resolve(type_name)
            .is_some_and(|config| !config.child_attributes.is_empty())
    }

    /// Static properties of a node. Dynamic keys are left for the proxy.
    fn static_props(&self, brick: &Brick<'_>, type_name: &str, dynamic: &HashSet<&str>, scope: &ScopeRef) -> Props {
        let (field, container) = {
            let registry = self.inner.registry.borrow();
            (registry.form_field(type_name).cloned(), registry.form_container(type_name).cloned())
        };
        let class_attribute = &self.inner.config.class_attribute;

        let mut props = Props::new();
        for (key, raw) in brick.props() {
            if key == brick::ID || key == brick::FORM || dynamic.contains(key.as_str()) {
                continue;
            }
            if field.as_ref().is_some_and(|f| f.hooks.contains_key(key))
                || container.as_ref().is_some_and(|c| c.hooks.contains(key))
            {
                continue;
            }
            let prop = match raw {
                Value::String(s) if is_handler_name(key) => match self.inner.handlers.get(s) {
                    Some(handler) => Prop::Handler(handler),
                    None => {
                        let error = BrickieError::MissingHandler {
                            key: brick.id().unwrap_or_default().to_string(),
                            prop: key.clone(),
                        };
                        log::debug!("{} (handler id '{}')", error, s);
                        continue;
                    }
                },
                Value::String(s) => match self.evaluate(s, scope) {
                    Some(value) => Prop::Value(value),
                    None => continue,
                },
                other => Prop::Value(other.clone()),
            };
            props.insert(rename(key, class_attribute), prop);
        }

        if let Some(field) = field {
            self.wire_field(&mut props, brick, &field, scope);
        }
        if let Some(container) = container {
            self.wire_container(&mut props, brick, &container, scope);
        }
        props
    }

    fn user_handler(&self, brick: &Brick<'_>, key: &str) -> Option<Handler> {
        brick.get(key).and_then(Value::as_str).and_then(|id| self.inner.handlers.get(id))
    }

    fn wire_field(&self, props: &mut Props, brick: &Brick<'_>, field: &FormFieldConfig, scope: &ScopeRef) {
        let Some(name) = brick.name().or_else(|| brick.id()) else {
            log::warn!("form field {:?} has neither a name nor an id, its value is not tracked", brick.type_name());
            return;
        };
        let path = form::field_path(brick.form(), name);
        for (hook, config) in &field.hooks {
            let user = self.user_handler(brick, hook);
            trace_render!("wire {} on field '{}'", hook, path);
            let handler = form::field_handler(config.clone(), path.clone(), scope.clone(), user);
            props.insert(hook.clone(), Prop::Handler(handler));
        }
    }

    fn wire_container(&self, props: &mut Props, brick: &Brick<'_>, container: &FormContainerConfig, scope: &ScopeRef) {
        for hook in &container.hooks {
            let Some(user) = self.user_handler(brick, hook) else {
                continue;
            };
            let handler = match brick.name() {
                Some(name) => form::container_handler(name.to_string(), scope.clone(), user),
                None => user,
            };
            props.insert(hook.clone(), Prop::Handler(handler));
        }
    }

    /// Children given in the brick itself (not the dynamic `children` case).
    pub(crate) fn children(&self, children: Option<&Value>, scope: &ScopeRef) -> Vec<VNode> {
        match children {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => match self.evaluate(s, scope) {
                Some(value) => self.content(value, scope),
                None => Vec::new(),
            },
            Some(Value::Number(_) | Value::Bool(_)) => children.cloned().map(VNode::Primitive).into_iter().collect(),
            Some(tree) => self.render_tree(tree, scope),
        }
    }

    /// Turn an evaluated `children` value into renderables.
    pub(crate) fn content(&self, value: Value, scope: &ScopeRef) -> Vec<VNode> {
        match value {
            Value::Null => Vec::new(),
            Value::Array(_) | Value::Object(_) => self.render_tree(&value, scope),
            primitive => vec![VNode::Primitive(primitive)],
        }
    }
}

fn rename(key: &str, class_attribute: &str) -> String {
    if key == brick::CLASS { class_attribute.to_string() } else { key.to_string() }
}

/// `(prop, expression text)` for every marked property, braces stripped.
fn dynamic_bundle(brick: &Brick<'_>, dynamic: &HashSet<&str>, class_attribute: &str) -> Vec<(String, String)> {
    brick
        .as_map()
        .iter()
        .filter(|(key, _)| dynamic.contains(key.as_str()))
        .filter_map(|(key, raw)| {
            let text = raw.as_str().and_then(expression_text)?;
            Some((rename(key, class_attribute), text.to_string()))
        })
        .collect()
}
