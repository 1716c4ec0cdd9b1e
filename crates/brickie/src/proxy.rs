//! Reactive proxy: the component standing in for a brick with expression
//! properties.
//!
//! The proxy parses its expressions once, subscribes to every variable they
//! read, and re-renders only itself when one of them changes.

use std::rc::Rc;

use brickie_expr::Expr;
use serde_json::Value;

use crate::brick;
use crate::component::{Component, Context, downcast};
use crate::interpreter::Target;
use crate::logging::trace_render;
use crate::special::SpecialEnv;
use crate::store::{ScopeRef, Subscriber};
use crate::vnode::{Prop, Props, RenderKids, VNode};

/// Everything a proxy is built from.
pub(crate) struct ProxyParts {
    pub target: Target,
    pub key: Option<String>,
    /// Properties resolved once by the interpreter.
    pub static_props: Props,
    /// `(prop, expression text)` pairs, braces already stripped.
    pub dynamic: Vec<(String, String)>,
    pub scope: ScopeRef,
    pub child_bricks: Option<Value>,
    pub render_kids: RenderKids,
    pub env: SpecialEnv,
}

pub(crate) struct ProxyNode {
    parts: ProxyParts,
    /// Parsed form of each dynamic entry; `None` when it failed to parse.
    parsed: Vec<(String, Option<Expr>)>,
    /// Root variables read by any dynamic entry, deduplicated.
    depends: Vec<String>,
    /// Present exactly while mounted.
    subscriber: Option<Subscriber>,
}

impl ProxyNode {
    pub fn new(parts: ProxyParts) -> Self {
        let mut depends: Vec<String> = Vec::new();
        let mut parsed = Vec::with_capacity(parts.dynamic.len());
        for (key, text) in &parts.dynamic {
            match parts.scope.parse_expression(text) {
                Ok(p) => {
                    for id in p.identifiers {
                        if !depends.contains(&id) {
                            depends.push(id);
                        }
                    }
                    parsed.push((key.clone(), Some(p.expr)));
                }
                Err(e) => {
                    log::warn!("cannot parse '{}' for property '{}': {}", text, key, e);
                    parsed.push((key.clone(), None));
                }
            }
        }
        Self { parts, parsed, depends, subscriber: None }
    }

    pub fn depends(&self) -> &[String] {
        &self.depends
    }

    fn subscribe(&self, subscriber: &Subscriber) {
        for name in &self.depends {
            self.parts.scope.subscribe(name, subscriber);
        }
    }

    fn unsubscribe(&self, subscriber: &Subscriber) {
        for name in &self.depends {
            self.parts.scope.unsubscribe(name, subscriber);
        }
    }

    fn evaluate(&self, key: &str, expr: &Option<Expr>) -> Option<Value> {
        let expr = expr.as_ref()?;
        match self.parts.scope.evaluate_node(expr) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("property '{}' of {:?} left unset: {}", key, self.parts.key, e);
                None
            }
        }
    }

    fn children(&self) -> Vec<VNode> {
        if let Some((key, expr)) = self.parsed.iter().find(|(k, _)| k == brick::CHILDREN) {
            return match self.evaluate(key, expr) {
                Some(Value::Null) | None => Vec::new(),
                Some(tree @ (Value::Array(_) | Value::Object(_))) => self.parts.render_kids.render(&tree),
                Some(primitive) => vec![VNode::Primitive(primitive)],
            };
        }
        match &self.parts.child_bricks {
            Some(kids) => self.parts.render_kids.render(kids),
            None => Vec::new(),
        }
    }
}

impl Component for ProxyNode {
    fn name(&self) -> &'static str {
        "Proxy"
    }

    fn mount(&mut self, cx: &Context) {
        let invalidator = cx.invalidator();
        let key = self.parts.key.clone();
        let subscriber = Subscriber::new(move |name, _| {
            trace_render!("{:?} invalidated by '{}'", key, name);
            invalidator.invalidate();
        });
        self.subscribe(&subscriber);
        trace_render!("{:?} subscribed to {:?}", self.parts.key, self.depends);
        self.subscriber = Some(subscriber);
    }

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        let next = downcast::<ProxyNode>(next)?;
        // A different target or expression set means a different node.
        if !self.parts.target.same_as(&next.parts.target) || self.parts.dynamic != next.parts.dynamic {
            return Err(next as Box<dyn Component>);
        }
        let next = *next;
        let rescope = !std::ptr::addr_eq(Rc::as_ptr(&self.parts.scope), Rc::as_ptr(&next.parts.scope));
        if rescope {
            if let Some(subscriber) = &self.subscriber {
                self.unsubscribe(subscriber);
            }
        }
        self.parts = next.parts;
        if rescope {
            if let Some(subscriber) = &self.subscriber {
                self.subscribe(subscriber);
            }
        }
        Ok(())
    }

    fn render(&mut self, _cx: &Context) -> Vec<VNode> {
        let mut props = self.parts.static_props.clone();
        for (key, expr) in &self.parsed {
            if key == brick::CHILDREN {
                continue;
            }
            match self.evaluate(key, expr) {
                Some(value) => { props.insert(key.clone(), Prop::Value(value)); }
                None => { props.remove(key); }
            }
        }
        let children = self.children();
        let node = self.parts.target.build(props, children, &self.parts.scope, &self.parts.env);
        match &self.parts.key {
            Some(key) => vec![node.with_key(key.clone())],
            None => vec![node],
        }
    }

    fn unmount(&mut self) {
        if let Some(subscriber) = self.subscriber.take() {
            self.unsubscribe(&subscriber);
            trace_render!("{:?} unsubscribed", self.parts.key);
        }
    }
}
