use std::collections::HashSet;
use std::mem;
use std::rc::Rc;
use std::cell::RefCell;

use serde_json::Value;

use crate::component::{Component, Context, InstanceId, InvalidationQueue, Invalidator};
use crate::logging::trace_render;
use crate::output::{Element, Output};
use crate::vnode::{ComponentNode, ElementNode, Props, VNode};

/// Upper bound on invalidation rounds per flush; a component that keeps
/// invalidating itself from `render` would otherwise spin forever.
const MAX_FLUSH_ROUNDS: usize = 64;

// ── Mounted tree ──────────────────────────────────────────────────────────

enum Mounted {
    Primitive(Value),
    Element(MountedElement),
    Component(MountedComponent),
    Fragment { key: Option<String>, children: Vec<Mounted> },
}

struct MountedElement {
    tag: String,
    key: Option<String>,
    props: Props,
    children: Vec<Mounted>,
}

struct MountedComponent {
    id: InstanceId,
    key: Option<String>,
    instance: Box<dyn Component>,
    children: Vec<Mounted>,
    renders: usize,
}

impl Mounted {
    fn key(&self) -> Option<&str> {
        match self {
            Mounted::Primitive(_) => None,
            Mounted::Element(e) => e.key.as_deref(),
            Mounted::Component(c) => c.key.as_deref(),
            Mounted::Fragment { key, .. } => key.as_deref(),
        }
    }

    fn same_kind(&self, node: &VNode) -> bool {
        match (self, node) {
            (Mounted::Primitive(_), VNode::Primitive(_)) => true,
            (Mounted::Element(e), VNode::Element(n)) => e.tag == n.tag,
            (Mounted::Component(_), VNode::Component(_)) => true,
            (Mounted::Fragment { .. }, VNode::Fragment { .. }) => true,
            _ => false,
        }
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────

/// Mount/update/unmount machinery, split from the roots for borrowing.
struct Runtime {
    queue: InvalidationQueue,
    next_id: u64,
}

impl Runtime {
    fn mount(&mut self, node: VNode) -> Mounted {
        match node {
            VNode::Primitive(v) => Mounted::Primitive(v),
            VNode::Element(ElementNode { tag, key, props, children }) => {
                let children = children.into_iter().map(|c| self.mount(c)).collect();
                Mounted::Element(MountedElement { tag, key, props, children })
            }
            VNode::Component(ComponentNode { key, mut component }) => {
                self.next_id += 1;
                let id = InstanceId(self.next_id);
                let cx = Context::new(Invalidator::new(id, &self.queue));
                trace_render!("mount {} {:?}", component.name(), key);
                component.mount(&cx);
                let rendered = component.render(&cx);
                let children = rendered.into_iter().map(|c| self.mount(c)).collect();
                Mounted::Component(MountedComponent { id, key, instance: component, children, renders: 1 })
            }
            VNode::Fragment { key, children } => {
                let children = children.into_iter().map(|c| self.mount(c)).collect();
                Mounted::Fragment { key, children }
            }
        }
    }

    fn unmount(&mut self, mounted: Mounted) {
        match mounted {
            Mounted::Primitive(_) => {}
            Mounted::Element(e) => {
                for child in e.children {
                    self.unmount(child);
                }
            }
            Mounted::Component(mut c) => {
                trace_render!("unmount {} {:?}", c.instance.name(), c.key);
                c.instance.unmount();
                for child in c.children {
                    self.unmount(child);
                }
            }
            Mounted::Fragment { children, .. } => {
                for child in children {
                    self.unmount(child);
                }
            }
        }
    }

    /// Match `new` against `old` by key (or by position when unkeyed) and kind.
    fn reconcile(&mut self, old: &mut Vec<Mounted>, new: Vec<VNode>) {
        let mut previous: Vec<Option<Mounted>> = mem::take(old).into_iter().map(Some).collect();
        let mut next = Vec::with_capacity(new.len());

        for (index, node) in new.into_iter().enumerate() {
            let slot = match node.key() {
                Some(key) => previous.iter().position(|m| {
                    m.as_ref().is_some_and(|m| m.key() == Some(key) && m.same_kind(&node))
                }),
                None => previous
                    .get(index)
                    .and_then(Option::as_ref)
                    .filter(|m| m.key().is_none() && m.same_kind(&node))
                    .map(|_| index),
            };
            let mounted = match slot.and_then(|i| previous[i].take()) {
                Some(existing) => self.update(existing, node),
                None => self.mount(node),
            };
            next.push(mounted);
        }

        for leftover in previous.into_iter().flatten() {
            self.unmount(leftover);
        }
        *old = next;
    }

    fn update(&mut self, existing: Mounted, node: VNode) -> Mounted {
        match (existing, node) {
            (Mounted::Primitive(_), VNode::Primitive(v)) => Mounted::Primitive(v),
            (Mounted::Element(mut e), VNode::Element(n)) => {
                e.key = n.key;
                e.props = n.props;
                self.reconcile(&mut e.children, n.children);
                Mounted::Element(e)
            }
            (Mounted::Component(mut c), VNode::Component(n)) => match c.instance.receive(n.component) {
                Ok(()) => {
                    self.rerender(&mut c);
                    Mounted::Component(c)
                }
                Err(replacement) => {
                    self.unmount(Mounted::Component(c));
                    self.mount(VNode::Component(ComponentNode { key: n.key, component: replacement }))
                }
            },
            (Mounted::Fragment { mut children, .. }, VNode::Fragment { key, children: new }) => {
                self.reconcile(&mut children, new);
                Mounted::Fragment { key, children }
            }
            (existing, node) => {
                self.unmount(existing);
                self.mount(node)
            }
        }
    }

    fn rerender(&mut self, c: &mut MountedComponent) {
        let cx = Context::new(Invalidator::new(c.id, &self.queue));
        let rendered = c.instance.render(&cx);
        c.renders += 1;
        trace_render!("re-render {} {:?} (#{})", c.instance.name(), c.key, c.renders);
        self.reconcile(&mut c.children, rendered);
    }
}

// ── Host ──────────────────────────────────────────────────────────────────

/// Retained tree of mounted renderables.
///
/// The host is the stand-in for a component framework: it keeps component
/// instances alive across render passes, reconciles new output against what
/// is mounted, and re-renders individual components that invalidate
/// themselves.
///
/// ```rust,ignore
/// let mut host = Host::new();
/// host.render(interpreter.render_tree(&layout, &scope));
/// // ... a store value changes, proxies invalidate ...
/// host.flush();
/// let tree = host.snapshot();
/// ```
pub struct Host {
    roots: Vec<Mounted>,
    runtime: Runtime,
}

impl Host {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            runtime: Runtime { queue: Rc::new(RefCell::new(Vec::new())), next_id: 0 },
        }
    }

    /// Reconcile a fresh render pass against the mounted tree.
    pub fn render(&mut self, nodes: Vec<VNode>) {
        let Host { roots, runtime } = self;
        runtime.reconcile(roots, nodes);
    }

    /// Re-render every component that invalidated itself since the last
    /// flush. Returns the number of component re-renders performed.
    pub fn flush(&mut self) -> usize {
        let Host { roots, runtime } = self;
        let mut rerendered = 0;

        for round in 0.. {
            let pending: Vec<InstanceId> = mem::take(&mut *runtime.queue.borrow_mut());
            if pending.is_empty() {
                break;
            }
            if round >= MAX_FLUSH_ROUNDS {
                log::warn!("components are still invalidating after {} flush rounds, giving up", round);
                break;
            }

            let mut seen = HashSet::new();
            for id in pending {
                if !seen.insert(id) {
                    continue;
                }
                // The component may have been unmounted since it invalidated.
                match find_component(roots, id) {
                    Some(component) => {
                        runtime.rerender(component);
                        rerendered += 1;
                    }
                    None => trace_render!("ignoring invalidation of unmounted {:?}", id),
                }
            }
        }
        rerendered
    }

    /// `true` when components have invalidated and are waiting for [`Host::flush`].
    pub fn has_pending(&self) -> bool {
        !self.runtime.queue.borrow().is_empty()
    }

    /// Unmount everything, running every component's unmount hook.
    pub fn clear(&mut self) {
        let Host { roots, runtime } = self;
        for root in mem::take(roots) {
            runtime.unmount(root);
        }
        runtime.queue.borrow_mut().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Flatten the mounted tree into elements and primitives.
    pub fn snapshot(&self) -> Vec<Output> {
        let mut out = Vec::new();
        for root in &self.roots {
            flatten(root, "", &mut out);
        }
        out
    }

    /// How many times the component keyed `key` has rendered since mounting.
    pub fn render_count(&self, key: &str) -> Option<usize> {
        fn search(nodes: &[Mounted], key: &str) -> Option<usize> {
            nodes.iter().find_map(|m| match m {
                Mounted::Component(c) if c.key.as_deref() == Some(key) => Some(c.renders),
                Mounted::Component(c) => search(&c.children, key),
                Mounted::Element(e) => search(&e.children, key),
                Mounted::Fragment { children, .. } => search(children, key),
                Mounted::Primitive(_) => None,
            })
        }
        search(&self.roots, key)
    }

    /// Number of mounted component instances.
    pub fn component_count(&self) -> usize {
        fn count(nodes: &[Mounted]) -> usize {
            nodes
                .iter()
                .map(|m| match m {
                    Mounted::Component(c) => 1 + count(&c.children),
                    Mounted::Element(e) => count(&e.children),
                    Mounted::Fragment { children, .. } => count(children),
                    Mounted::Primitive(_) => 0,
                })
                .sum()
        }
        count(&self.roots)
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.clear();
    }
}

fn find_component(nodes: &mut [Mounted], id: InstanceId) -> Option<&mut MountedComponent> {
    for node in nodes {
        let found = match node {
            Mounted::Component(c) => {
                if c.id == id {
                    return Some(c);
                }
                find_component(&mut c.children, id)
            }
            Mounted::Element(e) => find_component(&mut e.children, id),
            Mounted::Fragment { children, .. } => find_component(children, id),
            Mounted::Primitive(_) => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn scoped_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_string() } else { format!("{prefix}/{key}") }
}

fn flatten(node: &Mounted, prefix: &str, out: &mut Vec<Output>) {
    match node {
        Mounted::Primitive(v) => out.push(Output::Primitive(v.clone())),
        Mounted::Element(e) => {
            let mut children = Vec::new();
            for child in &e.children {
                flatten(child, prefix, &mut children);
            }
            out.push(Output::Element(Element {
                tag: e.tag.clone(),
                key: e.key.as_deref().map(|k| scoped_key(prefix, k)),
                props: e.props.clone(),
                children,
            }));
        }
        Mounted::Component(c) => {
            for child in &c.children {
                flatten(child, prefix, out);
            }
        }
        Mounted::Fragment { key, children } => {
            let inner = match key {
                Some(k) => scoped_key(prefix, k),
                None => prefix.to_string(),
            };
            for child in children {
                flatten(child, &inner, out);
            }
        }
    }
}
