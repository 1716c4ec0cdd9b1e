use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::annotate::{AnnotateOptions, annotate};
use crate::config::BrickieConfig;
use crate::error::BrickieError;
use crate::handlers::HandlerSource;
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::logging;
use crate::output::{self, Output};
use crate::registry::{HandlerConfig, Registry, SharedRegistry};
use crate::store::ScopeRef;
use crate::transport::Transport;
use crate::vnode::{Constructor, Prop};

// ── Mount ─────────────────────────────────────────────────────────────────

/// One layout rendered onto one target.
struct Mount {
    layout:      Value,
    scope:       ScopeRef,
    interpreter: Interpreter,
    host:        Host,
}

impl Mount {
    fn render(&mut self) {
        let nodes = self.interpreter.render_tree(&self.layout, &self.scope);
        self.host.render(nodes);
    }
}

// ── Brickie ───────────────────────────────────────────────────────────────

/// Entry point: registers brick types and mounts layouts onto named targets.
///
/// ```rust
/// use brickie::{Brickie, Constructor, Handlers};
/// use brickie::store::{Scope, VarStore};
/// use serde_json::json;
///
/// let mut app = Brickie::new();
/// app.register("Text", Constructor::element("text")).unwrap();
///
/// let store = VarStore::from_json(json!({ "greeting": "hi" }));
/// let layout = json!({ "type": "Text", "id": "t", "content": "{greeting}" });
/// app.mount(layout, "main", store.scope(), Handlers::new()).unwrap();
///
/// store.set_value("greeting", json!("bye"));
/// app.flush();
/// let tree = app.tree("main").unwrap();
/// assert_eq!(tree[0].value("content"), Some(&json!("bye")));
/// ```
pub struct Brickie {
    registry:  SharedRegistry,
    config:    BrickieConfig,
    transport: Option<Rc<dyn Transport>>,
    mounts:    BTreeMap<String, Mount>,
}

impl Brickie {
    pub fn new() -> Self {
        Self::with_config(BrickieConfig::default())
    }

    pub fn with_config(config: BrickieConfig) -> Self {
        if config.debug {
            logging::set_debug(true);
        }
        Self {
            registry:  Registry::new().shared(),
            config,
            transport: None,
            mounts:    BTreeMap::new(),
        }
    }

    /// Transport used by fetch bricks in layouts mounted from now on.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Rc::new(transport));
        self
    }

    pub fn set_transport(&mut self, transport: Option<Rc<dyn Transport>>) {
        self.transport = transport;
    }

    pub fn config(&self) -> &BrickieConfig {
        &self.config
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Toggle per-node render tracing.
    pub fn set_debug(&mut self, enabled: bool) {
        self.config.debug = enabled;
        logging::set_debug(enabled);
    }

    // ── registration ──────────────────────────────────────────────────────

    pub fn register(&mut self, name: &str, constructor: Constructor) -> Result<(), BrickieError> {
        self.registry.borrow_mut().register(name, constructor)
    }

    pub fn register_with_children<I, S>(
        &mut self,
        name: &str,
        constructor: Constructor,
        child_attributes: I,
    ) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.borrow_mut().register_with_children(name, constructor, child_attributes)
    }

    pub fn register_all<I, S>(&mut self, bricks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = (S, Constructor)>,
        S: AsRef<str>,
    {
        self.registry.borrow_mut().register_all(bricks)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.registry.borrow_mut().unregister(name).is_some()
    }

    pub fn unregister_all(&mut self) {
        self.registry.borrow_mut().unregister_all();
    }

    pub fn register_form_container<I, S>(&mut self, name: &str, hooks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.borrow_mut().register_form_container(name, hooks)
    }

    pub fn register_form_field<I, S>(&mut self, name: &str, hooks: I) -> Result<(), BrickieError>
    where
        I: IntoIterator<Item = (S, HandlerConfig)>,
        S: Into<String>,
    {
        self.registry.borrow_mut().register_form_field(name, hooks)
    }

    // ── mounting ──────────────────────────────────────────────────────────

    /// Annotate `layout`, render it against `scope` and mount it on `target`.
    /// Whatever was mounted on `target` before is unmounted first.
    pub fn mount(
        &mut self,
        layout: Value,
        target: &str,
        scope: ScopeRef,
        handlers: impl HandlerSource + 'static,
    ) -> Result<(), BrickieError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(BrickieError::MissingMountTarget);
        }
        if layout.is_null() {
            return Err(BrickieError::MissingLayout);
        }
        if let Some(previous) = self.mounts.remove(target) {
            log::debug!("replacing the layout mounted on '{}'", target);
            drop(previous);
        }

        let mut layout = layout;
        {
            let registry = self.registry.borrow();
            let options = AnnotateOptions::default().key_prefix(self.config.key_prefix.clone());
            annotate(&mut layout, &registry, &options);
        }
        let interpreter = Interpreter::with_parts(
            self.registry.clone(),
            self.config.clone(),
            self.transport.clone(),
            Some(Rc::new(handlers)),
        );
        let mut mount = Mount { layout, scope, interpreter, host: Host::new() };
        mount.render();
        log::info!("mounted layout on '{}' ({} components)", target, mount.host.component_count());
        self.mounts.insert(target.to_string(), mount);
        Ok(())
    }

    /// Walk the layout again, as a parent re-render would.
    pub fn rerender(&mut self, target: &str) -> Result<(), BrickieError> {
        self.mount_mut(target)?.render();
        Ok(())
    }

    /// Re-render every component that invalidated itself, across all mounts.
    pub fn flush(&mut self) -> usize {
        self.mounts.values_mut().map(|m| m.host.flush()).sum()
    }

    pub fn has_pending(&self) -> bool {
        self.mounts.values().any(|m| m.host.has_pending())
    }

    /// Unmount `target`, releasing every subscription and in-flight fetch.
    pub fn unmount(&mut self, target: &str) -> Result<(), BrickieError> {
        let mount = self
            .mounts
            .remove(target.trim())
            .ok_or_else(|| BrickieError::UnknownTarget(target.to_string()))?;
        drop(mount);
        log::info!("unmounted '{}'", target);
        Ok(())
    }

    pub fn is_mounted(&self, target: &str) -> bool {
        self.mounts.contains_key(target.trim())
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    /// The annotated layout mounted on `target`.
    pub fn layout(&self, target: &str) -> Option<&Value> {
        self.mounts.get(target.trim()).map(|m| &m.layout)
    }

    /// Flattened rendered tree of `target`.
    pub fn tree(&self, target: &str) -> Result<Vec<Output>, BrickieError> {
        Ok(self.mount_ref(target)?.host.snapshot())
    }

    /// Call handler prop `prop` of the element keyed `key`, as an event would.
    pub fn dispatch(&self, target: &str, key: &str, prop: &str, args: &[Value]) -> Result<(), BrickieError> {
        let tree = self.tree(target)?;
        let missing = || BrickieError::MissingHandler { key: key.to_string(), prop: prop.to_string() };
        let handler = output::find(&tree, key)
            .and_then(|element| element.prop(prop))
            .and_then(Prop::as_handler)
            .ok_or_else(missing)?;
        log::debug!("dispatch {}.{} on '{}'", key, prop, target);
        handler.call(args);
        Ok(())
    }

    /// Swap the handler source of `target` and re-render it with fresh bindings.
    pub fn set_handlers(&mut self, target: &str, handlers: impl HandlerSource + 'static) -> Result<(), BrickieError> {
        let mount = self.mount_mut(target)?;
        mount.interpreter.set_handlers(Some(Rc::new(handlers)));
        mount.render();
        Ok(())
    }

    fn mount_ref(&self, target: &str) -> Result<&Mount, BrickieError> {
        self.mounts.get(target.trim()).ok_or_else(|| BrickieError::UnknownTarget(target.to_string()))
    }

    fn mount_mut(&mut self, target: &str) -> Result<&mut Mount, BrickieError> {
        self.mounts.get_mut(target.trim()).ok_or_else(|| BrickieError::UnknownTarget(target.to_string()))
    }
}

impl Default for Brickie {
    fn default() -> Self {
        Self::new()
    }
}
