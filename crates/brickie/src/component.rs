use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::vnode::VNode;

// ── Component trait ───────────────────────────────────────────────────────

/// A stateful renderable with a mount lifecycle.
///
/// Plain bricks render to elements and need none of this. Components exist
/// for the nodes that must outlive a single render pass: reactive proxies
/// (which hold store subscriptions) and the special control-flow bricks
/// (which hold scope forks and, for fetch, an in-flight request).
///
/// Lifecycle, as driven by [`crate::host::Host`]:
///
/// 1. `mount` once, before the first `render`.
/// 2. `render` on mount, whenever the component invalidates itself, and after
///    every successful `receive`.
/// 3. `receive` when a parent re-render produces a component at the same
///    position with the same key. Return `Err(next)` to refuse the update;
///    the host then unmounts `self` and mounts `next` in its place.
/// 4. `unmount` exactly once.
pub trait Component: Any {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn mount(&mut self, _cx: &Context) {}

    fn receive(&mut self, next: Box<dyn Component>) -> Result<(), Box<dyn Component>> {
        Err(next)
    }

    fn render(&mut self, cx: &Context) -> Vec<VNode>;

    fn unmount(&mut self) {}
}

/// Recover the concrete type of `next`, handing it back unchanged on mismatch.
pub fn downcast<C: Component>(next: Box<dyn Component>) -> Result<Box<C>, Box<dyn Component>> {
    if !(&*next as &dyn Any).is::<C>() {
        return Err(next);
    }
    let any: Box<dyn Any> = next;
    Ok(any.downcast::<C>().expect("type checked above"))
}

// ── Invalidation ──────────────────────────────────────────────────────────

/// Identity of one mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) u64);

pub(crate) type InvalidationQueue = Rc<RefCell<Vec<InstanceId>>>;

/// Handle a component uses to schedule its own re-render.
///
/// Invalidating never re-renders synchronously; the id is queued and picked
/// up by the next [`crate::host::Host::flush`]. Once the host is gone the
/// handle is inert.
#[derive(Debug, Clone)]
pub struct Invalidator {
    id: InstanceId,
    queue: Weak<RefCell<Vec<InstanceId>>>,
}

impl Invalidator {
    pub(crate) fn new(id: InstanceId, queue: &InvalidationQueue) -> Self {
        Self { id, queue: Rc::downgrade(queue) }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn invalidate(&self) {
        if let Some(queue) = self.queue.upgrade() {
            queue.borrow_mut().push(self.id);
        }
    }
}

/// What a component gets to see of the host.
#[derive(Debug, Clone)]
pub struct Context {
    invalidator: Invalidator,
}

impl Context {
    pub(crate) fn new(invalidator: Invalidator) -> Self {
        Self { invalidator }
    }

    pub fn invalidator(&self) -> Invalidator {
        self.invalidator.clone()
    }

    pub fn id(&self) -> InstanceId {
        self.invalidator.id
    }
}
