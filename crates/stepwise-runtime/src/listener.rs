#![forbid(unsafe_code)]

//! Scoped key listeners.
//!
//! [`KeyListeners`] is the host's global key-listener registry (the analog of
//! a browser `window`). Attaching returns a [`ListenerGuard`]; dropping the
//! guard detaches the listener, so a listener can never outlive its owner.
//!
//! [`ScopedListener`] layers dependency tracking on top: it keeps at most one
//! listener attached and swaps it only when the dependency snapshot changes,
//! mirroring "attach on mount, re-attach on dependency change, detach on
//! unmount" without manual bookkeeping.
//!
//! # Invariants
//!
//! 1. A registry never holds a listener whose guard was dropped
//! 2. A `ScopedListener` holds exactly one listener while attached
//! 3. Handlers run in attach order
//!
//! Handlers must not attach or detach listeners on the registry that is
//! currently emitting to them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use stepwise_core::event::KeyEvent;

/// What a listener did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction<M> {
    /// Message for the model, if any.
    pub message: Option<M>,
    /// Whether the host's default behavior for the key must be suppressed.
    pub prevent_default: bool,
}

impl<M> Reaction<M> {
    /// Key not handled.
    #[must_use]
    pub const fn ignored() -> Self {
        Self {
            message: None,
            prevent_default: false,
        }
    }
}

/// Outcome of emitting one key to every listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted<M> {
    pub messages: Vec<M>,
    pub default_prevented: bool,
}

type Handler<M> = Box<dyn FnMut(&KeyEvent) -> Reaction<M>>;

struct Registry<M> {
    next_id: u64,
    handlers: Vec<(u64, Handler<M>)>,
}

/// Host-owned key-listener registry. Cloning shares the registry.
pub struct KeyListeners<M> {
    inner: Rc<RefCell<Registry<M>>>,
}

impl<M> Clone for KeyListeners<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M> Default for KeyListeners<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for KeyListeners<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyListeners")
            .field("count", &self.len())
            .finish()
    }
}

impl<M> KeyListeners<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Attach a handler. It stays attached until the guard is dropped.
    #[must_use = "dropping the guard detaches the listener immediately"]
    pub fn attach<F>(&self, handler: F) -> ListenerGuard<M>
    where
        F: FnMut(&KeyEvent) -> Reaction<M> + 'static,
    {
        let mut reg = self.inner.borrow_mut();
        reg.next_id += 1;
        let id = reg.next_id;
        reg.handlers.push((id, Box::new(handler)));
        tracing::trace!(listener = id, count = reg.handlers.len(), "key listener attached");
        ListenerGuard {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `key` to every listener in attach order.
    pub fn emit(&self, key: &KeyEvent) -> Emitted<M> {
        let mut reg = self.inner.borrow_mut();
        let mut out = Emitted {
            messages: Vec::new(),
            default_prevented: false,
        };
        for (_, handler) in reg.handlers.iter_mut() {
            let reaction = handler(key);
            out.default_prevented |= reaction.prevent_default;
            out.messages.extend(reaction.message);
        }
        out
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps one listener attached; detaches on drop.
pub struct ListenerGuard<M> {
    registry: Weak<RefCell<Registry<M>>>,
    id: u64,
}

impl<M> ListenerGuard<M> {
    /// Registry-unique listener id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl<M> std::fmt::Debug for ListenerGuard<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

impl<M> Drop for ListenerGuard<M> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut reg = registry.borrow_mut();
            reg.handlers.retain(|(id, _)| *id != self.id);
            tracing::trace!(listener = self.id, count = reg.handlers.len(), "key listener detached");
        }
    }
}

/// A listener bound to a dependency snapshot `D`.
pub struct ScopedListener<D, M> {
    deps: Option<D>,
    guard: Option<ListenerGuard<M>>,
}

impl<D, M> Default for ScopedListener<D, M> {
    fn default() -> Self {
        Self {
            deps: None,
            guard: None,
        }
    }
}

impl<D: std::fmt::Debug, M> std::fmt::Debug for ScopedListener<D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedListener")
            .field("deps", &self.deps)
            .field("attached", &self.guard.is_some())
            .finish()
    }
}

impl<D: PartialEq + Clone, M> ScopedListener<D, M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a listener built from `deps` is attached to `keys`.
    ///
    /// When `deps` equals the snapshot of the attached listener nothing
    /// happens. Otherwise the old listener is detached before `make` builds
    /// the replacement. Returns whether a (re)attach happened.
    pub fn sync<F, H>(&mut self, keys: &KeyListeners<M>, deps: D, make: F) -> bool
    where
        F: FnOnce(D) -> H,
        H: FnMut(&KeyEvent) -> Reaction<M> + 'static,
    {
        if self.guard.is_some() && self.deps.as_ref() == Some(&deps) {
            return false;
        }
        self.guard = None;
        self.guard = Some(keys.attach(make(deps.clone())));
        self.deps = Some(deps);
        true
    }

    /// Detach the listener, if any.
    pub fn detach(&mut self) {
        self.guard = None;
        self.deps = None;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.guard.is_some()
    }

    /// Snapshot the attached listener was built from.
    #[must_use]
    pub fn deps(&self) -> Option<&D> {
        self.deps.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::event::KeyCode;

    fn reply(n: u32) -> impl FnMut(&KeyEvent) -> Reaction<u32> {
        move |_| Reaction {
            message: Some(n),
            prevent_default: n % 2 == 0,
        }
    }

    #[test]
    fn guard_drop_detaches() {
        let keys = KeyListeners::new();
        let guard = keys.attach(reply(1));
        assert_eq!(keys.len(), 1);
        drop(guard);
        assert!(keys.is_empty());
    }

    #[test]
    fn emit_collects_in_attach_order() {
        let keys = KeyListeners::new();
        let _a = keys.attach(reply(1));
        let _b = keys.attach(reply(2));
        let out = keys.emit(&KeyEvent::new(KeyCode::Right));
        assert_eq!(out.messages, vec![1, 2]);
        assert!(out.default_prevented);
    }

    #[test]
    fn guard_outliving_registry_is_harmless() {
        let keys = KeyListeners::new();
        let guard = keys.attach(reply(1));
        drop(keys);
        drop(guard);
    }

    #[test]
    fn scoped_listener_reattaches_only_on_change() {
        let keys = KeyListeners::new();
        let mut scope: ScopedListener<u32, u32> = ScopedListener::new();

        assert!(scope.sync(&keys, 1, reply));
        assert!(!scope.sync(&keys, 1, reply));
        assert_eq!(keys.len(), 1);

        assert!(scope.sync(&keys, 2, reply));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.emit(&KeyEvent::new(KeyCode::Enter)).messages, vec![2]);

        scope.detach();
        assert!(keys.is_empty());
        assert!(scope.sync(&keys, 2, reply));
        drop(scope);
        assert!(keys.is_empty());
    }
}
