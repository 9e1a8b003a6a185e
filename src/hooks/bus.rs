//! Ordered, synchronous dispatch of pipeline events to registered handlers.

use super::events::{DecodeEvent, DeleteEvent, DeletedEvent, GetEvent, SetEvent, StoredEvent};
use std::fmt;
use std::sync::{Arc, RwLock};

pub type GetHandler = Arc<dyn Fn(&mut GetEvent) + Send + Sync>;
pub type DecodeHandler = Arc<dyn Fn(&mut DecodeEvent) + Send + Sync>;
pub type SetHandler = Arc<dyn Fn(&mut SetEvent) + Send + Sync>;
pub type StoredHandler = Arc<dyn Fn(&mut StoredEvent) + Send + Sync>;
pub type DeleteHandler = Arc<dyn Fn(&mut DeleteEvent) + Send + Sync>;
pub type DeletedHandler = Arc<dyn Fn(&mut DeletedEvent) + Send + Sync>;

/// Pipeline phases a handler can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeGet,
    AfterGet,
    AfterDecode,
    BeforeSet,
    AfterSet,
    BeforeDelete,
    AfterDelete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeGet => "before_get",
            Phase::AfterGet => "after_get",
            Phase::AfterDecode => "after_decode",
            Phase::BeforeSet => "before_set",
            Phase::AfterSet => "after_set",
            Phase::BeforeDelete => "before_delete",
            Phase::AfterDelete => "after_delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler bound to its phase.
#[derive(Clone)]
pub enum Hook {
    BeforeGet(GetHandler),
    AfterGet(GetHandler),
    AfterDecode(DecodeHandler),
    BeforeSet(SetHandler),
    AfterSet(StoredHandler),
    BeforeDelete(DeleteHandler),
    AfterDelete(DeletedHandler),
}

impl Hook {
    pub fn before_get(handler: impl Fn(&mut GetEvent) + Send + Sync + 'static) -> Self {
        Hook::BeforeGet(Arc::new(handler))
    }

    pub fn after_get(handler: impl Fn(&mut GetEvent) + Send + Sync + 'static) -> Self {
        Hook::AfterGet(Arc::new(handler))
    }

    pub fn after_decode(handler: impl Fn(&mut DecodeEvent) + Send + Sync + 'static) -> Self {
        Hook::AfterDecode(Arc::new(handler))
    }

    pub fn before_set(handler: impl Fn(&mut SetEvent) + Send + Sync + 'static) -> Self {
        Hook::BeforeSet(Arc::new(handler))
    }

    pub fn after_set(handler: impl Fn(&mut StoredEvent) + Send + Sync + 'static) -> Self {
        Hook::AfterSet(Arc::new(handler))
    }

    pub fn before_delete(handler: impl Fn(&mut DeleteEvent) + Send + Sync + 'static) -> Self {
        Hook::BeforeDelete(Arc::new(handler))
    }

    pub fn after_delete(handler: impl Fn(&mut DeletedEvent) + Send + Sync + 'static) -> Self {
        Hook::AfterDelete(Arc::new(handler))
    }

    pub fn phase(&self) -> Phase {
        match self {
            Hook::BeforeGet(_) => Phase::BeforeGet,
            Hook::AfterGet(_) => Phase::AfterGet,
            Hook::AfterDecode(_) => Phase::AfterDecode,
            Hook::BeforeSet(_) => Phase::BeforeSet,
            Hook::AfterSet(_) => Phase::AfterSet,
            Hook::BeforeDelete(_) => Phase::BeforeDelete,
            Hook::AfterDelete(_) => Phase::AfterDelete,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({})", self.phase())
    }
}

/// An in-flight event, tagged with the phase it belongs to.
#[derive(Debug)]
pub enum Event<'a> {
    BeforeGet(&'a mut GetEvent),
    AfterGet(&'a mut GetEvent),
    AfterDecode(&'a mut DecodeEvent),
    BeforeSet(&'a mut SetEvent),
    AfterSet(&'a mut StoredEvent),
    BeforeDelete(&'a mut DeleteEvent),
    AfterDelete(&'a mut DeletedEvent),
}

/// Per-instance hook registry.
///
/// Handlers of one phase run in registration order and none of them can stop
/// the chain. Registration takes `&self` so behaviors can attach to a shared
/// `Arc<Settings>`.
#[derive(Default)]
pub struct HookBus {
    hooks: RwLock<Vec<Hook>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to its phase.
    pub fn on(&self, hook: Hook) {
        tracing::trace!(phase = %hook.phase(), "Registering hook");
        self.write().push(hook);
    }

    /// Register a handler ahead of every handler already attached to its phase.
    pub fn prepend(&self, hook: Hook) {
        tracing::trace!(phase = %hook.phase(), "Registering hook at front");
        // Only the relative order within a phase is observable.
        self.write().insert(0, hook);
    }

    pub fn handler_count(&self, phase: Phase) -> usize {
        self.read().iter().filter(|hook| hook.phase() == phase).count()
    }

    /// An independent copy of the registry sharing the same handler functions.
    pub fn snapshot(&self) -> Self {
        Self { hooks: RwLock::new(self.read().clone()) }
    }

    /// Run every handler of the event's phase, in order.
    pub fn trigger(&self, event: Event<'_>) {
        // Handlers run outside the lock so they may register further hooks.
        let hooks = self.read().clone();

        match event {
            Event::BeforeGet(e) => {
                for hook in &hooks {
                    if let Hook::BeforeGet(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::AfterGet(e) => {
                for hook in &hooks {
                    if let Hook::AfterGet(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::AfterDecode(e) => {
                for hook in &hooks {
                    if let Hook::AfterDecode(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::BeforeSet(e) => {
                for hook in &hooks {
                    if let Hook::BeforeSet(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::AfterSet(e) => {
                for hook in &hooks {
                    if let Hook::AfterSet(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::BeforeDelete(e) => {
                for hook in &hooks {
                    if let Hook::BeforeDelete(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
            Event::AfterDelete(e) => {
                for hook in &hooks {
                    if let Hook::AfterDelete(handler) = hook {
                        handler(&mut *e);
                    }
                }
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Hook>> {
        self.hooks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Hook>> {
        self.hooks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for HookBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBus").field("hooks", &self.read().len()).finish()
    }
}
