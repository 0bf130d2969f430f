//! Instance and session contexts, keyed by the handles the layer below hands out.
//!
//! Lock order: the registry maps first, then an instance's session table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::DispatchError;
use crate::extension::ExtensionRegistry;
use crate::resolve::NextLayerTable;

/// Per-instance state: the next-layer table, negotiated extensions, override
/// state `I`, and the sessions created from it.
pub struct InstanceContext<I, S> {
    handle: u64,
    next: NextLayerTable,
    extensions: ExtensionRegistry,
    bypass: bool,
    state: I,
    sessions: Mutex<HashMap<u64, Arc<SessionContext<S>>>>,
}

impl<I, S> InstanceContext<I, S> {
    pub fn new(
        handle: u64,
        next: NextLayerTable,
        extensions: ExtensionRegistry,
        bypass: bool,
        state: I,
    ) -> Self {
        Self {
            handle,
            next,
            extensions,
            bypass,
            state,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn handle(&self) -> u64 {
        self.handle
    }

    #[must_use]
    pub fn next(&self) -> &NextLayerTable {
        &self.next
    }

    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Whether every lookup for this instance goes straight to the layer below.
    #[must_use]
    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    #[must_use]
    pub fn state(&self) -> &I {
        &self.state
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Handles of the live sessions, sorted.
    #[must_use]
    pub fn session_handles(&self) -> Vec<u64> {
        let mut handles: Vec<u64> = self.sessions.lock().keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}

impl<I, S> std::fmt::Debug for InstanceContext<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceContext")
            .field("handle", &format_args!("{:#x}", self.handle))
            .field("bypass", &self.bypass)
            .field("extensions", &self.extensions)
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

/// Per-session state. Reaches its instance's tables through the registry and
/// is dropped from it when the instance goes away.
#[derive(Debug)]
pub struct SessionContext<S> {
    handle: u64,
    instance: u64,
    state: S,
}

impl<S> SessionContext<S> {
    #[must_use]
    pub fn handle(&self) -> u64 {
        self.handle
    }

    #[must_use]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }
}

struct Maps<I, S> {
    instances: HashMap<u64, Arc<InstanceContext<I, S>>>,
    session_owner: HashMap<u64, u64>,
    object_owner: HashMap<u64, u64>,
}

/// Process-wide handle -> context maps.
pub struct ContextRegistry<I, S> {
    maps: RwLock<Maps<I, S>>,
}

impl<I, S> Default for ContextRegistry<I, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, S> ContextRegistry<I, S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Maps {
                instances: HashMap::new(),
                session_owner: HashMap::new(),
                object_owner: HashMap::new(),
            }),
        }
    }

    /// Register an instance. A handle reused by the layer below replaces the
    /// stale context and its sessions.
    pub fn insert_instance(&self, context: InstanceContext<I, S>) -> Arc<InstanceContext<I, S>> {
        let context = Arc::new(context);
        let mut maps = self.maps.write();
        let handle = context.handle;
        if maps.instances.contains_key(&handle) {
            forget_instance(&mut maps, handle);
        }
        maps.instances.insert(handle, Arc::clone(&context));
        context
    }

    #[must_use]
    pub fn instance(&self, handle: u64) -> Option<Arc<InstanceContext<I, S>>> {
        self.maps.read().instances.get(&handle).cloned()
    }

    /// Remove an instance with its sessions and tracked objects.
    ///
    /// Returns `Some` only for the caller that actually removed it, so exactly
    /// one concurrent destroy forwards to the layer below.
    pub fn remove_instance(&self, handle: u64) -> Option<Arc<InstanceContext<I, S>>> {
        let mut maps = self.maps.write();
        forget_instance(&mut maps, handle)
    }

    /// Attach a session to a live instance.
    pub fn insert_session(
        &self,
        instance: u64,
        session: u64,
        state: S,
    ) -> Result<Arc<SessionContext<S>>, DispatchError> {
        let mut maps = self.maps.write();
        let owner = maps
            .instances
            .get(&instance)
            .cloned()
            .ok_or(DispatchError::UnknownHandle(instance))?;
        let context = Arc::new(SessionContext {
            handle: session,
            instance,
            state,
        });
        owner.sessions.lock().insert(session, Arc::clone(&context));
        maps.session_owner.insert(session, instance);
        Ok(context)
    }

    /// Session and its owning instance.
    #[must_use]
    pub fn session(
        &self,
        session: u64,
    ) -> Option<(Arc<InstanceContext<I, S>>, Arc<SessionContext<S>>)> {
        let maps = self.maps.read();
        let owner = maps.instances.get(maps.session_owner.get(&session)?)?;
        let context = owner.sessions.lock().get(&session).cloned()?;
        Some((Arc::clone(owner), context))
    }

    /// Detach a session. Like [`ContextRegistry::remove_instance`], only one
    /// caller gets `Some`.
    pub fn remove_session(
        &self,
        session: u64,
    ) -> Option<(Arc<InstanceContext<I, S>>, Arc<SessionContext<S>>)> {
        let mut maps = self.maps.write();
        let instance = maps.session_owner.remove(&session)?;
        let owner = maps.instances.get(&instance).cloned()?;
        let context = owner.sessions.lock().remove(&session)?;
        Some((owner, context))
    }

    /// Record that `object` (a space, action, ...) was created under `instance`.
    pub fn track_object(&self, instance: u64, object: u64) {
        self.maps.write().object_owner.insert(object, instance);
    }

    pub fn untrack_object(&self, object: u64) -> Option<u64> {
        self.maps.write().object_owner.remove(&object)
    }

    /// Instance a non-instance handle belongs to.
    ///
    /// Falls back to the only live instance when the object was created
    /// without passing through this layer; with several instances there is no
    /// safe guess.
    #[must_use]
    pub fn instance_for_object(&self, object: u64) -> Option<Arc<InstanceContext<I, S>>> {
        let maps = self.maps.read();
        if let Some(owner) = maps.object_owner.get(&object) {
            return maps.instances.get(owner).cloned();
        }
        if let Some(instance) = maps.session_owner.get(&object) {
            return maps.instances.get(instance).cloned();
        }
        if maps.instances.len() == 1 {
            return maps.instances.values().next().cloned();
        }
        None
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.maps.read().instances.len()
    }

    /// Remove every instance, returning them for teardown.
    pub fn drain(&self) -> Vec<Arc<InstanceContext<I, S>>> {
        let mut maps = self.maps.write();
        maps.session_owner.clear();
        maps.object_owner.clear();
        let drained: Vec<_> = maps.instances.drain().map(|(_, ctx)| ctx).collect();
        for ctx in &drained {
            ctx.sessions.lock().clear();
        }
        drained
    }
}

fn forget_instance<I, S>(maps: &mut Maps<I, S>, handle: u64) -> Option<Arc<InstanceContext<I, S>>> {
    let context = maps.instances.remove(&handle)?;
    let sessions: Vec<u64> = context.sessions.lock().drain().map(|(h, _)| h).collect();
    for session in sessions {
        maps.session_owner.remove(&session);
    }
    maps.object_owner.retain(|_, owner| *owner != handle);
    Some(context)
}
