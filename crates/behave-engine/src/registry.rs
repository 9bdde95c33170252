//! Behavior registry and context resolution
//!
//! Behaviors are registered into one of three scopes: universal, a
//! controller, or a controller/action pair. Resolution merges the scopes
//! for the current page context, most specific last, into the active set.
//! Registration is expected to finish before resolution; the engine's
//! bootstrap sequencing enforces that ordering.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use behave_dom::{DomTree, NodeId};
use behave_net::RemoteResponse;

use crate::EngineError;
use crate::engine::Engine;
use crate::event::BehaviorEvent;
use crate::helpers;
use crate::remote::RemoteContext;

/// Teardown returned by a `ready` behavior, run once on detach
pub type ReadyGuard = Box<dyn FnOnce(&mut DomTree, NodeId)>;

/// A named, element-bound event handler.
///
/// Runs with the directive-bearing element as its context; a `ready`
/// behavior may return a [`ReadyGuard`] to be run when the element is
/// detached.
pub type Behavior = Rc<
    dyn Fn(
        &mut Engine,
        &mut DomTree,
        NodeId,
        &mut BehaviorEvent,
    ) -> Result<Option<ReadyGuard>, EngineError>,
>;

/// Completion handler looked up by remote-action name
pub type RemoteActionFn =
    Rc<dyn Fn(&mut DomTree, &RemoteContext, &RemoteResponse) -> Result<(), EngineError>>;

/// Page lifecycle callback, run at document-loaded time before attachment
pub type LifecycleFn = Rc<dyn Fn(&mut Engine, &mut DomTree) -> Result<(), EngineError>>;

const CORE_BEHAVIORS_KEY: &str = "core";

/// Scope a behavior registration applies to. Action scoping always
/// composes with its controller; an action-only scope is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorScope {
    controller: String,
    action: Option<String>,
}

impl BehaviorScope {
    /// All pages rendered by `controller`
    pub fn controller(name: &str) -> Self {
        Self {
            controller: name.to_string(),
            action: None,
        }
    }

    /// Only the page rendered by `controller`/`action`
    pub fn action(controller: &str, action: &str) -> Self {
        Self {
            controller: controller.to_string(),
            action: Some(action.to_string()),
        }
    }

    fn storage_key(&self) -> String {
        storage_key(&self.controller, self.action.as_deref())
    }
}

fn storage_key(controller: &str, action: Option<&str>) -> String {
    let mut key = controller.to_string();
    if let Some(action) = action {
        key.push('_');
        key.push_str(action);
    }
    key.to_lowercase()
}

/// Name-resolved behavior set in effect for one page view.
///
/// Computed once at document-loaded time; read-only afterwards. Cloning is
/// cheap, the behaviors themselves are shared.
#[derive(Clone, Default)]
pub struct ActiveBehaviors {
    map: HashMap<String, Behavior>,
}

impl ActiveBehaviors {
    /// Look up a behavior by name
    pub fn get(&self, name: &str) -> Option<Behavior> {
        self.map.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, behavior: Behavior) {
        self.map.insert(name.to_string(), behavior);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn overlay(&mut self, table: &HashMap<String, Behavior>) {
        for (name, behavior) in table {
            self.map.insert(name.clone(), behavior.clone());
        }
    }
}

impl fmt::Debug for ActiveBehaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.map.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ActiveBehaviors").field("names", &names).finish()
    }
}

/// Process-wide store of named behaviors, remote actions, and lifecycle
/// callbacks
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, HashMap<String, Behavior>>,
    remote_actions: HashMap<String, RemoteActionFn>,
    lifecycle: HashMap<String, Vec<LifecycleFn>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge behaviors into a scope's table; `None` targets the universal
    /// set. Re-registering a name replaces it; there is no removal.
    pub fn register<I>(&mut self, scope: Option<BehaviorScope>, behaviors: I)
    where
        I: IntoIterator<Item = (String, Behavior)>,
    {
        let key = scope
            .map(|s| s.storage_key())
            .unwrap_or_else(|| CORE_BEHAVIORS_KEY.to_string());
        let table = self.behaviors.entry(key).or_default();
        for (name, behavior) in behaviors {
            table.insert(name, behavior);
        }
    }

    /// Merge handlers into the remote-action table (distinct from element
    /// behaviors)
    pub fn register_remote_actions<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = (String, RemoteActionFn)>,
    {
        for (name, action) in actions {
            self.remote_actions.insert(name, action);
        }
    }

    /// Look up a remote-action handler by name
    pub fn remote_action(&self, name: &str) -> Option<RemoteActionFn> {
        self.remote_actions.get(name).cloned()
    }

    /// Register a lifecycle callback for a controller or controller/action
    /// scope; callbacks run in registration order
    pub fn register_lifecycle(&mut self, scope: BehaviorScope, callback: LifecycleFn) {
        self.lifecycle
            .entry(scope.storage_key())
            .or_default()
            .push(callback);
    }

    pub(crate) fn lifecycle_for(&self, controller: &str, action: &str) -> Vec<LifecycleFn> {
        let mut out = Vec::new();
        for key in [
            storage_key(controller, None),
            storage_key(controller, Some(action)),
        ] {
            if let Some(callbacks) = self.lifecycle.get(&key) {
                out.extend(callbacks.iter().cloned());
            }
        }
        out
    }

    /// Compute the active set for a controller/action pair.
    ///
    /// Seeds the built-in `default` and `remote` behaviors, then overlays
    /// the universal, controller, and controller/action scopes in that
    /// order; later entries win on name collision, so registrations at any
    /// scope may shadow the built-ins.
    pub fn resolve(&self, controller: &str, action: &str) -> ActiveBehaviors {
        let mut active = ActiveBehaviors::default();
        active.insert("default", helpers::default_behavior());
        active.insert("remote", helpers::remote_behavior());

        for key in [
            CORE_BEHAVIORS_KEY.to_string(),
            storage_key(controller, None),
            storage_key(controller, Some(action)),
        ] {
            if let Some(table) = self.behaviors.get(&key) {
                active.overlay(table);
            }
        }
        active
    }
}
