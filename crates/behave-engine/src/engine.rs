//! The behavior engine
//!
//! Owns the registry, the resolved active set, and all per-element binding
//! state. Attachment walks a subtree for directive-bearing elements and
//! binds their declared behaviors; click events are never bound directly
//! but handled by one delegated handler per subtree root, so elements
//! inserted later are covered without re-attachment. Detachment reverses
//! exactly what attachment added.

use std::collections::HashMap;

use behave_dom::{DomTree, NodeId};
use behave_net::{NullTransport, RequestId, Transport};

use crate::EngineError;
use crate::codec;
use crate::event::BehaviorEvent;
use crate::helpers::{Chrome, FormSubmission, Helpers, NullChrome, PopupAction};
use crate::registry::{
    ActiveBehaviors, Behavior, BehaviorRegistry, BehaviorScope, LifecycleFn, ReadyGuard,
    RemoteActionFn,
};
use crate::remote::PendingRemote;

/// Error sink invoked with every caught error
pub type ErrorSink = Box<dyn Fn(&EngineError)>;

/// Bootstrap configuration; both fields are mandatory
#[derive(Debug, Clone)]
pub struct Settings {
    pub controller_name: String,
    pub action_name: String,
}

/// Raw bootstrap input, validated by [`Engine::bootstrap`]
#[derive(Debug, Clone, Default)]
pub struct SettingsInit {
    pub controller_name: Option<String>,
    pub action_name: Option<String>,
}

impl SettingsInit {
    pub fn new(controller: &str, action: &str) -> Self {
        Self {
            controller_name: Some(controller.to_string()),
            action_name: Some(action.to_string()),
        }
    }
}

/// Binding-state snapshot, mainly for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub bound_handlers: usize,
    pub ready_guards: usize,
    pub delegation_roots: usize,
    pub pending_requests: usize,
}

/// The process-wide behavior engine.
///
/// Registration happens first, `bootstrap` fixes the page context, and
/// `document_loaded` resolves the active set and attaches it. The engine is
/// single-threaded; concurrent attach/detach of the same element from two
/// call sites is a caller error and is not guarded against.
pub struct Engine {
    registry: BehaviorRegistry,
    settings: Option<Settings>,
    active: ActiveBehaviors,
    bindings: HashMap<NodeId, HashMap<String, Behavior>>,
    ready_guards: HashMap<NodeId, ReadyGuard>,
    delegation_roots: HashMap<NodeId, ActiveBehaviors>,
    pub(crate) pending: HashMap<RequestId, PendingRemote>,
    pub(crate) next_request: u64,
    /// Helper bundle backing the built-in behaviors; swap entries to
    /// override confirmation, popup, or method emulation
    pub helpers: Helpers,
    chrome: Box<dyn Chrome>,
    pub(crate) transport: Box<dyn Transport>,
    error_sink: ErrorSink,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: BehaviorRegistry::new(),
            settings: None,
            active: ActiveBehaviors::default(),
            bindings: HashMap::new(),
            ready_guards: HashMap::new(),
            delegation_roots: HashMap::new(),
            pending: HashMap::new(),
            next_request: 1,
            helpers: Helpers::default(),
            chrome: Box::new(NullChrome),
            transport: Box::new(NullTransport),
            error_sink: Box::new(|err| tracing::error!(error = %err, "behavior engine error")),
        }
    }

    // === Registration ===

    /// Merge behaviors into a scope; `None` targets the universal set
    pub fn add_behaviors<I>(&mut self, scope: Option<BehaviorScope>, behaviors: I)
    where
        I: IntoIterator<Item = (String, Behavior)>,
    {
        self.registry.register(scope, behaviors);
    }

    /// Merge handlers into the remote-action table
    pub fn add_remote_actions<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = (String, RemoteActionFn)>,
    {
        self.registry.register_remote_actions(actions);
    }

    /// Register a document-loaded lifecycle callback for a scope
    pub fn register_lifecycle(&mut self, scope: BehaviorScope, callback: LifecycleFn) {
        self.registry.register_lifecycle(scope, callback);
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.registry
    }

    // === Environment ===

    pub fn set_chrome(&mut self, chrome: Box<dyn Chrome>) {
        self.chrome = chrome;
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    /// Replace the error sink every caught error is routed through
    pub fn on_error(&mut self, sink: ErrorSink) {
        self.error_sink = sink;
    }

    pub(crate) fn report(&self, err: &EngineError) {
        (self.error_sink)(err);
    }

    // === Bootstrap & lifecycle ===

    /// Fix the page context. Reports through the error sink and leaves the
    /// engine un-bootstrapped when either name is missing; never panics.
    pub fn bootstrap(&mut self, init: SettingsInit) {
        let (Some(controller), Some(action)) = (init.controller_name, init.action_name) else {
            self.report(&EngineError::Bootstrap(
                "controller name or action name are missing",
            ));
            return;
        };
        let settings = Settings {
            controller_name: controller.to_lowercase(),
            action_name: action.to_lowercase(),
        };
        tracing::info!(
            controller = %settings.controller_name,
            action = %settings.action_name,
            "bootstrapped"
        );
        self.settings = Some(settings);
    }

    /// Resolve the active behaviors, run lifecycle callbacks, and attach to
    /// the document. Call once the tree's structural content is complete.
    pub fn document_loaded(&mut self, tree: &mut DomTree) {
        let Some(settings) = self.settings.clone() else {
            self.report(&EngineError::Bootstrap("document loaded before bootstrap"));
            return;
        };
        self.active = self
            .registry
            .resolve(&settings.controller_name, &settings.action_name);
        tracing::debug!(behaviors = self.active.len(), "resolved active behaviors");

        // behaviors may depend on objects the lifecycle callbacks set up,
        // so attachment happens last
        for callback in self
            .registry
            .lifecycle_for(&settings.controller_name, &settings.action_name)
        {
            if let Err(err) = callback(self, tree) {
                self.report(&err);
                return;
            }
        }

        let root = tree.root();
        let elements: Vec<NodeId> = tree
            .children(root)
            .into_iter()
            .filter(|&child| tree.get(child).is_some_and(|n| n.is_element()))
            .collect();
        for element in elements {
            self.attach_behaviors(tree, element);
        }
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn active_behaviors(&self) -> &ActiveBehaviors {
        &self.active
    }

    // === Attachment / detachment ===

    /// Attach the active behavior set to a subtree
    pub fn attach_behaviors(&mut self, tree: &mut DomTree, root: NodeId) {
        let behaviors = self.active.clone();
        self.attach_set(tree, root, behaviors, false);
    }

    /// Attach a custom behavior set to a subtree. The root always becomes a
    /// delegation root, even under an existing one, so the custom set wins
    /// for clicks inside it.
    pub fn attach_behaviors_with(
        &mut self,
        tree: &mut DomTree,
        root: NodeId,
        behaviors: ActiveBehaviors,
    ) {
        self.attach_set(tree, root, behaviors, true);
    }

    fn attach_set(
        &mut self,
        tree: &mut DomTree,
        root: NodeId,
        behaviors: ActiveBehaviors,
        custom: bool,
    ) {
        let Some(node) = tree.get(root) else {
            return;
        };
        let root_is_element = node.is_element();

        let under_delegation = tree
            .ancestors(root)
            .any(|a| tree.attr(a, codec::DELEGATED_ATTR) == Some(codec::CLICK_EVENT));
        if root_is_element && (custom || !under_delegation) {
            self.delegate_click(tree, root, behaviors.clone());
        }

        for element in self.collect_behavior_elements(tree, root) {
            self.bind_element(tree, element, &behaviors);
        }
    }

    fn delegate_click(&mut self, tree: &mut DomTree, root: NodeId, behaviors: ActiveBehaviors) {
        tracing::debug!(root = ?root, "delegating click events");
        self.delegation_roots.insert(root, behaviors);
        tree.set_attr(root, codec::DELEGATED_ATTR, codec::CLICK_EVENT);
    }

    /// Directive-bearing elements of a subtree: every matching descendant,
    /// plus the root itself when it carries directives
    fn collect_behavior_elements(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        let mut elements: Vec<NodeId> = tree
            .descendants(root)
            .into_iter()
            .filter(|&id| codec::has_behaviors(tree, id))
            .collect();
        if codec::has_behaviors(tree, root) {
            elements.push(root);
        }
        elements
    }

    fn bind_element(&mut self, tree: &mut DomTree, element: NodeId, behaviors: &ActiveBehaviors) {
        for (event_name, behavior_name) in codec::decode_directives(tree, element) {
            // click is covered by delegation
            if event_name == codec::CLICK_EVENT {
                continue;
            }
            // names with no active match are skipped, never an error
            let Some(behavior) = behaviors.get(&behavior_name) else {
                continue;
            };

            if event_name == codec::READY_EVENT {
                // run immediately with a synthetic ready event; keep any
                // returned teardown for detach
                let mut event = BehaviorEvent::ready(element);
                match behavior(self, tree, element, &mut event) {
                    Ok(Some(guard)) => {
                        self.ready_guards.insert(element, guard);
                    }
                    Ok(None) => {}
                    Err(err) => self.report(&err),
                }
            } else {
                self.bindings
                    .entry(element)
                    .or_default()
                    .insert(event_name, behavior);
            }
        }
    }

    /// Detach behaviors from a subtree, mirroring attachment's discovery
    pub fn detach_behaviors(&mut self, tree: &mut DomTree, root: NodeId) {
        if tree.get(root).is_none() {
            return;
        }
        if tree.attr(root, codec::DELEGATED_ATTR) == Some(codec::CLICK_EVENT) {
            self.delegation_roots.remove(&root);
            tree.set_attr(root, codec::DELEGATED_ATTR, "");
        }
        for element in self.collect_behavior_elements(tree, root) {
            self.unbind_element(tree, element);
        }
    }

    fn unbind_element(&mut self, tree: &mut DomTree, element: NodeId) {
        for (event_name, _) in codec::decode_directives(tree, element) {
            if event_name == codec::CLICK_EVENT {
                continue;
            }
            if event_name == codec::READY_EVENT {
                if let Some(guard) = self.ready_guards.remove(&element) {
                    guard(tree, element);
                }
            } else {
                let emptied = match self.bindings.get_mut(&element) {
                    Some(events) => {
                        events.remove(&event_name);
                        events.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.bindings.remove(&element);
                }
            }
        }
    }

    // === Dispatch ===

    /// Deliver an event to its bound behavior. Click events take the
    /// delegated path; everything else looks up the direct binding on the
    /// target.
    pub fn dispatch(&mut self, tree: &mut DomTree, target: NodeId, event_type: &str) -> BehaviorEvent {
        if event_type == codec::CLICK_EVENT {
            return self.dispatch_click(tree, target);
        }
        let mut event = BehaviorEvent::new(event_type, target);
        let handler = self
            .bindings
            .get(&target)
            .and_then(|events| events.get(event_type))
            .cloned();
        if let Some(handler) = handler {
            if let Err(err) = handler(self, tree, target, &mut event) {
                self.report(&err);
            }
        }
        event
    }

    /// The delegated click path: bubble from the click target to the
    /// nearest delegation root, find the nearest ancestor-or-self of the
    /// target declaring a click behavior, and invoke it with that element
    /// as context.
    pub fn dispatch_click(&mut self, tree: &mut DomTree, target: NodeId) -> BehaviorEvent {
        let mut event = BehaviorEvent::click(target);

        let Some(delegation_root) = tree.closest(target, |t, id| {
            t.attr(id, codec::DELEGATED_ATTR) == Some(codec::CLICK_EVENT)
        }) else {
            return event;
        };
        let Some(observed) =
            tree.closest(target, |t, id| codec::click_behavior_name(t, id).is_some())
        else {
            return event;
        };
        let Some(name) = codec::click_behavior_name(tree, observed) else {
            return event;
        };
        let Some(behavior) = self
            .delegation_roots
            .get(&delegation_root)
            .and_then(|set| set.get(&name))
        else {
            return event;
        };

        if let Err(err) = behavior(self, tree, observed, &mut event) {
            self.report(&err);
        }
        event
    }

    // === Effects (used by the helper bundle) ===

    /// Ask the environment for confirmation
    pub fn confirm(&mut self, message: &str) -> bool {
        self.chrome.confirm(message)
    }

    /// Perform a decoded popup: stop the event, open the window
    pub fn open_popup(&mut self, action: PopupAction, event: &mut BehaviorEvent) {
        event.stop();
        self.chrome
            .open_window(&action.url, &action.window_name, &action.window_options);
    }

    /// Hand a synthesized form to the environment
    pub fn submit_form(&mut self, submission: &FormSubmission) {
        self.chrome.submit_form(submission);
    }

    /// Check whether an element currently owns click delegation
    pub fn is_delegation_root(&self, id: NodeId) -> bool {
        self.delegation_roots.contains_key(&id)
    }

    /// Check for a live direct binding
    pub fn has_binding(&self, id: NodeId, event_type: &str) -> bool {
        self.bindings
            .get(&id)
            .is_some_and(|events| events.contains_key(event_type))
    }

    /// Snapshot of the engine's binding state
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            bound_handlers: self.bindings.values().map(|events| events.len()).sum(),
            ready_guards: self.ready_guards.len(),
            delegation_roots: self.delegation_roots.len(),
            pending_requests: self.pending.len(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
