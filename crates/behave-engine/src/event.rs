//! Behavior events
//!
//! The event object handed to behaviors when they fire.

use behave_dom::NodeId;

/// Event delivered to a behavior, carrying the original interaction target
#[derive(Debug, Clone)]
pub struct BehaviorEvent {
    event_type: String,
    target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl BehaviorEvent {
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Create a click event
    pub fn click(target: NodeId) -> Self {
        Self::new(crate::codec::CLICK_EVENT, target)
    }

    /// Create the synthetic event fired at `ready` behaviors
    pub fn ready(target: NodeId) -> Self {
        Self::new(crate::codec::READY_EVENT, target)
    }

    /// Event name
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The element the interaction originally hit
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Prevent the default action (navigation, submission)
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop the event from bubbling further
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Prevent default and stop propagation in one call
    pub fn stop(&mut self) {
        self.prevent_default();
        self.stop_propagation();
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Check if propagation was stopped
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_sets_both_flags() {
        let mut event = BehaviorEvent::click(NodeId::ROOT);
        assert!(!event.is_default_prevented());

        event.stop();
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn test_ready_event_type() {
        let event = BehaviorEvent::ready(NodeId::ROOT);
        assert_eq!(event.event_type(), "ready");
    }
}
