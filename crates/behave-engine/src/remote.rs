//! Remote dispatch and completion routing
//!
//! Requests are derived from the invoking element (href target, configured
//! method, query parameters) or from a raw endpoint, handed to the
//! environment's transport, and remembered by id. When the environment
//! delivers the response, the router resolves a remote-action name from the
//! element's configuration or the payload and invokes the registered
//! handler in the original context.

use std::rc::Rc;

use behave_dom::{DomTree, NodeId};
use behave_net::{Method, NetError, RemoteRequest, RemoteResponse, RequestId};

use crate::EngineError;
use crate::codec;
use crate::engine::Engine;

/// What a remote request was issued for
#[derive(Debug, Clone)]
pub enum RemoteContext {
    /// A directive-bearing element; target and method come from its own
    /// addressable attributes unless overridden
    Element(NodeId),
    /// A raw endpoint string
    Endpoint(String),
}

/// Caller-supplied completion override, run with the original context
pub type CompleteFn = Rc<
    dyn Fn(&mut Engine, &mut DomTree, &RemoteContext, &RemoteResponse) -> Result<(), EngineError>,
>;

/// Options for a remote request
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Explicit method; otherwise the element's `method` config, then GET
    pub method: Option<Method>,
    /// Parameters appended after any parsed from the target's query string
    pub parameters: Vec<(String, String)>,
    /// Completion override; replaces the default response routing
    pub on_complete: Option<CompleteFn>,
}

pub(crate) struct PendingRemote {
    pub context: RemoteContext,
    pub on_complete: Option<CompleteFn>,
}

impl Engine {
    /// Issue a remote request for `context`.
    ///
    /// Returns the request id, or `None` when no request could be
    /// constructed. An element without a target is skipped quietly, the
    /// way unmatched directives are; a malformed URL goes to the error
    /// sink.
    pub fn perform_remote_request(
        &mut self,
        tree: &mut DomTree,
        context: RemoteContext,
        options: RequestOptions,
    ) -> Option<RequestId> {
        match self.build_remote_request(tree, &context, &options) {
            Ok(request) => {
                let id = request.id;
                tracing::debug!(
                    id = id.0,
                    url = %request.url,
                    method = %request.method,
                    "dispatching remote request"
                );
                self.pending.insert(
                    id,
                    PendingRemote {
                        context,
                        on_complete: options.on_complete,
                    },
                );
                self.transport.dispatch(request);
                Some(id)
            }
            Err(EngineError::Net(NetError::EmptyTarget)) => {
                tracing::debug!("skipping remote request without a target");
                None
            }
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    fn build_remote_request(
        &mut self,
        tree: &DomTree,
        context: &RemoteContext,
        options: &RequestOptions,
    ) -> Result<RemoteRequest, EngineError> {
        let (target, config_method) = match context {
            RemoteContext::Element(element) => {
                let target = tree.attr(*element, "href").unwrap_or("").to_string();
                let method = codec::read_config(tree, *element, "method")
                    .map(|value| Method::parse(&value.into_string()));
                (target, method)
            }
            RemoteContext::Endpoint(endpoint) => (endpoint.clone(), None),
        };

        let (url, mut parameters) = RemoteRequest::split_target(&target)?;
        parameters.extend(options.parameters.iter().cloned());
        let method = options.method.or(config_method).unwrap_or_default();

        let id = RequestId(self.next_request);
        self.next_request += 1;
        Ok(RemoteRequest {
            id,
            url,
            method,
            parameters,
        })
    }

    /// Deliver a transport completion.
    ///
    /// Runs the caller's completion override when one was supplied with the
    /// request, otherwise the response router. Either way the handler runs
    /// with the request's original context.
    pub fn complete_remote(&mut self, tree: &mut DomTree, id: RequestId, response: &RemoteResponse) {
        let Some(pending) = self.pending.remove(&id) else {
            tracing::debug!(id = id.0, "completion for untracked request");
            return;
        };
        let result = match pending.on_complete {
            Some(on_complete) => on_complete(self, tree, &pending.context, response),
            None => self.on_remote_complete(tree, &pending.context, response),
        };
        if let Err(err) = result {
            self.report(&err);
        }
    }

    /// The response router.
    ///
    /// The remote-action name comes from the context element's own
    /// configuration, or failing that from the response payload. No name
    /// means no handler runs, which is not an error. A failed transport
    /// appends `Failure` to the name before lookup. Handler errors are
    /// caught here and routed to the error sink.
    pub fn on_remote_complete(
        &mut self,
        tree: &mut DomTree,
        context: &RemoteContext,
        response: &RemoteResponse,
    ) -> Result<(), EngineError> {
        let configured = match context {
            RemoteContext::Element(element) => {
                codec::read_config(tree, *element, "remoteAction").map(|v| v.into_string())
            }
            RemoteContext::Endpoint(_) => None,
        };
        let Some(mut name) = configured.or_else(|| response.remote_action()) else {
            return Ok(());
        };
        if name.is_empty() {
            return Ok(());
        }

        if !response.success() {
            name.push_str("Failure");
        }
        let Some(handler) = self.registry().remote_action(&name) else {
            tracing::debug!(name = %name, "no remote action registered");
            return Ok(());
        };
        if let Err(err) = handler(tree, context, response) {
            self.report(&err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use behave_net::RecordingTransport;

    use super::*;
    use crate::registry::RemoteActionFn;

    fn element_page(attrs: &[(&str, &str)]) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let link = tree.create_element_with("a", attrs);
        let root = tree.root();
        tree.append_child(root, link);
        (tree, link)
    }

    fn recording_action(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> RemoteActionFn {
        let log = Rc::clone(log);
        let tag = tag.to_string();
        Rc::new(move |_, _, _| {
            log.borrow_mut().push(tag.clone());
            Ok(())
        })
    }

    #[test]
    fn test_request_derived_from_element() {
        let (mut tree, link) = element_page(&[
            ("href", "/items/3?tab=all"),
            ("data-method", "delete"),
        ]);

        let transport = RecordingTransport::new();
        let sent = transport.log();
        let mut engine = Engine::new();
        engine.set_transport(Box::new(transport));

        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();

        let requests = sent.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, id);
        assert_eq!(requests[0].url, "/items/3");
        assert_eq!(requests[0].method, Method::Delete);
        assert_eq!(
            requests[0].parameters,
            vec![("tab".to_string(), "all".to_string())]
        );
    }

    #[test]
    fn test_explicit_options_override_element_config() {
        let (mut tree, link) = element_page(&[("href", "/items/3"), ("data-method", "delete")]);

        let transport = RecordingTransport::new();
        let sent = transport.log();
        let mut engine = Engine::new();
        engine.set_transport(Box::new(transport));

        engine.perform_remote_request(
            &mut tree,
            RemoteContext::Element(link),
            RequestOptions {
                method: Some(Method::Post),
                parameters: vec![("page".to_string(), "2".to_string())],
                on_complete: None,
            },
        );

        let requests = sent.borrow();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(
            requests[0].parameters,
            vec![("page".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_blank_href_is_skipped_quietly() {
        let (mut tree, link) = element_page(&[]);

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink_errors = Rc::clone(&errors);
        let mut engine = Engine::new();
        engine.on_error(Box::new(move |err| {
            sink_errors.borrow_mut().push(err.to_string());
        }));

        let id = engine.perform_remote_request(
            &mut tree,
            RemoteContext::Element(link),
            RequestOptions::default(),
        );
        assert!(id.is_none());
        assert!(errors.borrow().is_empty());
        assert_eq!(engine.stats().pending_requests, 0);
    }

    #[test]
    fn test_failure_appends_suffix_to_configured_action() {
        let (mut tree, link) =
            element_page(&[("href", "/save"), ("data-remoteAction", "save")]);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        engine.add_remote_actions([
            ("save".to_string(), recording_action(&log, "save")),
            ("saveFailure".to_string(), recording_action(&log, "saveFailure")),
        ]);

        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();
        engine.complete_remote(&mut tree, id, &RemoteResponse::new(500, ""));

        assert_eq!(log.borrow().as_slice(), ["saveFailure"]);
    }

    #[test]
    fn test_payload_action_used_when_element_has_none() {
        let (mut tree, link) = element_page(&[("href", "/save")]);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        engine.add_remote_actions([
            ("save".to_string(), recording_action(&log, "save")),
            ("saveFailure".to_string(), recording_action(&log, "saveFailure")),
        ]);

        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();
        engine.complete_remote(
            &mut tree,
            id,
            &RemoteResponse::new(200, r#"{"remoteAction":"save"}"#),
        );

        assert_eq!(log.borrow().as_slice(), ["save"]);
    }

    #[test]
    fn test_no_action_name_is_not_an_error() {
        let (mut tree, link) = element_page(&[("href", "/save")]);

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink_errors = Rc::clone(&errors);
        let mut engine = Engine::new();
        engine.on_error(Box::new(move |err| {
            sink_errors.borrow_mut().push(err.to_string());
        }));

        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();
        engine.complete_remote(&mut tree, id, &RemoteResponse::new(200, "{}"));

        assert!(errors.borrow().is_empty());
    }

    #[test]
    fn test_caller_completion_override_wins() {
        let (mut tree, link) =
            element_page(&[("href", "/save"), ("data-remoteAction", "save")]);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        engine.add_remote_actions([("save".to_string(), recording_action(&log, "router"))]);

        let override_log = Rc::clone(&log);
        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions {
                    method: None,
                    parameters: Vec::new(),
                    on_complete: Some(Rc::new(move |_, _, _, _| {
                        override_log.borrow_mut().push("override".to_string());
                        Ok(())
                    })),
                },
            )
            .unwrap();
        engine.complete_remote(&mut tree, id, &RemoteResponse::new(200, ""));

        assert_eq!(log.borrow().as_slice(), ["override"]);
        assert_eq!(engine.stats().pending_requests, 0);
    }

    #[test]
    fn test_handler_error_is_caught_at_dispatch_boundary() {
        let (mut tree, link) =
            element_page(&[("href", "/save"), ("data-remoteAction", "save")]);

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink_errors = Rc::clone(&errors);
        let mut engine = Engine::new();
        engine.on_error(Box::new(move |err| {
            sink_errors.borrow_mut().push(err.to_string());
        }));
        let failing: RemoteActionFn = Rc::new(|_, _, _| Err(EngineError::Handler("boom".into())));
        engine.add_remote_actions([("save".to_string(), failing)]);

        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();
        engine.complete_remote(&mut tree, id, &RemoteResponse::new(200, ""));

        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn test_overlapping_requests_are_independent() {
        let (mut tree, link) = element_page(&[("href", "/poll")]);

        let transport = RecordingTransport::new();
        let sent = transport.log();
        let mut engine = Engine::new();
        engine.set_transport(Box::new(transport));

        let first = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();
        let second = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Element(link),
                RequestOptions::default(),
            )
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(sent.borrow().len(), 2);
        assert_eq!(engine.stats().pending_requests, 2);

        engine.complete_remote(&mut tree, second, &RemoteResponse::new(200, ""));
        assert_eq!(engine.stats().pending_requests, 1);
    }

    #[test]
    fn test_endpoint_context_uses_payload_action() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        engine.add_remote_actions([("refresh".to_string(), recording_action(&log, "refresh"))]);

        let mut tree = DomTree::new();
        let id = engine
            .perform_remote_request(
                &mut tree,
                RemoteContext::Endpoint("/status".to_string()),
                RequestOptions::default(),
            )
            .unwrap();
        engine.complete_remote(
            &mut tree,
            id,
            &RemoteResponse::new(200, r#"{"remoteAction":"refresh"}"#),
        );

        assert_eq!(log.borrow().as_slice(), ["refresh"]);
    }
}
