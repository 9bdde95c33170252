//! Default link behaviors and their helper bundle
//!
//! The built-in `default` behavior runs confirmation, then popup, then
//! non-GET method emulation, first handler wins; `remote` stops navigation,
//! confirms, and dispatches a remote request. The helpers backing them live
//! in an overridable bundle, and all user-visible effects go through the
//! environment's [`Chrome`].

use std::rc::Rc;

use behave_dom::{DomTree, NodeId};
use behave_net::Method;

use crate::EngineError;
use crate::codec::{self, ConfigValue};
use crate::engine::Engine;
use crate::event::BehaviorEvent;
use crate::registry::{Behavior, ReadyGuard};
use crate::remote::{RemoteContext, RequestOptions};

/// Confirmation helper: `true` to proceed
pub type ConfirmationFn = Rc<dyn Fn(&mut Engine, &mut DomTree, NodeId, &mut BehaviorEvent) -> bool>;
/// Popup helper: decodes the popup decision without performing it
pub type PopupFn = Rc<dyn Fn(&DomTree, NodeId) -> Option<PopupAction>>;
/// Method-emulation helper
pub type MethodFn =
    Rc<dyn Fn(&mut Engine, &mut DomTree, NodeId, &mut BehaviorEvent) -> Result<(), EngineError>>;

/// The helper bundle backing the built-in behaviors.
///
/// Replace the whole bundle or individual entries on
/// [`Engine::helpers`](crate::Engine) to change how links confirm, pop up,
/// or submit.
#[derive(Clone)]
pub struct Helpers {
    pub confirmation: ConfirmationFn,
    pub popup: PopupFn,
    pub method: MethodFn,
}

impl Default for Helpers {
    fn default() -> Self {
        Self {
            confirmation: Rc::new(confirmation_helper),
            popup: Rc::new(popup_helper),
            method: Rc::new(method_helper),
        }
    }
}

/// Environment surface for user-visible effects
pub trait Chrome {
    /// Modal confirmation; `true` means the user accepted
    fn confirm(&mut self, message: &str) -> bool;
    /// Open a new browsing context
    fn open_window(&mut self, url: &str, name: &str, options: &str);
    /// Submit a synthesized form
    fn submit_form(&mut self, submission: &FormSubmission);
}

/// Chrome for headless environments: accepts confirmations, logs the rest
#[derive(Debug, Default)]
pub struct NullChrome;

impl Chrome for NullChrome {
    fn confirm(&mut self, message: &str) -> bool {
        tracing::debug!(message, "auto-confirming");
        true
    }

    fn open_window(&mut self, url: &str, name: &str, options: &str) {
        tracing::debug!(url, name, options, "dropping popup (no chrome configured)");
    }

    fn submit_form(&mut self, submission: &FormSubmission) {
        tracing::debug!(
            action = %submission.action,
            method = %submission.method,
            "dropping form submission (no chrome configured)"
        );
    }
}

/// A decoded popup decision.
///
/// Decoding is separated from the effect so the decision is testable;
/// performing it through [`Engine::open_popup`](crate::Engine) stops the
/// event and opens the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupAction {
    pub url: String,
    pub window_name: String,
    pub window_options: String,
}

/// A synthesized form ready for submission
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub action: String,
    pub method: Method,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    /// Collect action, method, and named input fields from a form subtree
    pub fn collect(tree: &DomTree, form: NodeId) -> Self {
        let action = tree.attr(form, "action").unwrap_or("").to_string();
        let method = Method::parse(tree.attr(form, "method").unwrap_or(""));
        let mut fields = Vec::new();
        for id in tree.descendants(form) {
            if tree.tag(id) != Some("input") {
                continue;
            }
            if let Some(name) = tree.attr(id, "name") {
                fields.push((
                    name.to_string(),
                    tree.attr(id, "value").unwrap_or("").to_string(),
                ));
            }
        }
        Self {
            action,
            method,
            fields,
        }
    }

    /// Encode fields as an application/x-www-form-urlencoded string
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        for (name, value) in &self.fields {
            parts.push(format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            ));
        }
        parts.join("&")
    }
}

/// The built-in `default` click behavior
pub fn default_behavior() -> Behavior {
    Rc::new(default_click)
}

/// The built-in `remote` click behavior
pub fn remote_behavior() -> Behavior {
    Rc::new(remote_click)
}

fn default_click(
    engine: &mut Engine,
    tree: &mut DomTree,
    element: NodeId,
    event: &mut BehaviorEvent,
) -> Result<Option<ReadyGuard>, EngineError> {
    let confirmation = engine.helpers.confirmation.clone();
    if !confirmation(engine, tree, element, event) {
        return Ok(None);
    }

    // confirmation succeeded or was not required; check popup configuration
    let popup = engine.helpers.popup.clone();
    if let Some(action) = popup(tree, element) {
        engine.open_popup(action, event);
        return Ok(None);
    }

    // no popup was opened; the link may need a non-GET request
    let method = engine.helpers.method.clone();
    method(engine, tree, element, event)?;
    Ok(None)
}

fn remote_click(
    engine: &mut Engine,
    tree: &mut DomTree,
    element: NodeId,
    event: &mut BehaviorEvent,
) -> Result<Option<ReadyGuard>, EngineError> {
    event.stop();

    let confirmation = engine.helpers.confirmation.clone();
    if !confirmation(engine, tree, element, event) {
        return Ok(None);
    }
    engine.perform_remote_request(
        tree,
        RemoteContext::Element(element),
        RequestOptions::default(),
    );
    Ok(None)
}

fn confirmation_helper(
    engine: &mut Engine,
    tree: &mut DomTree,
    element: NodeId,
    event: &mut BehaviorEvent,
) -> bool {
    // no confirmation message configured
    let Some(content) = codec::read_config(tree, element, "confirm") else {
        return true;
    };
    if !content.truthy() {
        return true;
    }

    if engine.confirm(&content.into_string()) {
        true
    } else {
        event.stop();
        false
    }
}

fn popup_helper(tree: &DomTree, element: NodeId) -> Option<PopupAction> {
    let raw = codec::read_config(tree, element, "popup")?;
    if !raw.truthy() {
        return None;
    }
    let (window_name, window_options) = codec::popup_params(&raw.into_string())?;
    let url = tree.attr(element, "href").unwrap_or("").to_string();
    Some(PopupAction {
        url,
        window_name,
        window_options,
    })
}

fn method_helper(
    engine: &mut Engine,
    tree: &mut DomTree,
    element: NodeId,
    event: &mut BehaviorEvent,
) -> Result<(), EngineError> {
    let method = codec::read_config_or(tree, element, "method", ConfigValue::Str("get".into()))
        .into_string();

    // nothing to do for a plain GET link
    if method.eq_ignore_ascii_case("get") {
        return Ok(());
    }

    // the link carries another verb: synthesize a hidden form and submit it
    event.stop();
    let href = tree.attr(element, "href").unwrap_or("").to_string();
    let form = tree.create_element_with(
        "form",
        &[
            ("style", "display:none;"),
            ("method", "post"),
            ("action", &href),
        ],
    );
    if !method.eq_ignore_ascii_case("post") {
        // carry the real verb in a hidden _method field
        let field = tree.create_element_with(
            "input",
            &[("type", "hidden"), ("name", "_method"), ("value", &method)],
        );
        tree.append_child(form, field);
    }
    let root = tree.root();
    tree.append_child(root, form);

    let submission = FormSubmission::collect(tree, form);
    engine.submit_form(&submission);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_submission_collects_fields() {
        let mut tree = DomTree::new();
        let form = tree.create_element_with("form", &[("action", "/items/3"), ("method", "post")]);
        let field = tree.create_element_with(
            "input",
            &[("type", "hidden"), ("name", "_method"), ("value", "delete")],
        );
        let unnamed = tree.create_element_with("input", &[("type", "hidden")]);
        tree.append_child(form, field);
        tree.append_child(form, unnamed);
        let root = tree.root();
        tree.append_child(root, form);

        let submission = FormSubmission::collect(&tree, form);
        assert_eq!(submission.action, "/items/3");
        assert_eq!(submission.method, Method::Post);
        assert_eq!(
            submission.fields,
            vec![("_method".to_string(), "delete".to_string())]
        );
    }

    #[test]
    fn test_form_submission_query_string_is_encoded() {
        let submission = FormSubmission {
            action: "/x".into(),
            method: Method::Post,
            fields: vec![("q".to_string(), "a b&c".to_string())],
        };
        assert_eq!(submission.to_query_string(), "q=a%20b%26c");
    }

    #[test]
    fn test_popup_helper_decodes_configuration() {
        let mut tree = DomTree::new();
        let link = tree.create_element_with(
            "a",
            &[
                ("href", "/report"),
                ("data-popup", r#"["preview","width=640"]"#),
            ],
        );
        let root = tree.root();
        tree.append_child(root, link);

        let action = popup_helper(&tree, link).unwrap();
        assert_eq!(action.url, "/report");
        assert_eq!(action.window_name, "preview");
        assert_eq!(action.window_options, "width=640");
    }

    #[test]
    fn test_popup_helper_absent_or_malformed() {
        let mut tree = DomTree::new();
        let plain = tree.create_element_with("a", &[("href", "/report")]);
        let broken = tree.create_element_with(
            "a",
            &[("href", "/report"), ("data-popup", "not json")],
        );
        let root = tree.root();
        tree.append_child(root, plain);
        tree.append_child(root, broken);

        assert_eq!(popup_helper(&tree, plain), None);
        assert_eq!(popup_helper(&tree, broken), None);
    }
}
