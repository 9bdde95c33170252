//! behave engine - declarative behavior attachment
//!
//! Elements declare behaviors through a compact directive attribute
//! (`data-behaves="click:remote;ready:initWidget"`); the engine resolves
//! which named behaviors are active for the current controller/action
//! context, binds them into the tree (click events through one delegated
//! handler per subtree root), and detaches them symmetrically. A remote
//! dispatch protocol routes network completions to named handlers.

pub mod codec;
mod engine;
mod event;
mod helpers;
mod registry;
mod remote;

pub use engine::{Engine, EngineStats, ErrorSink, Settings, SettingsInit};
pub use event::BehaviorEvent;
pub use helpers::{
    Chrome, ConfirmationFn, FormSubmission, Helpers, MethodFn, NullChrome, PopupAction, PopupFn,
    default_behavior, remote_behavior,
};
pub use registry::{
    ActiveBehaviors, Behavior, BehaviorRegistry, BehaviorScope, LifecycleFn, ReadyGuard,
    RemoteActionFn,
};
pub use remote::{CompleteFn, RemoteContext, RequestOptions};

pub use behave_dom::{DomTree, NodeId};
pub use behave_net::{
    Method, NetError, NullTransport, RecordingTransport, RemoteRequest, RemoteResponse, RequestId,
    Transport,
};

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Required bootstrap configuration is missing or out of order
    #[error("bootstrap: {0}")]
    Bootstrap(&'static str),

    /// A behavior or remote-action handler reported a failure
    #[error("handler error: {0}")]
    Handler(String),

    /// A remote request could not be constructed
    #[error(transparent)]
    Net(#[from] NetError),
}
