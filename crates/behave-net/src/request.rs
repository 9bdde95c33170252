//! Remote requests and the transport seam
//!
//! A request carries everything the environment needs to perform the HTTP
//! call; completion is delivered back to the engine by request id, so
//! overlapping requests stay independent (no coalescing, no cancellation).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded;

use crate::NetError;

/// Identifier for an in-flight remote request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    /// Parse a verb case-insensitively; unknown verbs fall back to GET
    pub fn parse(verb: &str) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            _ => Self::Get,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
        }
    }

    #[inline]
    pub fn is_get(self) -> bool {
        self == Self::Get
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled remote request, ready for the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub id: RequestId,
    pub url: String,
    pub method: Method,
    pub parameters: Vec<(String, String)>,
}

impl RemoteRequest {
    /// Split a request target into its bare URL and any query parameters.
    ///
    /// Targets may be absolute (`https://host/path?a=1`) or server-relative
    /// (`/items/3?a=1`); absolute targets are validated, relative ones are
    /// taken as-is.
    pub fn split_target(target: &str) -> Result<(String, Vec<(String, String)>), NetError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(NetError::EmptyTarget);
        }
        if target.contains("://") && Url::parse(target).is_err() {
            return Err(NetError::InvalidUrl(target.to_string()));
        }

        match target.split_once('?') {
            Some((url, query)) => {
                let parameters = form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                Ok((url.to_string(), parameters))
            }
            None => Ok((target.to_string(), Vec::new())),
        }
    }
}

/// Environment-provided request dispatch.
///
/// The transport takes ownership of the request and performs the HTTP call
/// on its own schedule; the response is handed back to the engine later,
/// keyed by the request id.
pub trait Transport {
    fn dispatch(&mut self, request: RemoteRequest);
}

/// Transport for environments without networking: logs and drops
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn dispatch(&mut self, request: RemoteRequest) {
        tracing::debug!(
            id = request.id.0,
            url = %request.url,
            method = %request.method,
            "dropping remote request (no transport configured)"
        );
    }
}

/// Transport double that records every dispatched request
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Rc<RefCell<Vec<RemoteRequest>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle onto the dispatch log
    pub fn log(&self) -> Rc<RefCell<Vec<RemoteRequest>>> {
        Rc::clone(&self.sent)
    }
}

impl Transport for RecordingTransport {
    fn dispatch(&mut self, request: RemoteRequest) {
        self.sent.borrow_mut().push(request);
    }
}
