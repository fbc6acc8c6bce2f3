//! The request/response pipeline
//!
//! [`Method`] turns a bound resource plus call arguments into an
//! [`HttpRequest`], hands it to the [`Transport`] collaborator, and
//! classifies the returned status/headers/body through the method's
//! declared response format. Transport failures and declared API faults
//! are distinct error kinds: a 4xx/5xx response is still a response,
//! and it is the response format that decides whether it is a [`Fault`].

use std::borrow::Cow;
use std::fmt;

use base64::Engine as _;
use indexmap::IndexMap;

use crate::address::Bindings;
use crate::documents::Element;
use crate::error::Result;
use crate::formats::{RequestFormat, ResponseFormat};
use crate::resources::{docs_of, BoundResource, Documentation};
use crate::schema::{EntityKind, Graph, NodeId};

/// User-Agent sent unless the caller binds one
pub const DEFAULT_USER_AGENT: &str = concat!("wadl/", env!("CARGO_PKG_VERSION"));

/// Content-Type sent unless the caller binds one
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The `Authorization` header value for Basic credentials
pub fn basic_auth(user: &str, password: &str) -> String {
    let credentials =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
    format!("Basic {}", credentials)
}

/// A fully-assembled request, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// The HTTP verb, as declared in the description (e.g. `GET`)
    pub method: String,
    /// The bound URI, query string included
    pub uri: String,
    /// The bound headers
    pub headers: IndexMap<String, String>,
    /// The request body, if any
    pub body: Option<String>,
}

/// What a transport produced: status, headers and raw body bytes
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: u16,
    /// The response headers
    pub headers: IndexMap<String, String>,
    /// The raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A header value by name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The Content-Type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

/// The HTTP exchange itself failed and no response was produced
#[derive(Debug, Clone)]
pub struct TransportError {
    /// What went wrong
    pub message: String,
    /// The request URI, when known
    pub uri: Option<String>,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            uri: None,
        }
    }

    /// Attach the request URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref uri) = self.uri {
            write!(f, " (requesting {})", uri)?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {}

/// The external collaborator that actually talks HTTP.
///
/// Implementations must return a response for any exchange that
/// produced one, including 4xx/5xx statuses; those are classified by
/// the response format, not by the transport.
pub trait Transport {
    /// Execute the request and return the raw response
    fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Arguments for one call: parameter bindings, an optional body, and an
/// optional expected media type
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub(crate) bindings: Bindings,
    pub(crate) body: Option<String>,
    pub(crate) accept: Option<String>,
}

impl CallArgs {
    /// Empty arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// The parameter values to bind for this call
    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// The representation to send as the request body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The media type to expect back; sets the `Accept` header
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }
}

/// View over a `method` node
#[derive(Debug, Clone, Copy)]
pub struct Method<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> Method<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The method id
    pub fn id(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "id")
    }

    /// The HTTP verb, as declared (e.g. `GET`)
    pub fn verb(&self) -> &'a str {
        self.graph.attr(self.node, "name").unwrap_or("")
    }

    /// The method's documentation
    pub fn docs(&self) -> Vec<Documentation<'a>> {
        docs_of(self.graph, self.node)
    }

    /// The declared request format
    pub fn request_format(&self) -> Option<RequestFormat<'a>> {
        self.graph
            .one(self.node, EntityKind::Request)
            .map(|node| RequestFormat::new(self.graph, node))
    }

    /// The declared response format
    pub fn response_format(&self) -> Option<ResponseFormat<'a>> {
        self.graph
            .one(self.node, EntityKind::Response)
            .map(|node| ResponseFormat::new(self.graph, node))
    }

    /// Resolve the request into a URI, headers and body, run it through
    /// the transport, and classify the result.
    pub fn call(
        &self,
        resource: &BoundResource<'a>,
        args: &CallArgs,
        transport: &dyn Transport,
    ) -> Result<Response> {
        let uri = match self.request_format() {
            Some(request) => request.uri(resource, &args.bindings)?,
            None => resource.uri(&args.bindings)?,
        };

        let mut headers = uri.headers.clone();
        if let Some(ref media_type) = args.accept {
            headers.insert("Accept".to_string(), media_type.clone());
        }
        headers
            .entry("User-Agent".to_string())
            .or_insert_with(|| DEFAULT_USER_AGENT.to_string());
        headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| DEFAULT_CONTENT_TYPE.to_string());

        let request = HttpRequest {
            method: self.verb().to_string(),
            uri: uri.to_string(),
            headers,
            body: args.body.clone(),
        };

        let http_response = transport.execute(&request)?;

        match self.response_format() {
            Some(format) => format.build(&http_response),
            None => Ok(Response::untyped(&http_response)),
        }
    }
}

/// A successful, classified service response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The HTTP status code
    pub status: u16,
    /// The response headers
    pub headers: IndexMap<String, String>,
    /// The raw body
    pub body: Vec<u8>,
    /// The matched representation's media type, if one matched
    pub media_type: Option<String>,
    /// The matched representation's id, if one matched
    pub format_id: Option<String>,
    /// The parsed (and element-narrowed) body of an XML representation
    pub document: Option<Element>,
}

impl Response {
    pub(crate) fn untyped(http: &HttpResponse) -> Self {
        Self {
            status: http.status,
            headers: http.headers.clone(),
            body: http.body.clone(),
            media_type: None,
            format_id: None,
            document: None,
        }
    }

    /// The body as text
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A documented failure mode of the target API, carried as an error.
///
/// Unlike a [`TransportError`], a fault is a real response the
/// description declares; the declared `id` is the handle a caller
/// matches on to handle one failure mode selectively.
#[derive(Debug, Clone)]
pub struct Fault {
    /// The HTTP status code
    pub status: u16,
    /// The declared fault identifier
    pub id: Option<String>,
    /// The response headers
    pub headers: IndexMap<String, String>,
    /// The raw body
    pub body: Vec<u8>,
    /// The declared media type of the fault format
    pub media_type: Option<String>,
    /// The parsed (and element-narrowed) body of an XML fault
    pub document: Option<Element>,
}

impl Fault {
    /// Create a fault with the given status and declared id
    pub fn new(status: u16, id: Option<String>) -> Self {
        Self {
            status,
            id,
            headers: IndexMap::new(),
            body: Vec::new(),
            media_type: None,
            document: None,
        }
    }

    /// Attach the response headers
    pub fn with_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Attach the raw body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Attach the declared media type
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Attach the parsed body
    pub fn with_document(mut self, document: Element) -> Self {
        self.document = Some(document);
        self
    }

    /// The body as text
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(ref id) => write!(f, "fault \"{}\" (status {})", id, self.status),
            None => write!(f, "fault (status {})", self.status),
        }
    }
}

impl std::error::Error for Fault {}
