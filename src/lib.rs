//! # wadl
//!
//! A WADL client library: parses a REST API description (WADL, an XML
//! dialect) into a navigable, callable in-memory model. Applications
//! traverse the resource tree, bind parameter values, and issue HTTP
//! calls whose URIs, query strings and headers are assembled according
//! to the rules encoded in the description.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wadl::{Application, Bindings, CallArgs};
//!
//! let app = Application::from_file("service.wadl")?;
//!
//! // Look up a resource and read its bound URI.
//! let palette = app.find_resource("palette").unwrap();
//! let uri = palette.uri(&Bindings::new().query("api_key", "secret"))?;
//!
//! // Or issue the call through a transport.
//! let response = palette.get(
//!     &CallArgs::new().bindings(Bindings::new().query("api_key", "secret")),
//!     &transport,
//! )?;
//! ```
//!
//! Binding never mutates shared state: a partially-bound resource is a
//! template, and every `bind` works on a deep copy of its address. The
//! loaded description itself is immutable and safe to share read-only
//! across threads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod documents;
pub mod error;
pub mod formats;
pub mod http;
pub mod params;
pub mod resources;
pub mod schema;

// Re-exports for convenience
pub use address::{Address, Bindings, UriParts};
pub use error::{DescriptionError, Error, ParamCategory, ParameterError, Result};
pub use formats::{FaultFormat, RepresentationFormat, RequestFormat, ResponseFormat};
pub use http::{
    basic_auth, CallArgs, Fault, HttpRequest, HttpResponse, Method, Response, Transport,
    TransportError,
};
pub use params::{Param, ParamStyle, Value};
pub use resources::{
    Application, BoundResource, Documentation, Resource, ResourceList, ResourceType,
};

/// Version of the wadl library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The current WADL namespace
pub const WADL_NAMESPACE: &str = "http://wadl.dev.java.net/2009/02";

/// The historical Sun Labs WADL namespace, still seen in the wild
pub const WADL_NAMESPACE_2006: &str = "http://research.sun.com/wadl/2006/10";
