//! Addresses: the user's path through a resource graph
//!
//! An [`Address`] keeps track of the path fragments, bound query and
//! header values, and still-open parameter pools accumulated while
//! walking from the application root to a resource. Values may be
//! supplied at any time with [`Address::bind`]; an address cannot be
//! turned into a URI and header set until every required parameter has
//! been bound.
//!
//! Binding is irreversible for the instance it runs on, and `Clone` is
//! a deep copy: cloning before every bind is what lets one
//! partially-bound address serve as a template for many calls.

use std::fmt;

use indexmap::IndexMap;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ParamCategory, ParameterError, Result};
use crate::params::{format_default, Param, Value};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

/// The `{name}` placeholders embedded in a path fragment, in order
pub fn embedded_param_names(fragment: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(fragment)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Values to bind, keyed by parameter name and grouped by category
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    path: IndexMap<String, Value>,
    query: IndexMap<String, Value>,
    headers: IndexMap<String, Value>,
}

impl Bindings {
    /// Create an empty set of bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply a value for a path parameter
    pub fn path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    /// Supply a value for a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Supply a value for a header parameter
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether no values were supplied
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty() && self.headers.is_empty()
    }

    pub(crate) fn path_value(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }

    pub(crate) fn query_value(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    pub(crate) fn header_value(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }
}

/// One entry of an address's path
#[derive(Debug, Clone)]
pub(crate) enum PathFragment<'a> {
    /// A literal string that may contain `{name}` placeholders
    Template(String),
    /// Free-standing path params (matrix or plain styled), bound one
    /// by one into rendered strings
    Params(Vec<Piece<'a>>),
}

#[derive(Debug, Clone)]
pub(crate) enum Piece<'a> {
    Unbound(Param<'a>),
    Bound(String),
}

/// The accumulated, partially-bound path/query/header state for one
/// path through the resource graph
#[derive(Debug, Clone, Default)]
pub struct Address<'a> {
    path_fragments: Vec<PathFragment<'a>>,
    query_vars: Vec<String>,
    headers: IndexMap<String, String>,
    path_params: IndexMap<String, Param<'a>>,
    query_params: IndexMap<String, Param<'a>>,
    header_params: IndexMap<String, Param<'a>>,
    auth: IndexMap<String, String>,
}

impl<'a> Address<'a> {
    /// Create an empty address
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_base(base: &str) -> Self {
        let mut address = Self::new();
        address.push_template(base);
        address
    }

    pub(crate) fn push_template(&mut self, path: &str) {
        self.path_fragments
            .push(PathFragment::Template(path.to_string()));
    }

    pub(crate) fn push_param_fragment(&mut self, params: Vec<Param<'a>>) {
        self.path_fragments.push(PathFragment::Params(
            params.into_iter().map(Piece::Unbound).collect(),
        ));
    }

    pub(crate) fn add_path_param(&mut self, param: Param<'a>) {
        self.path_params.insert(param.name().to_string(), param);
    }

    pub(crate) fn add_query_param(&mut self, param: Param<'a>) {
        self.query_params.insert(param.name().to_string(), param);
    }

    pub(crate) fn add_header_param(&mut self, param: Param<'a>) {
        self.header_params.insert(param.name().to_string(), param);
    }

    /// Names of the still-unbound path parameters
    pub fn open_path_params(&self) -> Vec<&str> {
        self.path_params.keys().map(|k| k.as_str()).collect()
    }

    /// Names of the still-unbound query parameters
    pub fn open_query_params(&self) -> Vec<&str> {
        self.query_params.keys().map(|k| k.as_str()).collect()
    }

    /// Names of the still-unbound header parameters
    pub fn open_header_params(&self) -> Vec<&str> {
        self.header_params.keys().map(|k| k.as_str()).collect()
    }

    /// The headers bound so far
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Queue a header value (typically pre-computed credentials) to be
    /// merged into this address on every future bind
    pub fn auth(&mut self, header: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.auth.insert(header.into(), value.into());
        self
    }

    /// Bind some or all of the unbound parameters to values.
    ///
    /// A path placeholder is substituted only when its value is
    /// determinable: supplied here, or declared `fixed` or `default`.
    /// Everything else stays open for a later bind. Bound parameters
    /// leave their pools for good.
    pub fn bind(&mut self, bindings: &Bindings) -> Result<()> {
        for (header, value) in self.auth.clone() {
            self.headers.insert(header, value);
        }

        for fragment in &mut self.path_fragments {
            match fragment {
                PathFragment::Template(template) => {
                    for name in embedded_param_names(template) {
                        let value = bindings.path_value(&name);
                        if let Some(param) = self.path_params.get(&name).copied() {
                            if value.is_some() || param.self_determined() {
                                let formatted =
                                    param.format_in(value, ParamCategory::Path)?;
                                *template =
                                    template.replace(&format!("{{{}}}", name), &formatted);
                                self.path_params.shift_remove(&name);
                            }
                        } else if value.is_some() {
                            let formatted = format_default(&name, value)?;
                            *template = template.replace(&format!("{{{}}}", name), &formatted);
                        }
                    }
                }
                PathFragment::Params(pieces) => {
                    for piece in pieces {
                        if let Piece::Unbound(param) = piece {
                            let name = param.name().to_string();
                            let value = bindings.path_value(&name);
                            if value.is_some() || param.self_determined() {
                                let formatted =
                                    param.format_in(value, ParamCategory::Path)?;
                                self.path_params.shift_remove(&name);
                                *piece = Piece::Bound(formatted);
                            }
                        }
                    }
                }
            }
        }

        for (name, param) in std::mem::take(&mut self.query_params) {
            match bindings.query_value(&name) {
                Some(value) => {
                    let formatted = param.format_in(Some(value), ParamCategory::Query)?;
                    if !formatted.is_empty() {
                        self.query_vars.push(formatted);
                    }
                }
                None => {
                    self.query_params.insert(name, param);
                }
            }
        }

        for (name, param) in std::mem::take(&mut self.header_params) {
            match bindings.header_value(&name) {
                Some(value) => {
                    let formatted = param.format_in(Some(value), ParamCategory::Header)?;
                    self.headers.insert(name, formatted);
                }
                None => {
                    self.header_params.insert(name, param);
                }
            }
        }
        for name in bindings.headers.keys() {
            if !self.headers.contains_key(name) && !self.auth.contains_key(name) {
                warn!("ignoring value for undeclared header parameter \"{}\"", name);
            }
        }

        Ok(())
    }

    /// Clone, bind the given values, and serialize into a URI, bound
    /// query list, and header set.
    ///
    /// Fails with a parameter error naming the first parameter that is
    /// still required: an unsubstituted `{name}` placeholder, an
    /// unbound required free-standing path param, or a required query
    /// or header param left in its pool.
    pub fn uri(&self, bindings: &Bindings) -> Result<UriParts> {
        let mut bound = self.clone();
        bound.bind(bindings)?;
        bound.finish()
    }

    fn finish(mut self) -> Result<UriParts> {
        let mut uri = String::new();

        for fragment in &self.path_fragments {
            match fragment {
                PathFragment::Template(template) => {
                    let mut text = template.clone();
                    for name in embedded_param_names(template) {
                        let formatted = match self.path_params.get(&name) {
                            Some(param) => param.format_in(None, ParamCategory::Path)?,
                            None => {
                                return Err(
                                    ParameterError::missing(name, ParamCategory::Path).into()
                                )
                            }
                        };
                        text = text.replace(&format!("{{{}}}", name), &formatted);
                        self.path_params.shift_remove(&name);
                    }
                    if !text.is_empty() {
                        push_segment(&mut uri, &text);
                    }
                }
                PathFragment::Params(pieces) => {
                    for piece in pieces {
                        let formatted = match piece {
                            Piece::Bound(s) => s.clone(),
                            Piece::Unbound(param) => {
                                param.format_in(None, ParamCategory::Path)?
                            }
                        };
                        if !formatted.is_empty() {
                            push_segment(&mut uri, &formatted);
                        }
                    }
                }
            }
        }

        for param in self.query_params.values() {
            if param.required() {
                return Err(ParameterError::missing(param.name(), ParamCategory::Query).into());
            }
        }
        for param in self.header_params.values() {
            if param.required() {
                return Err(ParameterError::missing(param.name(), ParamCategory::Header).into());
            }
        }

        Ok(UriParts {
            uri,
            query: self.query_vars,
            headers: self.headers,
        })
    }
}

/// Append a path fragment, separating with `/` unless one is already
/// there
fn push_segment(uri: &mut String, fragment: &str) {
    if !uri.is_empty() && !uri.ends_with('/') {
        uri.push('/');
    }
    uri.push_str(fragment);
}

/// The logical parts of a fully-bound request URI
#[derive(Debug, Clone, PartialEq)]
pub struct UriParts {
    /// The path portion, base included
    pub uri: String,
    /// Pre-formatted query variables
    pub query: Vec<String>,
    /// Bound header values
    pub headers: IndexMap<String, String>,
}

impl UriParts {
    /// The joined query string, without the leading `?`
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("&")
    }

    /// A bound header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Parse the rendered URI into a [`Url`]
    pub fn to_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.to_string())?)
    }
}

impl fmt::Display for UriParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)?;
        let query_string = self.query_string();
        if !query_string.is_empty() {
            write!(
                f,
                "{}{}",
                if self.uri.contains('?') { '&' } else { '?' },
                query_string
            )?;
        }
        Ok(())
    }
}

impl PartialEq<&str> for UriParts {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}
