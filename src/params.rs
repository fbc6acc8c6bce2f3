//! WADL parameters and value formatting
//!
//! A [`Param`] is a lightweight view over a `param` node in the loaded
//! graph. Formatting validates a proposed value (required, repeating,
//! declared options) and renders it according to the parameter style:
//! comma-joined and escaped for `plain`, `;name=value` segments for
//! `matrix` (bare `;name` for booleans), `name=value` pairs for
//! `query`, and a comma join for `header`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ParamCategory, ParameterError, Result};
use crate::schema::{EntityKind, Graph, NodeId};

/// Characters escaped in URI components. Everything outside the URI
/// "unreserved" and "reserved" sets is percent-encoded; reserved
/// characters pass through so matrix and path values keep their
/// delimiters.
const URI_UNSAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'[')
    .remove(b']');

/// Percent-encode a URI component
pub(crate) fn escape_uri(value: &str) -> String {
    utf8_percent_encode(value, URI_UNSAFE).to_string()
}

/// XSD boolean lexical values accepted as true
fn is_true(value: &str) -> bool {
    value == "true" || value == "1"
}

/// The style of a parameter, controlling where and how it is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamStyle {
    /// Plain text in the path (the default)
    #[default]
    Plain,
    /// `;name=value` path segment
    Matrix,
    /// Query-string pair (`query` in the document, historically `form`)
    Query,
    /// Request header
    Header,
    /// URI template placeholder
    Template,
}

impl ParamStyle {
    /// Parse a style attribute value; unknown or absent styles are plain
    pub fn parse(style: Option<&str>) -> Self {
        match style {
            Some("query") | Some("form") => ParamStyle::Query,
            Some("matrix") => ParamStyle::Matrix,
            Some("header") => ParamStyle::Header,
            Some("template") => ParamStyle::Template,
            _ => ParamStyle::Plain,
        }
    }
}

/// A value supplied for a parameter: a single string or a repeated list
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// One value
    One(String),
    /// Several values, legal only for repeating parameters
    Many(Vec<String>),
}

impl Value {
    fn as_slice(&self) -> &[String] {
        match self {
            Value::One(v) => std::slice::from_ref(v),
            Value::Many(vs) => vs,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::One(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::One(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::One(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::One(v.to_string())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::One(v.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(vs: Vec<String>) -> Self {
        Value::Many(vs)
    }
}

impl From<Vec<&str>> for Value {
    fn from(vs: Vec<&str>) -> Self {
        Value::Many(vs.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(vs: [&str; N]) -> Self {
        Value::Many(vs.iter().map(|v| v.to_string()).collect())
    }
}

/// Everything formatting needs to know about one parameter
pub(crate) struct ParamFacts<'s> {
    pub name: &'s str,
    pub style: ParamStyle,
    pub required: bool,
    pub repeating: bool,
    pub boolean: bool,
    pub fixed: Option<&'s str>,
    pub default: Option<&'s str>,
    pub options: Vec<&'s str>,
}

impl<'s> ParamFacts<'s> {
    /// The facts of the library-provided default path parameter, used
    /// for a path placeholder that names no declared param: required,
    /// plain style, string typed.
    pub fn default_path_param(name: &'s str) -> Self {
        ParamFacts {
            name,
            style: ParamStyle::Plain,
            required: true,
            repeating: false,
            boolean: false,
            fixed: None,
            default: None,
            options: Vec::new(),
        }
    }

    /// Whether a bind can determine a value without one being supplied
    pub fn self_determined(&self) -> bool {
        self.fixed.is_some() || self.default.is_some()
    }
}

/// Validate and format a proposed value for a parameter.
///
/// A `fixed` declaration wins over any supplied value; a `default`
/// fills in when no value is supplied. With neither, a missing value is
/// an error for a required parameter and renders as the empty string
/// otherwise.
pub(crate) fn format_param(
    facts: &ParamFacts<'_>,
    value: Option<&Value>,
    category: ParamCategory,
) -> Result<String> {
    let fixed_value;
    let values: &[String] = if let Some(fixed) = facts.fixed {
        fixed_value = [fixed.to_string()];
        &fixed_value
    } else if let Some(value) = value {
        let values = value.as_slice();
        if values.len() > 1 && !facts.repeating {
            return Err(ParameterError::MultipleValues {
                name: facts.name.to_string(),
            }
            .into());
        }
        values
    } else if let Some(default) = facts.default {
        fixed_value = [default.to_string()];
        &fixed_value
    } else if facts.required {
        return Err(ParameterError::missing(facts.name, category).into());
    } else {
        // No value supplied and none required; an unbound matrix
        // boolean renders as "off".
        return Ok(String::new());
    };

    if !facts.options.is_empty() {
        for value in values {
            if !facts.options.iter().any(|option| option == value) {
                return Err(ParameterError::InvalidValue {
                    name: facts.name.to_string(),
                    value: value.clone(),
                    acceptable: facts.options.join("\", \""),
                }
                .into());
            }
        }
    }

    let rendered = match facts.style {
        ParamStyle::Query => values
            .iter()
            .map(|v| format!("{}={}", escape_uri(facts.name), escape_uri(v)))
            .collect::<Vec<_>>()
            .join("&"),
        ParamStyle::Matrix => {
            if facts.boolean {
                values
                    .iter()
                    .filter(|v| is_true(v))
                    .map(|_| format!(";{}", facts.name))
                    .collect()
            } else {
                values
                    .iter()
                    .map(|v| format!(";{}={}", escape_uri(facts.name), escape_uri(v)))
                    .collect()
            }
        }
        ParamStyle::Header => values.join(","),
        ParamStyle::Plain | ParamStyle::Template => values
            .iter()
            .map(|v| escape_uri(v))
            .collect::<Vec<_>>()
            .join(","),
    };

    Ok(rendered)
}

/// Format a path placeholder that has no declared param, using the
/// default path parameter (required, plain, string)
pub(crate) fn format_default(name: &str, value: Option<&Value>) -> Result<String> {
    format_param(
        &ParamFacts::default_path_param(name),
        value,
        ParamCategory::Path,
    )
}

/// View over a `param` node in a loaded graph
#[derive(Debug, Clone, Copy)]
pub struct Param<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> PartialEq for Param<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.node == other.node
    }
}

impl<'a> Param<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The parameter name
    pub fn name(&self) -> &'a str {
        self.graph.attr(self.node, "name").unwrap_or("")
    }

    /// The parameter style
    pub fn style(&self) -> ParamStyle {
        ParamStyle::parse(self.graph.attr(self.node, "style"))
    }

    /// The declared type name, e.g. `xsd:boolean`
    pub fn type_name(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "type")
    }

    /// Whether a value must be bound before a URI can be built
    pub fn required(&self) -> bool {
        self.graph.attr(self.node, "required").is_some_and(is_true)
    }

    /// Whether the parameter accepts a list of values
    pub fn repeating(&self) -> bool {
        self.graph.attr(self.node, "repeating").is_some_and(is_true)
    }

    /// The fixed value, overriding anything bound
    pub fn fixed(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "fixed")
    }

    /// The default value used when nothing is bound
    pub fn default_value(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "default")
    }

    /// The XPath into a representation this parameter selects
    pub fn path(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "path")
    }

    /// The enumerated legal values, empty when unconstrained
    pub fn options(&self) -> Vec<&'a str> {
        self.graph
            .many(self.node, EntityKind::OptionValue)
            .into_iter()
            .filter_map(|option| self.graph.attr(option, "value"))
            .collect()
    }

    fn facts(&self, style: Option<ParamStyle>) -> ParamFacts<'a> {
        ParamFacts {
            name: self.name(),
            style: style.unwrap_or_else(|| self.style()),
            required: self.required(),
            repeating: self.repeating(),
            boolean: self.type_name() == Some("xsd:boolean"),
            fixed: self.fixed(),
            default: self.default_value(),
            options: self.options(),
        }
    }

    /// Whether a bind can render this parameter without a supplied value
    pub(crate) fn self_determined(&self) -> bool {
        self.facts(None).self_determined()
    }

    /// Validate and format a proposed value for this parameter
    pub fn format(&self, value: Option<&Value>) -> Result<String> {
        let category = match self.style() {
            ParamStyle::Query => ParamCategory::Query,
            ParamStyle::Header => ParamCategory::Header,
            _ => ParamCategory::Path,
        };
        self.format_in(value, category)
    }

    /// Format with an explicit error category
    pub(crate) fn format_in(&self, value: Option<&Value>, category: ParamCategory) -> Result<String> {
        format_param(&self.facts(None), value, category)
    }

    /// Format with the style overridden (request formats render every
    /// non-header parameter query-style)
    pub(crate) fn format_as(
        &self,
        value: Option<&Value>,
        style: ParamStyle,
        category: ParamCategory,
    ) -> Result<String> {
        format_param(&self.facts(Some(style)), value, category)
    }
}
