//! Error types for the wadl crate
//!
//! This module defines all error types used throughout the library.
//! A malformed description fails the whole load; a missing or invalid
//! parameter value is always attributable to one named parameter.

use std::fmt;
use thiserror::Error;

use crate::http::{Fault, TransportError};

/// Result type alias using the wadl Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wadl operations
#[derive(Error, Debug)]
pub enum Error {
    /// The description document is malformed (missing required attribute,
    /// duplicate single child, wrong root element)
    #[error("description error: {0}")]
    Description(#[from] DescriptionError),

    /// A parameter value is missing or invalid
    #[error("parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// The HTTP exchange itself failed (no response was produced)
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The target API returned a documented fault response
    #[error("{0}")]
    Fault(Box<Fault>),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        Error::Fault(Box::new(fault))
    }
}

impl Error {
    /// Return the declared fault identifier if this error is a fault
    /// with an id, e.g. for selective handling of documented failure
    /// modes of the target API.
    pub fn fault_id(&self) -> Option<&str> {
        match self {
            Error::Fault(fault) => fault.id.as_deref(),
            _ => None,
        }
    }
}

/// Malformed description error with context
#[derive(Debug, Clone)]
pub struct DescriptionError {
    /// Error message
    pub message: String,
    /// Element that caused the error
    pub element: Option<String>,
}

impl DescriptionError {
    /// Create a new description error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element: None,
        }
    }

    /// Set the offending element name
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

impl fmt::Display for DescriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref element) = self.element {
            write!(f, " (in element <{}>)", element)?;
        }

        Ok(())
    }
}

impl std::error::Error for DescriptionError {}

/// Category of a parameter, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamCategory {
    /// Parameter bound into the URI path
    Path,
    /// Parameter bound into the query string
    Query,
    /// Parameter bound into a request header
    Header,
    /// Parameter bound into a urlencoded form body
    Form,
}

impl ParamCategory {
    /// Get the category as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamCategory::Path => "path",
            ParamCategory::Query => "query",
            ParamCategory::Header => "header",
            ParamCategory::Form => "form",
        }
    }
}

impl fmt::Display for ParamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for a missing or invalid parameter value, always naming the
/// parameter it refers to
#[derive(Error, Debug, Clone)]
pub enum ParameterError {
    /// A required parameter was never bound to a value
    #[error("missing a value for required {category} parameter \"{name}\"")]
    Missing {
        /// Parameter name
        name: String,
        /// Parameter category
        category: ParamCategory,
    },

    /// A bound value is not among the declared option values
    #[error("\"{value}\" is not among the acceptable values for parameter \"{name}\" (\"{acceptable}\")")]
    InvalidValue {
        /// Parameter name
        name: String,
        /// The rejected value
        value: String,
        /// The declared option values, comma-joined
        acceptable: String,
    },

    /// Multiple values were supplied for a non-repeating parameter
    #[error("multiple values provided for single-value parameter \"{name}\"")]
    MultipleValues {
        /// Parameter name
        name: String,
    },
}

impl ParameterError {
    /// The name of the parameter this error refers to
    pub fn param_name(&self) -> &str {
        match self {
            ParameterError::Missing { name, .. }
            | ParameterError::InvalidValue { name, .. }
            | ParameterError::MultipleValues { name } => name,
        }
    }

    pub(crate) fn missing(name: impl Into<String>, category: ParamCategory) -> Self {
        ParameterError::Missing {
            name: name.into(),
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_error_display() {
        let err =
            DescriptionError::new("missing required attribute \"name\"").with_element("param");

        let msg = format!("{}", err);
        assert!(msg.contains("missing required attribute"));
        assert!(msg.contains("<param>"));
    }

    #[test]
    fn test_parameter_error_names_parameter() {
        let err = ParameterError::missing("fate", ParamCategory::Path);
        assert_eq!(err.param_name(), "fate");
        assert_eq!(
            format!("{}", err),
            "missing a value for required path parameter \"fate\""
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParameterError::missing("a", ParamCategory::Query).into();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn test_fault_id() {
        let fault = Fault::new(400, Some("BadSeed".to_string()));
        let err: Error = fault.into();
        assert_eq!(err.fault_id(), Some("BadSeed"));
    }
}
