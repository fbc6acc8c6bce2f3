//! Request, response, representation and fault formats
//!
//! The declared body shapes of a method: [`RequestFormat`] merges
//! method-level parameters into the resource address, and
//! [`ResponseFormat::build`] classifies a transport response against the
//! declared faults and representations to produce a typed result.

use indexmap::IndexMap;

use crate::address::{Bindings, UriParts};
use crate::documents::{Document, Element};
use crate::error::{DescriptionError, ParamCategory, ParameterError, Result};
use crate::http::{Fault, HttpResponse, Response};
use crate::params::{Param, ParamStyle, Value};
use crate::resources::{docs_of, BoundResource, Documentation};
use crate::schema::{EntityKind, Graph, NodeId};

/// The one media type the crate can build request bodies for
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// The underlying MIME subtype of a media type, used as the second-tier
/// match during response classification so that e.g. `application/xml`
/// and `text/xml` pair up. Vendor and experimental prefixes are
/// stripped.
pub fn raw_subtype(media_type: &str) -> Option<&str> {
    let essence = media_type.split(';').next()?.trim();
    let subtype = essence.split('/').nth(1)?;
    if subtype.is_empty() {
        return None;
    }
    Some(subtype.strip_prefix("x-").unwrap_or(subtype))
}

/// Parse an XML-typed body and narrow it to the format's declared root
/// element. Anything unparseable is left raw.
fn parse_xml_body(
    media_type: Option<&str>,
    element: Option<&str>,
    body: &[u8],
) -> Option<Element> {
    let media_type = media_type?;
    if !media_type.contains("xml") {
        return None;
    }
    let document = Document::parse(body).ok()?;
    let root = document.root?;
    match element {
        // Element names are matched on their local part.
        Some(name) => {
            let local = name.rsplit(':').next().unwrap_or(name);
            root.find_descendant(local).cloned()
        }
        None => Some(root),
    }
}

/// View over a `representation` node
#[derive(Debug, Clone, Copy)]
pub struct RepresentationFormat<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> RepresentationFormat<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The representation id
    pub fn id(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "id")
    }

    /// The declared media type
    pub fn media_type(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "mediaType")
    }

    /// The declared root element of an XML body
    pub fn element(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "element")
    }

    /// The body parameters
    pub fn params(&self) -> Vec<Param<'a>> {
        self.graph
            .many(self.node, EntityKind::Param)
            .into_iter()
            .map(|node| Param::new(self.graph, node))
            .collect()
    }

    /// The representation's documentation
    pub fn docs(&self) -> Vec<Documentation<'a>> {
        docs_of(self.graph, self.node)
    }

    /// Whether this representation describes a submitted form
    pub fn is_form(&self) -> bool {
        matches!(
            self.media_type(),
            Some(FORM_URLENCODED) | Some("multipart/form-data")
        )
    }

    /// Build a urlencoded body by plugging values into this format's
    /// parameters.
    ///
    /// A `fixed` declaration wins over any supplied value; a required
    /// parameter with no value fails, naming the parameter; multiple
    /// values are legal only for a repeating parameter.
    pub fn form_body(&self, values: &IndexMap<String, Value>) -> Result<String> {
        if self.media_type() != Some(FORM_URLENCODED) {
            return Err(DescriptionError::new(format!(
                "cannot build a representation of type {}",
                self.media_type().unwrap_or("<none>")
            ))
            .with_element("representation")
            .into());
        }

        let mut body = form_urlencoded::Serializer::new(String::new());
        for param in self.params() {
            let name = param.name();
            if let Some(fixed) = param.fixed() {
                body.append_pair(name, fixed);
            } else if let Some(value) = values.get(name) {
                match value {
                    Value::One(v) => {
                        body.append_pair(name, v);
                    }
                    Value::Many(vs) => {
                        if !param.repeating() {
                            return Err(ParameterError::MultipleValues {
                                name: name.to_string(),
                            }
                            .into());
                        }
                        for v in vs {
                            body.append_pair(name, v);
                        }
                    }
                }
            } else if param.required() {
                return Err(ParameterError::missing(name, ParamCategory::Form).into());
            }
        }
        Ok(body.finish())
    }
}

/// View over a `fault` node
#[derive(Debug, Clone, Copy)]
pub struct FaultFormat<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> FaultFormat<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The declared fault identifier, the handle for selective handling
    pub fn id(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "id")
    }

    /// The declared media type
    pub fn media_type(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "mediaType")
    }

    /// The declared root element of an XML body
    pub fn element(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "element")
    }

    /// The HTTP status this fault is keyed on
    pub fn status(&self) -> Option<u16> {
        self.graph
            .attr(self.node, "status")
            .and_then(|status| status.parse().ok())
    }
}

/// View over a `request` node
#[derive(Debug, Clone, Copy)]
pub struct RequestFormat<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> RequestFormat<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The declared request representations
    pub fn representations(&self) -> Vec<RepresentationFormat<'a>> {
        self.graph
            .many(self.node, EntityKind::Representation)
            .into_iter()
            .map(|node| RepresentationFormat::new(self.graph, node))
            .collect()
    }

    /// The method-level parameters
    pub fn params(&self) -> Vec<Param<'a>> {
        self.graph
            .many(self.node, EntityKind::Param)
            .into_iter()
            .map(|node| Param::new(self.graph, node))
            .collect()
    }

    /// The first representation with the given media type
    pub fn find_representation_by_media_type(
        &self,
        media_type: &str,
    ) -> Option<RepresentationFormat<'a>> {
        self.representations()
            .into_iter()
            .find(|r| r.media_type() == Some(media_type))
    }

    /// The first form representation
    pub fn find_form(&self) -> Option<RepresentationFormat<'a>> {
        self.representations().into_iter().find(|r| r.is_form())
    }

    /// The URI and header set for a call through this request format:
    /// the resource URI with the method-level parameters merged in.
    /// Header-styled parameters land in the header set; everything else
    /// is rendered query-style.
    pub fn uri(&self, resource: &BoundResource<'a>, bindings: &Bindings) -> Result<UriParts> {
        let mut uri = resource.uri(bindings)?;

        for param in self.params() {
            let name = param.name();
            if param.style() == ParamStyle::Header {
                let formatted =
                    param.format_in(bindings.header_value(name), ParamCategory::Header)?;
                if !formatted.is_empty() {
                    uri.headers.insert(name.to_string(), formatted);
                }
            } else {
                let formatted = param.format_as(
                    bindings.query_value(name),
                    ParamStyle::Query,
                    ParamCategory::Query,
                )?;
                if !formatted.is_empty() {
                    uri.query.push(formatted);
                }
            }
        }

        Ok(uri)
    }
}

/// View over a `response` node
#[derive(Debug, Clone, Copy)]
pub struct ResponseFormat<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> ResponseFormat<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The declared response representations
    pub fn representations(&self) -> Vec<RepresentationFormat<'a>> {
        self.graph
            .many(self.node, EntityKind::Representation)
            .into_iter()
            .map(|node| RepresentationFormat::new(self.graph, node))
            .collect()
    }

    /// The declared faults
    pub fn faults(&self) -> Vec<FaultFormat<'a>> {
        self.graph
            .many(self.node, EntityKind::Fault)
            .into_iter()
            .map(|node| FaultFormat::new(self.graph, node))
            .collect()
    }

    /// Classify a transport response against the declared formats.
    ///
    /// Selection order: a fault whose status matches exactly, then a
    /// representation whose declared media type is a prefix of the
    /// actual content type, then one agreeing on the raw MIME subtype,
    /// then one declaring no media type at all. A matching fault format
    /// turns the response into a [`Fault`] error carrying the declared
    /// id; XML-typed bodies are parsed and narrowed to the declared
    /// element either way.
    pub fn build(&self, http: &HttpResponse) -> Result<Response> {
        if let Some(fault) = self
            .faults()
            .into_iter()
            .find(|f| f.status() == Some(http.status))
        {
            let document = parse_xml_body(fault.media_type(), fault.element(), &http.body);
            let mut built = Fault::new(http.status, fault.id().map(String::from))
                .with_headers(http.headers.clone())
                .with_body(http.body.clone());
            if let Some(media_type) = fault.media_type() {
                built = built.with_media_type(media_type);
            }
            if let Some(document) = document {
                built = built.with_document(document);
            }
            return Err(built.into());
        }

        let representations = self.representations();
        let content_type = http.content_type().unwrap_or("");

        let chosen = representations
            .iter()
            .copied()
            .find(|r| {
                r.media_type()
                    .is_some_and(|declared| content_type.starts_with(declared))
            })
            .or_else(|| {
                let actual = raw_subtype(content_type)?;
                representations.iter().copied().find(|r| {
                    r.media_type().and_then(raw_subtype) == Some(actual)
                })
            })
            .or_else(|| {
                representations
                    .iter()
                    .copied()
                    .find(|r| r.media_type().is_none())
            });

        let mut response = Response::untyped(http);
        if let Some(format) = chosen {
            response.format_id = format.id().map(String::from);
            response.media_type = format.media_type().map(String::from);
            response.document =
                parse_xml_body(format.media_type(), format.element(), &http.body);
        }
        Ok(response)
    }
}
