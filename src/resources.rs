//! The typed resource graph
//!
//! Lightweight `Copy` views over the loaded node arena: [`Application`]
//! owns the graph, [`ResourceList`] and [`Resource`] navigate it, and
//! [`BoundResource`] pairs a resource with the [`Address`] by which it
//! was reached.
//!
//! A resource view deliberately keeps wrapping the node at its position
//! in the tree, even when that node is a reference placeholder:
//! attribute and child reads resolve through the reference, while the
//! parent chain used for address computation stays the referrer's. That
//! is what rebinds a shared resource to the path context it was reached
//! through.

use std::path::Path;

use crate::address::{embedded_param_names, Address, Bindings, UriParts};
use crate::documents::Document;
use crate::error::{DescriptionError, Result};
use crate::formats::RepresentationFormat;
use crate::http::{basic_auth, CallArgs, Method, Response, Transport};
use crate::params::{Param, ParamStyle};
use crate::schema::{EntityKind, Graph, NodeId};

/// A `doc` annotation on any element
#[derive(Debug, Clone, Copy)]
pub struct Documentation<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> Documentation<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The documentation title
    pub fn title(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "title")
    }

    /// The language of the prose
    pub fn lang(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "xml:lang")
    }

    /// The prose itself, tags stripped
    pub fn text(&self) -> &'a str {
        self.graph.node(self.node).contents().unwrap_or("")
    }
}

pub(crate) fn docs_of(graph: &Graph, node: NodeId) -> Vec<Documentation<'_>> {
    graph
        .many(node, EntityKind::Documentation)
        .into_iter()
        .map(|doc| Documentation::new(graph, doc))
        .collect()
}

/// A loaded WADL description, the entry point of the crate.
///
/// Owns the node arena; everything else is a borrowed view.
#[derive(Debug)]
pub struct Application {
    graph: Graph,
    root: NodeId,
}

impl Application {
    /// Load a description from its XML text
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::from_string(xml)?;
        let root = document.root().ok_or_else(|| {
            DescriptionError::new("document has no root element")
        })?;
        let (graph, root) = Graph::load(root, EntityKind::Application)?;
        Ok(Self { graph, root })
    }

    /// Load a description from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_xml(&std::fs::read_to_string(path)?)
    }

    /// The application-level documentation
    pub fn docs(&self) -> Vec<Documentation<'_>> {
        docs_of(&self.graph, self.root)
    }

    /// The `resources` element with its base URI
    pub fn resource_list(&self) -> Option<ResourceList<'_>> {
        self.graph
            .one(self.root, EntityKind::ResourceList)
            .map(|node| ResourceList::new(&self.graph, node))
    }

    /// A top-level resource by id
    pub fn find_resource(&self, id: &str) -> Option<BoundResource<'_>> {
        self.resource_list()?.find_resource(id)
    }

    /// A top-level resource by path
    pub fn find_resource_by_path(&self, path: &str) -> Option<BoundResource<'_>> {
        self.resource_list()?.find_resource_by_path(path)
    }

    /// A top-level resource by id or path, whichever matches first
    pub fn resource(&self, id_or_path: &str) -> Option<BoundResource<'_>> {
        self.resource_list()?.resource(id_or_path)
    }
}

/// View over the `resources` element
#[derive(Debug, Clone, Copy)]
pub struct ResourceList<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> ResourceList<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The base URI all resource paths hang off
    pub fn base(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "base")
    }

    /// The top-level resources in document order
    pub fn resources(&self) -> Vec<Resource<'a>> {
        self.graph
            .many(self.node, EntityKind::Resource)
            .into_iter()
            .map(|node| Resource::new(self.graph, node))
            .collect()
    }

    /// A resource by id, addressed from the base
    pub fn find_resource(&self, id: &str) -> Option<BoundResource<'a>> {
        self.resources()
            .into_iter()
            .find(|r| r.id() == Some(id))
            .map(|r| BoundResource::new(r, None))
    }

    /// A resource by path, addressed from the base
    pub fn find_resource_by_path(&self, path: &str) -> Option<BoundResource<'a>> {
        self.resources()
            .into_iter()
            .find(|r| r.path() == Some(path))
            .map(|r| BoundResource::new(r, None))
    }

    /// A resource by id or path
    pub fn resource(&self, id_or_path: &str) -> Option<BoundResource<'a>> {
        self.resources()
            .into_iter()
            .find(|r| r.id() == Some(id_or_path) || r.path() == Some(id_or_path))
            .map(|r| BoundResource::new(r, None))
    }
}

/// View over a `resource` node, at its position in the tree
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> PartialEq for Resource<'a> {
    /// Two views are the same resource when they resolve to the same
    /// node, so a reference placeholder equals its target.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph)
            && self.graph.dereference(self.node) == other.graph.dereference(other.node)
    }
}

impl<'a> Resource<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The resource id
    pub fn id(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "id")
    }

    /// The path template, possibly containing `{name}` placeholders
    pub fn path(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "path")
    }

    /// The resource's documentation
    pub fn docs(&self) -> Vec<Documentation<'a>> {
        docs_of(self.graph, self.node)
    }

    /// The child resources, reference placeholders kept in place so the
    /// path context stays this resource's
    pub fn resources(&self) -> Vec<Resource<'a>> {
        self.graph
            .many(self.node, EntityKind::Resource)
            .into_iter()
            .map(|node| Resource::new(self.graph, node))
            .collect()
    }

    /// The mixed-in resource types
    pub fn resource_types(&self) -> Vec<ResourceType<'a>> {
        self.graph
            .many(self.node, EntityKind::ResourceType)
            .into_iter()
            .map(|node| ResourceType::new(self.graph, node))
            .collect()
    }

    /// The full parameter set used for addressing: the resource's own
    /// params followed by the params of every mixed-in resource type
    pub fn params(&self) -> Vec<Param<'a>> {
        let mut params: Vec<Param<'a>> = self
            .graph
            .many(self.node, EntityKind::Param)
            .into_iter()
            .map(|node| Param::new(self.graph, node))
            .collect();
        for resource_type in self.resource_types() {
            params.extend(resource_type.params());
        }
        params
    }

    /// The methods of this resource, own methods before mixin methods
    pub fn methods(&self) -> Vec<Method<'a>> {
        let mut methods: Vec<Method<'a>> = self
            .graph
            .many(self.node, EntityKind::Method)
            .into_iter()
            .map(|node| Method::new(self.graph, node))
            .collect();
        for resource_type in self.resource_types() {
            methods.extend(resource_type.methods());
        }
        methods
    }

    /// A child resource by id
    pub fn find_by_id(&self, id: &str) -> Option<Resource<'a>> {
        self.resources().into_iter().find(|r| r.id() == Some(id))
    }

    /// A child resource by path
    pub fn find_by_path(&self, path: &str) -> Option<Resource<'a>> {
        self.resources().into_iter().find(|r| r.path() == Some(path))
    }

    /// A child resource by id or path
    pub fn child(&self, id_or_path: &str) -> Option<Resource<'a>> {
        self.resources()
            .into_iter()
            .find(|r| r.id() == Some(id_or_path) || r.path() == Some(id_or_path))
    }

    /// A method by its declared id, searching mixins after own methods
    pub fn find_method_by_id(&self, id: &str) -> Option<Method<'a>> {
        self.methods().into_iter().find(|m| m.id() == Some(id))
    }

    /// A method by HTTP verb, case-insensitive
    pub fn find_method_by_verb(&self, verb: &str) -> Option<Method<'a>> {
        self.methods()
            .into_iter()
            .find(|m| m.verb().eq_ignore_ascii_case(verb))
    }

    /// The first declared request or response representation of the
    /// method with the given verb
    pub fn representation_for(
        &self,
        verb: &str,
        request: bool,
    ) -> Option<RepresentationFormat<'a>> {
        let method = self.find_method_by_verb(verb)?;
        let representations = if request {
            method.request_format()?.representations()
        } else {
            method.response_format()?.representations()
        };
        representations.into_iter().next()
    }

    /// The address of this resource, computed by walking to the root
    pub fn address(&self) -> Address<'a> {
        self.address_onto(None)
    }

    /// Extend a working address (or compute one from the parent chain)
    /// with this resource's path template and parameter pools.
    ///
    /// A parameter embedded in the path template joins the path pool; a
    /// query- or header-styled one joins its pool; any other param not
    /// embedded in the template becomes a free-standing path fragment.
    /// Same-named pool entries inherited from an ancestor are
    /// overridden.
    pub(crate) fn address_onto(&self, working: Option<Address<'a>>) -> Address<'a> {
        let mut address = match working {
            Some(address) => address,
            None => self.parent_address(),
        };

        let path = self.path().unwrap_or("");
        address.push_template(path);

        let embedded = embedded_param_names(path);
        let mut free_standing: Vec<Param<'a>> = Vec::new();

        for param in self.params() {
            if embedded.iter().any(|name| name == param.name()) {
                address.add_path_param(param);
            } else {
                match param.style() {
                    ParamStyle::Query => address.add_query_param(param),
                    ParamStyle::Header => address.add_header_param(param),
                    _ => {
                        address.add_path_param(param);
                        free_standing.push(param);
                    }
                }
            }
        }
        if !free_standing.is_empty() {
            address.push_param_fragment(free_standing);
        }

        address
    }

    fn parent_address(&self) -> Address<'a> {
        match self.graph.node(self.node).parent() {
            Some(parent) if self.graph.node(parent).kind() == EntityKind::Resource => {
                Resource::new(self.graph, parent).address_onto(None)
            }
            Some(parent) if self.graph.node(parent).kind() == EntityKind::ResourceList => {
                match self.graph.attr(parent, "base") {
                    Some(base) => Address::with_base(base),
                    None => Address::new(),
                }
            }
            _ => Address::new(),
        }
    }

    /// Bind values onto a fresh address for this resource
    pub fn bind(&self, bindings: &Bindings) -> Result<BoundResource<'a>> {
        BoundResource::new(*self, None).bind(bindings)
    }

    /// Attach Basic credentials; they survive every later bind
    pub fn with_basic_auth(&self, user: &str, password: &str) -> BoundResource<'a> {
        let mut bound = BoundResource::new(*self, None);
        bound.auth("Authorization", basic_auth(user, password));
        bound
    }

    /// The resource URI with the given values bound
    pub fn uri(&self, bindings: &Bindings) -> Result<UriParts> {
        self.address().uri(bindings)
    }
}

/// View over a `resource_type` mixin
#[derive(Debug, Clone, Copy)]
pub struct ResourceType<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> ResourceType<'a> {
    pub(crate) fn new(graph: &'a Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The resource type id
    pub fn id(&self) -> Option<&'a str> {
        self.graph.attr(self.node, "id")
    }

    /// The params this type contributes to its host resource
    pub fn params(&self) -> Vec<Param<'a>> {
        self.graph
            .many(self.node, EntityKind::Param)
            .into_iter()
            .map(|node| Param::new(self.graph, node))
            .collect()
    }

    /// The methods this type contributes to its host resource
    pub fn methods(&self) -> Vec<Method<'a>> {
        self.graph
            .many(self.node, EntityKind::Method)
            .into_iter()
            .map(|node| Method::new(self.graph, node))
            .collect()
    }
}

/// A resource paired with the address by which it was reached.
///
/// Navigation from a bound resource keeps the accumulated address, so
/// bindings made high in the tree carry down to the resources reached
/// through them. `bind` clones the address first; sibling bindings never
/// interfere.
#[derive(Debug, Clone)]
pub struct BoundResource<'a> {
    resource: Resource<'a>,
    address: Address<'a>,
}

impl<'a> BoundResource<'a> {
    pub(crate) fn new(resource: Resource<'a>, working: Option<&Address<'a>>) -> Self {
        let address = resource.address_onto(working.cloned());
        Self { resource, address }
    }

    /// The underlying resource view
    pub fn resource(&self) -> Resource<'a> {
        self.resource
    }

    /// The accumulated address
    pub fn address(&self) -> &Address<'a> {
        &self.address
    }

    /// The resource id
    pub fn id(&self) -> Option<&'a str> {
        self.resource.id()
    }

    /// The path template
    pub fn path(&self) -> Option<&'a str> {
        self.resource.path()
    }

    /// Bind values, leaving this instance untouched
    pub fn bind(&self, bindings: &Bindings) -> Result<BoundResource<'a>> {
        let mut bound = self.clone();
        bound.address.bind(bindings)?;
        Ok(bound)
    }

    /// Queue a header value to be merged into every future bind
    pub fn auth(&mut self, header: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.address.auth(header, value);
        self
    }

    /// Attach Basic credentials on a copy of this bound resource
    pub fn with_basic_auth(&self, user: &str, password: &str) -> BoundResource<'a> {
        let mut bound = self.clone();
        bound.auth("Authorization", basic_auth(user, password));
        bound
    }

    /// Serialize the address, binding any remaining values
    pub fn uri(&self, bindings: &Bindings) -> Result<UriParts> {
        self.address.uri(bindings)
    }

    /// A child resource by id, carrying this address forward
    pub fn find_resource(&self, id: &str) -> Option<BoundResource<'a>> {
        self.resource
            .find_by_id(id)
            .map(|r| BoundResource::new(r, Some(&self.address)))
    }

    /// A child resource by path, carrying this address forward
    pub fn find_resource_by_path(&self, path: &str) -> Option<BoundResource<'a>> {
        self.resource
            .find_by_path(path)
            .map(|r| BoundResource::new(r, Some(&self.address)))
    }

    /// A child resource by id or path
    pub fn child(&self, id_or_path: &str) -> Option<BoundResource<'a>> {
        self.resource
            .child(id_or_path)
            .map(|r| BoundResource::new(r, Some(&self.address)))
    }

    /// The first declared request or response representation of the
    /// method with the given verb
    pub fn representation_for(
        &self,
        verb: &str,
        request: bool,
    ) -> Option<RepresentationFormat<'a>> {
        self.resource.representation_for(verb, request)
    }

    fn call(&self, verb: &str, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        let method = self.resource.find_method_by_verb(verb).ok_or_else(|| {
            DescriptionError::new(format!("resource declares no {} method", verb))
                .with_element("resource")
        })?;
        method.call(self, args, transport)
    }

    /// Issue a GET against this resource
    pub fn get(&self, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        self.call("get", args, transport)
    }

    /// Issue a POST against this resource
    pub fn post(&self, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        self.call("post", args, transport)
    }

    /// Issue a PUT against this resource
    pub fn put(&self, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        self.call("put", args, transport)
    }

    /// Issue a DELETE against this resource
    pub fn delete(&self, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        self.call("delete", args, transport)
    }

    /// Issue a HEAD against this resource
    pub fn head(&self, args: &CallArgs, transport: &dyn Transport) -> Result<Response> {
        self.call("head", args, transport)
    }
}
