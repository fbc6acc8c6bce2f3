//! Schema entity model and document loader
//!
//! A WADL document is loaded into an arena of uniformly-shaped nodes.
//! One static [`Descriptor`] per [`EntityKind`] declares the element
//! name, required and optional attributes, single-child and
//! repeated-child relations, and whether the element may be a reference
//! (`href`) or carries mixed text content. A single generic loader
//! walks the parsed XML tree and builds nodes according to those
//! descriptors, so adding an element type is a table entry, not code.
//!
//! Parent links are plain [`NodeId`] handles into the arena; the tree
//! is immutable after loading, apart from the memoized result of
//! reference resolution.

use std::sync::OnceLock;

use indexmap::IndexMap;
use log::warn;

use crate::documents::Element;
use crate::error::{DescriptionError, Result};

/// The closed set of WADL element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// `<doc>`: human-readable documentation, mixed content
    Documentation,
    /// `<option>`: an enumerated legal value for a param
    OptionValue,
    /// `<link>`: a link annotation on a param
    Link,
    /// `<param>`: a path/query/header/form parameter
    Param,
    /// `<representation>`: a request or response body format
    Representation,
    /// `<fault>`: a documented error response format
    Fault,
    /// `<request>`: the request side of a method
    Request,
    /// `<response>`: the response side of a method
    Response,
    /// `<method>`: an HTTP method
    Method,
    /// `<resource_type>`: a mixin of methods and params
    ResourceType,
    /// `<resource>`: a node in the resource tree
    Resource,
    /// `<resources>`: the resource list with its base URI
    ResourceList,
    /// `<application>`: the document root
    Application,
}

/// Declarative description of one element kind, consulted by the loader
#[derive(Debug)]
pub struct Descriptor {
    /// Element name in the document
    pub element: &'static str,
    /// Attributes that must be present (absence fails the load)
    pub required: &'static [&'static str],
    /// Attributes copied when present
    pub optional: &'static [&'static str],
    /// Kinds of which at most one child may occur
    pub one: &'static [EntityKind],
    /// Kinds of which any number of children may occur
    pub many: &'static [EntityKind],
    /// Whether an instance may be a pointer (`href`) to another instance
    pub may_be_reference: bool,
    /// Whether the contents are raw mixed data rather than structure
    pub mixed: bool,
}

use EntityKind::*;

const DOCUMENTATION: Descriptor = Descriptor {
    element: "doc",
    required: &[],
    optional: &["xml:lang", "title"],
    one: &[],
    many: &[],
    may_be_reference: false,
    mixed: true,
};

const OPTION_VALUE: Descriptor = Descriptor {
    element: "option",
    required: &["value"],
    optional: &[],
    one: &[],
    many: &[Documentation],
    may_be_reference: false,
    mixed: false,
};

const LINK: Descriptor = Descriptor {
    element: "link",
    required: &[],
    optional: &["href", "rel", "rev"],
    one: &[],
    many: &[Documentation],
    may_be_reference: false,
    mixed: false,
};

const PARAM: Descriptor = Descriptor {
    element: "param",
    required: &["name"],
    optional: &[
        "type", "default", "style", "path", "required", "repeating", "fixed",
    ],
    one: &[],
    many: &[Documentation, OptionValue, Link],
    may_be_reference: true,
    mixed: false,
};

const REPRESENTATION: Descriptor = Descriptor {
    element: "representation",
    required: &[],
    optional: &["id", "mediaType", "element"],
    one: &[],
    many: &[Documentation, Param],
    may_be_reference: true,
    mixed: false,
};

const FAULT: Descriptor = Descriptor {
    element: "fault",
    required: &[],
    optional: &["id", "mediaType", "element", "status"],
    one: &[],
    many: &[Documentation, Param],
    may_be_reference: true,
    mixed: false,
};

const REQUEST: Descriptor = Descriptor {
    element: "request",
    required: &[],
    optional: &[],
    one: &[],
    many: &[Documentation, Representation, Param],
    may_be_reference: false,
    mixed: false,
};

const RESPONSE: Descriptor = Descriptor {
    element: "response",
    required: &[],
    optional: &[],
    one: &[],
    many: &[Documentation, Representation, Fault],
    may_be_reference: false,
    mixed: false,
};

const METHOD: Descriptor = Descriptor {
    element: "method",
    required: &["id", "name"],
    optional: &[],
    one: &[Request, Response],
    many: &[Documentation],
    may_be_reference: true,
    mixed: false,
};

const RESOURCE_TYPE: Descriptor = Descriptor {
    element: "resource_type",
    required: &[],
    optional: &["id"],
    one: &[],
    many: &[Documentation, Method, Param],
    may_be_reference: false,
    mixed: false,
};

const RESOURCE: Descriptor = Descriptor {
    element: "resource",
    required: &[],
    optional: &["id", "path"],
    one: &[],
    many: &[Documentation, Resource, Method, Param, ResourceType],
    may_be_reference: true,
    mixed: false,
};

const RESOURCE_LIST: Descriptor = Descriptor {
    element: "resources",
    required: &[],
    optional: &["base"],
    one: &[],
    many: &[Documentation, Resource],
    may_be_reference: false,
    mixed: false,
};

const APPLICATION: Descriptor = Descriptor {
    element: "application",
    required: &[],
    optional: &[],
    one: &[ResourceList],
    many: &[Documentation, Method, Representation, Fault],
    may_be_reference: false,
    mixed: false,
};

impl EntityKind {
    /// The declarative descriptor for this kind
    pub fn descriptor(self) -> &'static Descriptor {
        match self {
            Documentation => &DOCUMENTATION,
            OptionValue => &OPTION_VALUE,
            Link => &LINK,
            Param => &PARAM,
            Representation => &REPRESENTATION,
            Fault => &FAULT,
            Request => &REQUEST,
            Response => &RESPONSE,
            Method => &METHOD,
            ResourceType => &RESOURCE_TYPE,
            Resource => &RESOURCE,
            ResourceList => &RESOURCE_LIST,
            Application => &APPLICATION,
        }
    }

    /// The attribute whose value becomes the node's index key, used for
    /// name-based lookup and reference resolution
    pub fn index_attribute(self) -> Option<&'static str> {
        let desc = self.descriptor();
        desc.required.first().or_else(|| desc.optional.first()).copied()
    }

    /// Look up a child element name against this kind's relations.
    /// Returns the child kind and whether the relation is single-child.
    fn child_relation(self, tag: &str) -> Option<(EntityKind, bool)> {
        let desc = self.descriptor();
        for &kind in desc.one {
            if kind.descriptor().element == tag {
                return Some((kind, true));
            }
        }
        for &kind in desc.many {
            if kind.descriptor().element == tag {
                return Some((kind, false));
            }
        }
        None
    }
}

/// Handle to a node in a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One loaded entity
#[derive(Debug)]
pub struct Node {
    kind: EntityKind,
    parent: Option<NodeId>,
    attributes: IndexMap<String, String>,
    index_key: Option<String>,
    href: Option<String>,
    children: Vec<NodeId>,
    contents: Option<String>,
    referenced: OnceLock<Option<NodeId>>,
}

impl Node {
    /// The kind tag of this node
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The owning node, or None at the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The node's own attributes (empty for a reference placeholder)
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// The index-attribute value used for name-based lookup
    pub fn index_key(&self) -> Option<&str> {
        self.index_key.as_deref()
    }

    /// The reference target id, if this node is a placeholder
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Mixed text content (documentation elements)
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Whether the given name matches this node's index key
    pub fn matches(&self, name: &str) -> bool {
        self.index_key.as_deref() == Some(name)
    }
}

/// Arena holding every entity loaded from one document
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Load a parsed XML element (and its subtree) as the given kind.
    ///
    /// The load is all-or-nothing: a missing required attribute or a
    /// duplicate single child fails the whole document.
    pub fn load(root: &Element, kind: EntityKind) -> Result<(Graph, NodeId)> {
        let expected = kind.descriptor().element;
        if root.name != expected {
            return Err(DescriptionError::new(format!(
                "expected document root <{}>, found <{}>",
                expected, root.name
            ))
            .into());
        }

        let mut graph = Graph { nodes: Vec::new() };
        let id = graph.build(None, root, kind)?;
        Ok((graph, id))
    }

    fn build(&mut self, parent: Option<NodeId>, element: &Element, kind: EntityKind) -> Result<NodeId> {
        let desc = kind.descriptor();
        let id = self.alloc(kind, parent);

        if desc.may_be_reference {
            if let Some(href) = element.attribute("href") {
                // A placeholder carries only the pointer; its
                // attributes and children live on the target.
                self.nodes[id.0 as usize].href = Some(normalize_href(href));
                return Ok(id);
            }
        }

        for &name in desc.required {
            let value = element.attribute(name).ok_or_else(|| {
                DescriptionError::new(format!("missing required attribute \"{}\"", name))
                    .with_element(desc.element)
            })?;
            self.set_attribute(id, kind, name, value);
        }
        for &name in desc.optional {
            if let Some(value) = element.attribute(name) {
                self.set_attribute(id, kind, name, value);
            }
        }

        if desc.mixed {
            self.nodes[id.0 as usize].contents = Some(element.inner_text());
            return Ok(id);
        }

        let mut seen_one: Vec<EntityKind> = Vec::new();
        for child in element.children() {
            // Child element names not declared for this kind are ignored.
            let Some((child_kind, is_one)) = kind.child_relation(&child.name) else {
                continue;
            };
            if is_one {
                if seen_one.contains(&child_kind) {
                    return Err(DescriptionError::new(format!(
                        "<{}> can only have one <{}> child, but several were specified",
                        desc.element,
                        child_kind.descriptor().element
                    ))
                    .with_element(desc.element)
                    .into());
                }
                seen_one.push(child_kind);
            }
            let child_id = self.build(Some(id), child, child_kind)?;
            self.nodes[id.0 as usize].children.push(child_id);
        }

        Ok(id)
    }

    fn alloc(&mut self, kind: EntityKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent,
            attributes: IndexMap::new(),
            index_key: None,
            href: None,
            children: Vec::new(),
            contents: None,
            referenced: OnceLock::new(),
        });
        id
    }

    fn set_attribute(&mut self, id: NodeId, kind: EntityKind, name: &str, value: &str) {
        let node = &mut self.nodes[id.0 as usize];
        node.attributes.insert(name.to_string(), value.to_string());
        if kind.index_attribute() == Some(name) {
            node.index_key = Some(value.to_string());
        }
    }

    /// Access a node by id
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Resolve a node to the entity it stands for.
    ///
    /// A node without an `href` resolves to itself, so the operation is
    /// safe to call unconditionally and idempotent. A reference resolves
    /// by walking the parent chain to the first ancestor whose kind may
    /// contain this element kind and looking the target up by index
    /// key; the result is memoized. An unresolvable reference yields
    /// `None`: callers treat that as "no such entity", not an error.
    pub fn dereference(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        if node.href.is_none() {
            return Some(id);
        }
        *node.referenced.get_or_init(|| self.resolve_reference(id))
    }

    fn resolve_reference(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let href = node.href.as_deref()?;

        let mut parent = node.parent;
        while let Some(ancestor) = parent {
            if self.node(ancestor).kind.descriptor().many.contains(&node.kind) {
                // Match on the raw index key without dereferencing the
                // candidates, so mutually-referring nodes cannot recurse.
                let found = self
                    .raw_children(ancestor, node.kind)
                    .find(|&child| self.node(child).matches(href));
                if let Some(found) = found {
                    return Some(found);
                }
            }
            parent = self.node(ancestor).parent;
        }
        None
    }

    /// The single child of the given kind, read through a reference
    pub fn one(&self, id: NodeId, kind: EntityKind) -> Option<NodeId> {
        let id = self.dereference(id)?;
        self.raw_children(id, kind).next()
    }

    /// All children of the given kind, read through a reference
    pub fn many(&self, id: NodeId, kind: EntityKind) -> Vec<NodeId> {
        match self.dereference(id) {
            Some(id) => self.raw_children(id, kind).collect(),
            None => Vec::new(),
        }
    }

    /// An attribute value, read through a reference
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        let id = self.dereference(id)?;
        self.node(id).attributes.get(name).map(|s| s.as_str())
    }

    fn raw_children(&self, id: NodeId, kind: EntityKind) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(move |&child| self.node(child).kind == kind)
    }
}

/// Strip the leading `#` from an href value. An href without one is
/// accepted but logged as malformed.
fn normalize_href(href: &str) -> String {
    match href.strip_prefix('#') {
        Some(rest) => rest.to_string(),
        None => {
            warn!("href \"{}\" should be \"#{}\"", href, href);
            href.to_string()
        }
    }
}
