// crates/graphml-core/src/parse.rs
//
// Single forward pass over a GraphML document.
// - `GraphMlReader` is a push state machine: start / characters / end, in
//   document order, no lookahead. Any event source can drive it.
// - `read_graphml*` drive it from quick-xml 0.38 events.
// - `key` declarations build the schema registry; `data` values are
//   resolved against it in the scope of the enclosing element.
//
// Text policy:
// - `data` text is accumulated verbatim across Text/CData/GeneralRef events
//   and trimmed once, at `</data>`.
// - Text inside vendor child elements of `data` (e.g. `y:ShapeNode`) is not
//   part of the value.
// - Empty values and values for undeclared keys are dropped without error.

use crate::model::{GraphStore, MemoryGraph};
use crate::schema::{DataType, SchemaRegistry, Scope};
use crate::value::{CoerceError, coerce};
use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesEnd, BytesRef, BytesStart, Event};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required attribute: {0}")]
    MissingAttr(&'static str),

    #[error("key {key}: unknown scope {}", .scope.as_deref().unwrap_or("(none)"))]
    UnknownScope { key: String, scope: Option<String> },

    #[error("edge {end} references undeclared node {node}")]
    UnknownNode { end: &'static str, node: String },

    #[error("invalid {datatype} value {value:?} for key {key} in {scope} scope: {source}")]
    InvalidValue {
        scope: Scope,
        key: String,
        datatype: DataType,
        value: String,
        #[source]
        source: CoerceError,
    },

    #[error("unresolved entity reference: {0}")]
    Entity(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Id given to the graph built by [`MemoryGraph::from_graphml`].
pub const DEFAULT_GRAPH_ID: &str = "graph";

/// What a completed read reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome<N, E> {
    /// One entry per `node` element, in document order.
    pub nodes: Vec<N>,
    /// One entry per `edge` element, in document order.
    pub edges: Vec<E>,
    /// `graph/@id`, if present.
    pub graph_name: Option<String>,
    /// `graph/@edgedefault` was `directed` (any case).
    pub directed: bool,
}

struct PendingData {
    key: String,
    text: String,
    /// Open child elements of the current `data` element.
    foreign_depth: usize,
}

/// Push-driven GraphML state machine. One instance reads one document.
pub struct GraphMlReader<'s, S: GraphStore> {
    store: &'s mut S,
    registry: SchemaRegistry,
    node_ids: HashMap<String, S::Node>,
    nodes: Vec<S::Node>,
    edges: Vec<S::Edge>,
    scope: Scope,
    current_id: String,
    graph_id: String,
    graph_name: Option<String>,
    directed: bool,
    data: Option<PendingData>,
}

impl<'s, S: GraphStore> GraphMlReader<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            registry: SchemaRegistry::new(),
            node_ids: HashMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            scope: Scope::DocumentRoot,
            current_id: String::new(),
            graph_id: String::new(),
            graph_name: None,
            directed: false,
            data: None,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// `name` is the element's local name; `attrs` maps qualified attribute
    /// names to unescaped values.
    pub fn start_element(&mut self, name: &str, attrs: &BTreeMap<String, String>) -> ParseResult<()> {
        if let Some(data) = self.data.as_mut() {
            data.foreign_depth += 1;
            return Ok(());
        }
        match name {
            "graph" => self.start_graph(attrs),
            "key" => self.define_key(attrs)?,
            "node" => self.start_node(attrs)?,
            "edge" => self.start_edge(attrs)?,
            "data" => {
                self.data = Some(PendingData {
                    key: attrs.get("key").cloned().unwrap_or_default(),
                    text: String::new(),
                    foreign_depth: 0,
                });
            }
            _ => {}
        }
        Ok(())
    }

    pub fn characters(&mut self, text: &str) {
        if let Some(data) = self.data.as_mut()
            && data.foreign_depth == 0
        {
            data.text.push_str(text);
        }
    }

    pub fn end_element(&mut self, name: &str) -> ParseResult<()> {
        if let Some(data) = self.data.as_mut()
            && data.foreign_depth > 0
        {
            data.foreign_depth -= 1;
            return Ok(());
        }
        match name {
            "data" => self.finish_data()?,
            "node" | "edge" => {
                // Nested graphs are not tracked; the enclosing scope is
                // always the top-level graph.
                self.scope = Scope::Graph;
                self.current_id.clone_from(&self.graph_id);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn finish(self) -> ReadOutcome<S::Node, S::Edge> {
        log::debug!(
            "read {} nodes, {} edges, {} key definitions",
            self.nodes.len(),
            self.edges.len(),
            self.registry.len()
        );
        ReadOutcome {
            nodes: self.nodes,
            edges: self.edges,
            graph_name: self.graph_name,
            directed: self.directed,
        }
    }

    fn start_graph(&mut self, attrs: &BTreeMap<String, String>) {
        self.scope = Scope::Graph;
        self.graph_id = self.store.graph_id().to_string();
        self.current_id.clone_from(&self.graph_id);
        self.directed = attrs
            .get("edgedefault")
            .is_some_and(|v| v.eq_ignore_ascii_case("directed"));
        self.graph_name = attrs.get("id").cloned();
    }

    fn define_key(&mut self, attrs: &BTreeMap<String, String>) -> ParseResult<()> {
        let key = attrs.get("id").ok_or(ParseError::MissingAttr("key@id"))?;
        let scope_tag = attrs.get("for");
        let scope = scope_tag
            .and_then(|tag| Scope::from_tag(tag))
            .ok_or_else(|| ParseError::UnknownScope {
                key: key.clone(),
                scope: scope_tag.cloned(),
            })?;
        let name = attrs.get("attr.name").unwrap_or(key);
        let type_tag = attrs.get("attr.type");
        let datatype = type_tag.and_then(|tag| DataType::from_tag(tag));
        if datatype.is_none()
            && let Some(tag) = type_tag
        {
            log::warn!("key {key}: unknown attr.type {tag:?}, values are kept as text");
        }
        self.registry.define(scope, key, name, datatype);
        Ok(())
    }

    fn start_node(&mut self, attrs: &BTreeMap<String, String>) -> ParseResult<()> {
        self.scope = Scope::Node;
        let id = attrs.get("id").ok_or(ParseError::MissingAttr("node@id"))?;
        let node = self.store.get_or_create_node(id);
        self.node_ids.insert(id.clone(), node.clone());
        self.nodes.push(node);
        self.current_id.clone_from(id);
        Ok(())
    }

    fn start_edge(&mut self, attrs: &BTreeMap<String, String>) -> ParseResult<()> {
        self.scope = Scope::Edge;
        let source = self.endpoint(attrs, "source")?;
        let target = self.endpoint(attrs, "target")?;
        let edge = self.store.create_edge(&source, &target);
        self.current_id = self.store.edge_id(&edge).to_string();
        log::trace!("edge {} created", self.current_id);
        self.edges.push(edge);
        Ok(())
    }

    fn endpoint(&self, attrs: &BTreeMap<String, String>, end: &'static str) -> ParseResult<S::Node> {
        let id = attrs.get(end).ok_or(ParseError::MissingAttr(match end {
            "source" => "edge@source",
            _ => "edge@target",
        }))?;
        self.node_ids
            .get(id)
            .cloned()
            .ok_or_else(|| ParseError::UnknownNode {
                end,
                node: id.clone(),
            })
    }

    fn finish_data(&mut self) -> ParseResult<()> {
        let Some(pending) = self.data.take() else {
            return Ok(());
        };
        let text = pending.text.trim();
        if text.is_empty() {
            return Ok(());
        }
        // Only graph, node and edge values have a home in the store.
        if !Scope::CONCRETE.contains(&self.scope) {
            log::debug!(
                "dropping value for key {} outside any graph",
                pending.key
            );
            return Ok(());
        }
        let Some(definition) = self.registry.lookup(self.scope, &pending.key) else {
            log::debug!(
                "dropping value for undeclared key {} in {} scope",
                pending.key,
                self.scope
            );
            return Ok(());
        };
        let value = coerce(text, definition.datatype).map_err(|source| ParseError::InvalidValue {
            scope: self.scope,
            key: pending.key.clone(),
            datatype: definition.datatype.unwrap_or(DataType::String),
            value: text.to_string(),
            source,
        })?;
        self.store
            .set_attribute(self.scope, &self.current_id, &definition.display_name, value);
        Ok(())
    }
}

/// Reads a GraphML document held in memory into `store`.
pub fn read_graphml<S: GraphStore>(
    xml: &str,
    store: &mut S,
) -> ParseResult<ReadOutcome<S::Node, S::Edge>> {
    read_graphml_from(xml.as_bytes(), store)
}

/// Reads a GraphML document from any buffered source into `store`.
pub fn read_graphml_from<R: BufRead, S: GraphStore>(
    input: R,
    store: &mut S,
) -> ParseResult<ReadOutcome<S::Node, S::Edge>> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut graph = GraphMlReader::new(store);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name_start(&e)?;
                graph.start_element(&name, &attrs_to_map(&e)?)?;
            }
            Event::Empty(e) => {
                let name = local_name_start(&e)?;
                graph.start_element(&name, &attrs_to_map(&e)?)?;
                graph.end_element(&name)?;
            }
            Event::End(e) => {
                let name = local_name_end(&e)?;
                graph.end_element(&name)?;
            }
            Event::Text(t) => graph.characters(&t.decode()?),
            Event::CData(c) => graph.characters(&c.decode()?),
            Event::GeneralRef(r) => graph.characters(&resolve_reference(&r)?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(graph.finish())
}

/// Reads a GraphML file into `store`. Gzip-compressed files (`.graphmlz`)
/// are recognised by their magic bytes and inflated on the fly.
pub fn read_graphml_path<P: AsRef<Path>, S: GraphStore>(
    path: P,
    store: &mut S,
) -> ParseResult<ReadOutcome<S::Node, S::Edge>> {
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(&GZIP_MAGIC) {
        read_graphml_from(BufReader::new(GzDecoder::new(&bytes[..])), store)
    } else {
        read_graphml_from(&bytes[..], store)
    }
}

impl MemoryGraph {
    /// Builds a standalone graph from a GraphML document. The title and
    /// directedness are taken from the `graph` element.
    pub fn from_graphml(xml: &str) -> ParseResult<MemoryGraph> {
        let mut graph = MemoryGraph::new(DEFAULT_GRAPH_ID);
        let outcome = read_graphml(xml, &mut graph)?;
        graph.adopt(&outcome);
        Ok(graph)
    }

    pub fn from_graphml_path<P: AsRef<Path>>(path: P) -> ParseResult<MemoryGraph> {
        let mut graph = MemoryGraph::new(DEFAULT_GRAPH_ID);
        let outcome = read_graphml_path(path, &mut graph)?;
        graph.adopt(&outcome);
        Ok(graph)
    }

    fn adopt<N, E>(&mut self, outcome: &ReadOutcome<N, E>) {
        self.title.clone_from(&outcome.graph_name);
        self.directed = outcome.directed;
    }
}

fn resolve_reference(r: &BytesRef<'_>) -> ParseResult<String> {
    if let Some(ch) = r
        .resolve_char_ref()
        .map_err(|err| ParseError::Entity(err.to_string()))?
    {
        return Ok(ch.to_string());
    }
    let name = r.decode()?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| ParseError::Entity(format!("&{name};")))
}

fn attrs_to_map(e: &BytesStart<'_>) -> ParseResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for a in e.attributes() {
        let a = a?;
        let key = str::from_utf8(a.key.as_ref())?.to_string();
        let val = a.unescape_value()?.to_string();
        out.insert(key, val);
    }
    Ok(out)
}

fn local_name_start(e: &BytesStart<'_>) -> ParseResult<String> {
    Ok(str::from_utf8(e.local_name().as_ref())?.to_string())
}

fn local_name_end(e: &BytesEnd<'_>) -> ParseResult<String> {
    Ok(str::from_utf8(e.local_name().as_ref())?.to_string())
}
