use crate::model::{ArrowCode, EdgeGraphics, GraphStore, GraphView, NodeGraphics, ShapeCode};
use crate::schema::{DataType, Scope};
use crate::value::fmt_double;
use flate2::Compression;
use flate2::write::GzEncoder;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("node {node}: no GraphML shape for shape code {code}")]
    UnmappedShape { node: String, code: i32 },
}

pub type WriteResult<T> = Result<T, WriteError>;

pub const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
pub const YWORKS_NS: &str = "http://www.yworks.com/xml/graphml";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://graphml.graphdrawing.org/xmlns http://www.yworks.com/xml/schema/graphml/1.1/ygraphml.xsd";
const GENERATOR_COMMENT: &str = "Generated by graphml-core";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Spaces per nesting level; 0 writes the document on one line.
    pub indent: usize,
    /// Emit a generator comment as the first child of `graphml`.
    pub generator_comment: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            generator_comment: true,
        }
    }
}

/// Serializes a [`GraphStore`] (and optionally a [`GraphView`]) as GraphML.
///
/// Key ids are allocated per write as `<scope initial><n>` from one counter
/// shared by graph, node and edge keys, in that order. The document is
/// always rendered completely before any byte reaches the destination.
pub struct GraphMlWriter<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    view: Option<&'a dyn GraphView<S>>,
    options: WriteOptions,
}

impl<'a, S: GraphStore + ?Sized> GraphMlWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            view: None,
            options: WriteOptions::default(),
        }
    }

    /// Adds the yWorks graphics blocks for nodes and edges.
    pub fn with_view(mut self, view: &'a dyn GraphView<S>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self) -> WriteResult<Vec<u8>> {
        let xml = if self.options.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', self.options.indent)
        } else {
            Writer::new(Vec::new())
        };
        DocumentWriter {
            store: self.store,
            view: self.view,
            keys: KeyTable::default(),
            xml,
        }
        .write_document(&self.options)
    }

    pub fn write<W: Write>(&self, mut out: W) -> WriteResult<()> {
        let bytes = self.render()?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to_string(&self) -> WriteResult<String> {
        Ok(String::from_utf8(self.render()?)?)
    }

    /// Writes the file in one call. A `.graphmlz` extension gzips the
    /// document.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> WriteResult<()> {
        let path = path.as_ref();
        let bytes = self.render()?;
        let compressed = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("graphmlz"));
        if compressed {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&bytes)?;
            std::fs::write(path, encoder.finish()?)?;
        } else {
            std::fs::write(path, bytes)?;
        }
        Ok(())
    }
}

fn writer_for<'a, S: GraphStore + ?Sized>(
    store: &'a S,
    view: Option<&'a dyn GraphView<S>>,
    options: &WriteOptions,
) -> GraphMlWriter<'a, S> {
    GraphMlWriter {
        store,
        view,
        options: options.clone(),
    }
}

pub fn write_graphml<S: GraphStore + ?Sized, W: Write>(
    store: &S,
    view: Option<&dyn GraphView<S>>,
    options: &WriteOptions,
    out: W,
) -> WriteResult<()> {
    writer_for(store, view, options).write(out)
}

pub fn write_graphml_to_string<S: GraphStore + ?Sized>(
    store: &S,
    view: Option<&dyn GraphView<S>>,
    options: &WriteOptions,
) -> WriteResult<String> {
    writer_for(store, view, options).write_to_string()
}

pub fn write_graphml_to_path<S: GraphStore + ?Sized, P: AsRef<Path>>(
    path: P,
    store: &S,
    view: Option<&dyn GraphView<S>>,
    options: &WriteOptions,
) -> WriteResult<()> {
    writer_for(store, view, options).write_to_path(path)
}

/// Key ids handed out during one write.
#[derive(Debug, Default)]
struct KeyTable {
    allocated: usize,
    ids: HashMap<(Scope, String), String>,
    node_graphics: Option<String>,
    edge_graphics: Option<String>,
}

impl KeyTable {
    fn allocate(&mut self, scope: Scope) -> String {
        self.allocated += 1;
        format!("{}{}", &scope.tag()[..1], self.allocated)
    }

    fn declare(&mut self, scope: Scope, name: &str) -> String {
        let id = self.allocate(scope);
        self.ids.insert((scope, name.to_string()), id.clone());
        id
    }

    fn get(&self, scope: Scope, name: &str) -> Option<&str> {
        self.ids.get(&(scope, name.to_string())).map(String::as_str)
    }
}

struct DocumentWriter<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    view: Option<&'a dyn GraphView<S>>,
    keys: KeyTable,
    xml: Writer<Vec<u8>>,
}

impl<'a, S: GraphStore + ?Sized> DocumentWriter<'a, S> {
    fn write_document(mut self, options: &WriteOptions) -> WriteResult<Vec<u8>> {
        let store = self.store;

        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new("graphml");
        root.push_attribute(("xmlns", GRAPHML_NS));
        root.push_attribute(("xmlns:y", YWORKS_NS));
        root.push_attribute(("xmlns:xsi", XSI_NS));
        root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        self.xml.write_event(Event::Start(root))?;
        if options.generator_comment {
            self.xml
                .write_event(Event::Comment(BytesText::new(GENERATOR_COMMENT)))?;
        }

        self.write_keys(Scope::Graph)?;
        self.write_keys(Scope::Node)?;
        if self.view.is_some() {
            self.keys.node_graphics = Some(self.write_graphics_key(Scope::Node, "nodegraphics")?);
        }
        self.write_keys(Scope::Edge)?;
        if self.view.is_some() {
            self.keys.edge_graphics = Some(self.write_graphics_key(Scope::Edge, "edgegraphics")?);
        }

        // Always directed; the store does not carry edge direction.
        let mut graph = BytesStart::new("graph");
        graph.push_attribute(("edgedefault", "directed"));
        graph.push_attribute(("id", store.graph_title()));
        self.xml.write_event(Event::Start(graph))?;
        self.write_data(Scope::Graph, store.graph_id())?;

        let nodes = store.nodes();
        for node in &nodes {
            self.write_node(node)?;
        }
        let edges = store.edges();
        for edge in &edges {
            self.write_edge(edge)?;
        }

        self.xml.write_event(Event::End(BytesEnd::new("graph")))?;
        self.xml.write_event(Event::End(BytesEnd::new("graphml")))?;

        log::debug!(
            "wrote {} keys, {} nodes, {} edges",
            self.keys.allocated,
            nodes.len(),
            edges.len()
        );
        Ok(self.xml.into_inner())
    }

    fn write_keys(&mut self, scope: Scope) -> WriteResult<()> {
        let store = self.store;
        for name in store.attribute_names(scope) {
            let datatype = store
                .attribute_type(scope, &name)
                .unwrap_or(DataType::String);
            let id = self.keys.declare(scope, &name);
            let mut key = BytesStart::new("key");
            key.push_attribute(("id", id.as_str()));
            key.push_attribute(("for", scope.tag()));
            key.push_attribute(("attr.name", name.as_str()));
            key.push_attribute(("attr.type", datatype.tag()));
            self.xml.write_event(Event::Empty(key))?;
        }
        Ok(())
    }

    fn write_graphics_key(&mut self, scope: Scope, yfiles_type: &str) -> WriteResult<String> {
        let id = self.keys.allocate(scope);
        let mut key = BytesStart::new("key");
        key.push_attribute(("id", id.as_str()));
        key.push_attribute(("for", scope.tag()));
        key.push_attribute(("yfiles.type", yfiles_type));
        self.xml.write_event(Event::Empty(key))?;
        Ok(id)
    }

    /// One `data` element per attribute present on `id`; absent values are
    /// skipped.
    fn write_data(&mut self, scope: Scope, id: &str) -> WriteResult<()> {
        let store = self.store;
        for name in store.attribute_names(scope) {
            let Some(value) = store.attribute(scope, id, &name) else {
                continue;
            };
            let Some(key) = self.keys.get(scope, &name) else {
                continue;
            };
            let mut data = BytesStart::new("data");
            data.push_attribute(("key", key));
            text_element(&mut self.xml, data, &value.to_string())?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &S::Node) -> WriteResult<()> {
        let store = self.store;
        let id = store.node_id(node);
        let mut elem = BytesStart::new("node");
        elem.push_attribute(("id", id));
        self.xml.write_event(Event::Start(elem))?;
        self.write_data(Scope::Node, id)?;
        if let Some(view) = self.view
            && let Some(graphics) = view.node_graphics(store, node)
        {
            self.write_node_graphics(id, &graphics)?;
        }
        self.xml.write_event(Event::End(BytesEnd::new("node")))?;
        Ok(())
    }

    fn write_edge(&mut self, edge: &S::Edge) -> WriteResult<()> {
        let store = self.store;
        let (source, target) = store.edge_endpoints(edge);
        let mut elem = BytesStart::new("edge");
        elem.push_attribute(("source", store.node_id(&source)));
        elem.push_attribute(("target", store.node_id(&target)));
        self.xml.write_event(Event::Start(elem))?;
        self.write_data(Scope::Edge, store.edge_id(edge))?;
        if let Some(view) = self.view
            && let Some(graphics) = view.edge_graphics(store, edge)
        {
            self.write_edge_graphics(&graphics)?;
        }
        self.xml.write_event(Event::End(BytesEnd::new("edge")))?;
        Ok(())
    }

    fn write_node_graphics(&mut self, node_id: &str, g: &NodeGraphics) -> WriteResult<()> {
        let shape = shape_type(g.shape).ok_or_else(|| WriteError::UnmappedShape {
            node: node_id.to_string(),
            code: g.shape.0,
        })?;
        let key = self.keys.node_graphics.clone().unwrap_or_default();
        let mut data = BytesStart::new("data");
        data.push_attribute(("key", key.as_str()));
        self.xml.write_event(Event::Start(data))?;
        self.xml
            .write_event(Event::Start(BytesStart::new("y:ShapeNode")))?;

        let mut geometry = BytesStart::new("y:Geometry");
        geometry.push_attribute(("height", fmt_double(g.height).as_str()));
        geometry.push_attribute(("width", fmt_double(g.width).as_str()));
        geometry.push_attribute(("x", fmt_double(g.x - 0.5 * g.width).as_str()));
        geometry.push_attribute(("y", fmt_double(g.y - 0.5 * g.height).as_str()));
        self.xml.write_event(Event::Empty(geometry))?;

        let mut fill = BytesStart::new("y:Fill");
        fill.push_attribute(("color", g.fill.to_hex().as_str()));
        fill.push_attribute(("transparent", bool_text(g.fill_transparent)));
        self.xml.write_event(Event::Empty(fill))?;

        let mut border = BytesStart::new("y:BorderStyle");
        border.push_attribute(("color", g.border_color.to_hex().as_str()));
        border.push_attribute(("type", "line"));
        border.push_attribute(("width", fmt_double(g.border_width).as_str()));
        self.xml.write_event(Event::Empty(border))?;

        let mut label = BytesStart::new("y:NodeLabel");
        label.push_attribute(("fontFamily", g.font_family.as_str()));
        label.push_attribute(("fontSize", g.font_size.to_string().as_str()));
        label.push_attribute(("hasText", bool_text(g.label.is_some())));
        label.push_attribute(("textColor", g.label_color.to_hex().as_str()));
        text_element(&mut self.xml, label, g.label.as_deref().unwrap_or_default())?;

        let mut shape_elem = BytesStart::new("y:Shape");
        shape_elem.push_attribute(("type", shape));
        self.xml.write_event(Event::Empty(shape_elem))?;

        self.xml
            .write_event(Event::End(BytesEnd::new("y:ShapeNode")))?;
        self.xml.write_event(Event::End(BytesEnd::new("data")))?;
        Ok(())
    }

    fn write_edge_graphics(&mut self, g: &EdgeGraphics) -> WriteResult<()> {
        let key = self.keys.edge_graphics.clone().unwrap_or_default();
        let line = if g.curved { "y:SplineEdge" } else { "y:PolyLine" };
        let mut data = BytesStart::new("data");
        data.push_attribute(("key", key.as_str()));
        self.xml.write_event(Event::Start(data))?;
        self.xml.write_event(Event::Start(BytesStart::new(line)))?;

        let mut path = BytesStart::new("y:Path");
        for attr in ["sx", "sy", "tx", "ty"] {
            path.push_attribute((attr, "0.0"));
        }
        self.xml.write_event(Event::Empty(path))?;

        let mut line_style = BytesStart::new("y:LineStyle");
        line_style.push_attribute(("color", g.color.to_hex().as_str()));
        line_style.push_attribute(("type", "line"));
        line_style.push_attribute(("width", fmt_double(g.width).as_str()));
        self.xml.write_event(Event::Empty(line_style))?;

        let mut arrows = BytesStart::new("y:Arrows");
        arrows.push_attribute(("source", arrow_type(g.source_arrow)));
        arrows.push_attribute(("target", arrow_type(g.target_arrow)));
        self.xml.write_event(Event::Empty(arrows))?;

        self.xml.write_event(Event::End(BytesEnd::new(line)))?;
        self.xml.write_event(Event::End(BytesEnd::new("data")))?;
        Ok(())
    }
}

/// `<name ...>text</name>`; the text event is always written so an empty
/// value stays on one line.
fn text_element(xml: &mut Writer<Vec<u8>>, start: BytesStart<'_>, text: &str) -> WriteResult<()> {
    let end = start.to_end().into_owned();
    xml.write_event(Event::Start(start))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(end))?;
    Ok(())
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// yWorks shape names. Every code the view layer produces must be listed.
pub fn shape_type(code: ShapeCode) -> Option<&'static str> {
    match code {
        ShapeCode::DIAMOND => Some("diamond"),
        ShapeCode::ELLIPSE => Some("ellipse"),
        ShapeCode::HEXAGON => Some("hexagon"),
        ShapeCode::OCTAGON => Some("octagon"),
        ShapeCode::PARALLELOGRAM => Some("parallelogram"),
        ShapeCode::RECTANGLE => Some("rectangle"),
        ShapeCode::ROUNDED_RECTANGLE => Some("roundrectangle"),
        ShapeCode::TRIANGLE => Some("triangle"),
        ShapeCode::VEE => Some("trapezoid2"),
        _ => None,
    }
}

/// yWorks arrow names; codes without a counterpart are drawn as `none`.
pub fn arrow_type(code: ArrowCode) -> &'static str {
    match code {
        ArrowCode::NO_END => "none",
        ArrowCode::BLACK_ARROW => "standard",
        // no exact yWorks match
        ArrowCode::WHITE_ARROW => "white_delta",
        ArrowCode::BLACK_DELTA => "delta",
        ArrowCode::WHITE_DELTA => "white_delta",
        ArrowCode::BLACK_DIAMOND => "diamond",
        ArrowCode::WHITE_DIAMOND => "white_diamond",
        ArrowCode::BLACK_CIRCLE => "circle",
        ArrowCode::WHITE_CIRCLE => "transparent_circle",
        ArrowCode::BLACK_T | ArrowCode::WHITE_T => "t_shape",
        _ => "none",
    }
}
