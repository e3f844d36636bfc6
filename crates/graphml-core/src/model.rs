use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::schema::{DataType, Scope};
use crate::value::TypedValue;

/// Host graph and attribute store the codec reads into and writes from.
pub trait GraphStore {
    type Node: Clone;
    type Edge: Clone;

    /// Identifier graph-scope attributes are stored under.
    fn graph_id(&self) -> &str;

    /// Written as `graph/@id`.
    fn graph_title(&self) -> &str;

    fn get_or_create_node(&mut self, id: &str) -> Self::Node;

    /// Creates a new edge; parallel edges are allowed.
    fn create_edge(&mut self, source: &Self::Node, target: &Self::Node) -> Self::Edge;

    fn nodes(&self) -> Vec<Self::Node>;
    fn edges(&self) -> Vec<Self::Edge>;

    fn node_id<'a>(&'a self, node: &Self::Node) -> &'a str;
    fn edge_id<'a>(&'a self, edge: &Self::Edge) -> &'a str;
    fn edge_endpoints(&self, edge: &Self::Edge) -> (Self::Node, Self::Node);

    fn attribute(&self, scope: Scope, id: &str, name: &str) -> Option<TypedValue>;
    fn set_attribute(&mut self, scope: Scope, id: &str, name: &str, value: TypedValue);

    /// Every attribute name ever set in `scope`, in a stable order.
    fn attribute_names(&self, scope: Scope) -> Vec<String>;
    fn attribute_type(&self, scope: Scope, name: &str) -> Option<DataType>;
}

/// Rendering layer supplying the visual properties the writer serializes.
pub trait GraphView<S: GraphStore + ?Sized> {
    fn node_graphics(&self, store: &S, node: &S::Node) -> Option<NodeGraphics>;
    fn edge_graphics(&self, store: &S, edge: &S::Edge) -> Option<EdgeGraphics>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`, lowercase.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid color: {0}")]
pub struct ColorError(String);

/// Accepts `#rrggbb` and `rgb(r, g, b)`.
impl FromStr for Color {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#')
            && hex.len() == 6
            && let Ok(bytes) = u32::from_str_radix(hex, 16)
        {
            return Ok(Color::rgb(
                ((bytes >> 16) & 0xFF) as u8,
                ((bytes >> 8) & 0xFF) as u8,
                (bytes & 0xFF) as u8,
            ));
        }
        if let Some(inner) = value.strip_prefix("rgb(").and_then(|v| v.strip_suffix(')')) {
            let mut parts = inner.split(',').map(|part| part.trim().parse::<u8>());
            if let (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            {
                return Ok(Color::rgb(r, g, b));
            }
        }
        Err(ColorError(value.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Node shape code as produced by the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeCode(pub i32);

impl ShapeCode {
    pub const TRIANGLE: ShapeCode = ShapeCode(0);
    pub const DIAMOND: ShapeCode = ShapeCode(1);
    pub const ELLIPSE: ShapeCode = ShapeCode(2);
    pub const HEXAGON: ShapeCode = ShapeCode(3);
    pub const OCTAGON: ShapeCode = ShapeCode(4);
    pub const PARALLELOGRAM: ShapeCode = ShapeCode(5);
    pub const RECTANGLE: ShapeCode = ShapeCode(6);
    pub const ROUNDED_RECTANGLE: ShapeCode = ShapeCode(7);
    pub const VEE: ShapeCode = ShapeCode(8);
}

/// Edge end decoration code as produced by the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrowCode(pub i32);

impl ArrowCode {
    pub const NO_END: ArrowCode = ArrowCode(0);
    pub const WHITE_DELTA: ArrowCode = ArrowCode(1);
    pub const BLACK_DELTA: ArrowCode = ArrowCode(2);
    pub const EDGE_COLOR_DELTA: ArrowCode = ArrowCode(3);
    pub const WHITE_ARROW: ArrowCode = ArrowCode(4);
    pub const BLACK_ARROW: ArrowCode = ArrowCode(5);
    pub const EDGE_COLOR_ARROW: ArrowCode = ArrowCode(6);
    pub const WHITE_DIAMOND: ArrowCode = ArrowCode(7);
    pub const BLACK_DIAMOND: ArrowCode = ArrowCode(8);
    pub const EDGE_COLOR_DIAMOND: ArrowCode = ArrowCode(9);
    pub const WHITE_CIRCLE: ArrowCode = ArrowCode(10);
    pub const BLACK_CIRCLE: ArrowCode = ArrowCode(11);
    pub const EDGE_COLOR_CIRCLE: ArrowCode = ArrowCode(12);
    pub const WHITE_T: ArrowCode = ArrowCode(13);
    pub const BLACK_T: ArrowCode = ArrowCode(14);
    pub const EDGE_COLOR_T: ArrowCode = ArrowCode(15);
}

/// Visual state of one node. `x`/`y` is the centre of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGraphics {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color,
    #[serde(default)]
    pub fill_transparent: bool,
    pub border_color: Color,
    pub border_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub font_family: String,
    pub font_size: u32,
    pub label_color: Color,
    pub shape: ShapeCode,
}

impl Default for NodeGraphics {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 30.0,
            height: 30.0,
            fill: Color::WHITE,
            fill_transparent: false,
            border_color: Color::BLACK,
            border_width: 1.0,
            label: None,
            font_family: "SansSerif".to_string(),
            font_size: 12,
            label_color: Color::BLACK,
            shape: ShapeCode::ELLIPSE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGraphics {
    pub color: Color,
    pub width: f64,
    /// Curved lines are written as `y:SplineEdge`, straight ones as
    /// `y:PolyLine`.
    #[serde(default)]
    pub curved: bool,
    pub source_arrow: ArrowCode,
    pub target_arrow: ArrowCode,
}

impl Default for EdgeGraphics {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            curved: false,
            source_arrow: ArrowCode::NO_END,
            target_arrow: ArrowCode::NO_END,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeHandle(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeColumn {
    pub name: String,
    pub datatype: DataType,
}

/// Attribute storage for one scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeTable {
    /// First-seen order. The type is fixed by the first value set; a
    /// later value of another type turns the column into `string`.
    #[serde(default)]
    pub columns: Vec<AttributeColumn>,

    /// External id -> attribute name -> value.
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, TypedValue>>,
}

impl AttributeTable {
    fn column(&self, name: &str) -> Option<&AttributeColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Self-contained [`GraphStore`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryGraph {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub directed: bool,

    pub nodes: Vec<String>,

    pub edges: Vec<MemoryEdge>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<Scope, AttributeTable>,

    #[serde(skip)]
    node_index: HashMap<String, usize>,
}

impl MemoryGraph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            directed: false,
            nodes: Vec::new(),
            edges: Vec::new(),
            attributes: BTreeMap::new(),
            node_index: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn node(&self, id: &str) -> Option<NodeHandle> {
        self.node_index.get(id).copied().map(NodeHandle)
    }

    /// Looks both endpoints up by external id; `None` if either is unknown.
    pub fn connect(&mut self, source: &str, target: &str) -> Option<EdgeHandle> {
        let source = self.node(source)?;
        let target = self.node(target)?;
        Some(self.create_edge(&source, &target))
    }

    pub fn table(&self, scope: Scope) -> Option<&AttributeTable> {
        self.attributes.get(&scope)
    }
}

impl GraphStore for MemoryGraph {
    type Node = NodeHandle;
    type Edge = EdgeHandle;

    fn graph_id(&self) -> &str {
        &self.id
    }

    fn graph_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    fn get_or_create_node(&mut self, id: &str) -> NodeHandle {
        if let Some(&idx) = self.node_index.get(id) {
            return NodeHandle(idx);
        }
        let idx = self.nodes.len();
        self.nodes.push(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        NodeHandle(idx)
    }

    fn create_edge(&mut self, source: &NodeHandle, target: &NodeHandle) -> EdgeHandle {
        let idx = self.edges.len();
        self.edges.push(MemoryEdge {
            id: format!("e{idx}"),
            source: self.nodes[source.0].clone(),
            target: self.nodes[target.0].clone(),
        });
        EdgeHandle(idx)
    }

    fn nodes(&self) -> Vec<NodeHandle> {
        (0..self.nodes.len()).map(NodeHandle).collect()
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        (0..self.edges.len()).map(EdgeHandle).collect()
    }

    fn node_id<'a>(&'a self, node: &NodeHandle) -> &'a str {
        &self.nodes[node.0]
    }

    fn edge_id<'a>(&'a self, edge: &EdgeHandle) -> &'a str {
        &self.edges[edge.0].id
    }

    fn edge_endpoints(&self, edge: &EdgeHandle) -> (NodeHandle, NodeHandle) {
        let edge = &self.edges[edge.0];
        // Edges are only created from existing handles.
        (
            NodeHandle(self.node_index[&edge.source]),
            NodeHandle(self.node_index[&edge.target]),
        )
    }

    fn attribute(&self, scope: Scope, id: &str, name: &str) -> Option<TypedValue> {
        self.attributes.get(&scope)?.values.get(id)?.get(name).cloned()
    }

    fn set_attribute(&mut self, scope: Scope, id: &str, name: &str, value: TypedValue) {
        let table = self.attributes.entry(scope).or_default();
        let mut value = value;
        match table.columns.iter().position(|c| c.name == name) {
            None => table.columns.push(AttributeColumn {
                name: name.to_string(),
                datatype: value.datatype(),
            }),
            Some(idx) if table.columns[idx].datatype != value.datatype() => {
                // Mixed types in one column fall back to text.
                if table.columns[idx].datatype != DataType::String {
                    log::debug!(
                        "attribute {name} in {scope} scope widened from {} to string",
                        table.columns[idx].datatype
                    );
                    table.columns[idx].datatype = DataType::String;
                    for row in table.values.values_mut() {
                        if let Some(existing) = row.get_mut(name) {
                            *existing = TypedValue::String(existing.to_string());
                        }
                    }
                }
                value = TypedValue::String(value.to_string());
            }
            Some(_) => {}
        }
        table
            .values
            .entry(id.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    fn attribute_names(&self, scope: Scope) -> Vec<String> {
        self.attributes
            .get(&scope)
            .map(|table| table.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    fn attribute_type(&self, scope: Scope, name: &str) -> Option<DataType> {
        self.attributes
            .get(&scope)?
            .column(name)
            .map(|c| c.datatype)
    }
}

/// [`GraphView`] over graphics keyed by external node and edge ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryView {
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeGraphics>,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeGraphics>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_node(&mut self, id: impl Into<String>, graphics: NodeGraphics) {
        self.nodes.insert(id.into(), graphics);
    }

    pub fn set_edge(&mut self, id: impl Into<String>, graphics: EdgeGraphics) {
        self.edges.insert(id.into(), graphics);
    }
}

impl<S: GraphStore + ?Sized> GraphView<S> for MemoryView {
    fn node_graphics(&self, store: &S, node: &S::Node) -> Option<NodeGraphics> {
        self.nodes.get(store.node_id(node)).cloned()
    }

    fn edge_graphics(&self, store: &S, edge: &S::Edge) -> Option<EdgeGraphics> {
        self.edges.get(store.edge_id(edge)).cloned()
    }
}
