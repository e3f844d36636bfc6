use graphml_core::model::{ArrowCode, EdgeGraphics, NodeGraphics, ShapeCode};
use graphml_core::write::{arrow_type, shape_type};
use graphml_core::{
    GraphMlWriter, GraphStore, MemoryGraph, MemoryView, Scope, TypedValue, WriteError,
    WriteOptions, write_graphml, write_graphml_to_string,
};

fn compact() -> WriteOptions {
    WriteOptions {
        indent: 0,
        generator_comment: false,
    }
}

fn small_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new("g").with_title("small");
    graph.get_or_create_node("a");
    graph.get_or_create_node("b");
    graph.connect("a", "b").expect("both endpoints exist");
    assert!(graph.connect("a", "missing").is_none());
    graph.set_attribute(Scope::Edge, "e0", "weight", 3.5.into());
    graph.set_attribute(Scope::Node, "a", "label", "Alpha".into());
    graph.set_attribute(Scope::Graph, "g", "version", 2i64.into());
    graph
}

#[test]
fn keys_are_numbered_across_scopes_in_graph_node_edge_order() {
    let xml = GraphMlWriter::new(&small_graph())
        .with_options(compact())
        .write_to_string()
        .expect("write");

    let graph_key = r#"<key id="g1" for="graph" attr.name="version" attr.type="long"/>"#;
    let node_key = r#"<key id="n2" for="node" attr.name="label" attr.type="string"/>"#;
    let edge_key = r#"<key id="e3" for="edge" attr.name="weight" attr.type="double"/>"#;
    let positions: Vec<usize> = [graph_key, node_key, edge_key]
        .iter()
        .map(|key| xml.find(key).unwrap_or_else(|| panic!("missing {key} in {xml}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{xml}");

    assert!(xml.contains(r#"<graph edgedefault="directed" id="small">"#));
    assert!(xml.contains(r#"<data key="g1">2</data>"#));
    assert!(xml.contains(r#"<node id="a"><data key="n2">Alpha</data></node>"#));
    assert!(xml.contains(r#"<node id="b"></node>"#));
    assert!(xml.contains(r#"<edge source="a" target="b"><data key="e3">3.5</data></edge>"#));
    assert!(!xml.contains("yfiles.type"));
    assert!(!xml.contains("<y:"));
}

#[test]
fn output_is_deterministic() {
    let graph = small_graph();
    let options = WriteOptions::default();
    let first = write_graphml_to_string(&graph, None, &options).expect("first write");
    let second = write_graphml_to_string(&graph, None, &options).expect("second write");
    assert_eq!(first, second);

    let mut buf = Vec::new();
    write_graphml(&graph, None, &options, &mut buf).expect("write to buffer");
    assert_eq!(String::from_utf8(buf).expect("utf8"), first);
}

#[test]
fn default_options_write_header_and_indent() {
    let xml = write_graphml_to_string(&small_graph(), None, &WriteOptions::default())
        .expect("write");
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(r#"xmlns="http://graphml.graphdrawing.org/xmlns""#));
    assert!(xml.contains(r#"xmlns:y="http://www.yworks.com/xml/graphml""#));
    assert!(xml.contains("<!--Generated by graphml-core-->"));
    assert!(xml.contains("\n    <key id=\"g1\""));

    let flat = GraphMlWriter::new(&small_graph())
        .with_options(compact())
        .write_to_string()
        .expect("write");
    assert!(!flat.contains('\n'));
    assert!(!flat.contains("<!--"));
}

#[test]
fn write_options_deserialize_with_defaults() {
    let options: WriteOptions = serde_json::from_str(r#"{ "indent": 2 }"#).expect("options");
    assert_eq!(
        options,
        WriteOptions {
            indent: 2,
            generator_comment: true
        }
    );
}

#[test]
fn values_use_their_text_form() {
    let mut graph = MemoryGraph::new("g");
    graph.get_or_create_node("a");
    graph.set_attribute(Scope::Node, "a", "name", "".into());
    graph.set_attribute(Scope::Node, "a", "tag", "R&D <core>".into());
    graph.set_attribute(Scope::Node, "a", "ratio", f64::INFINITY.into());
    graph.set_attribute(Scope::Node, "a", "flag", false.into());

    let xml = GraphMlWriter::new(&graph)
        .with_options(compact())
        .write_to_string()
        .expect("write");
    assert!(xml.contains(r#"<data key="n1"></data>"#), "{xml}");
    assert!(xml.contains(r#"<data key="n2">R&amp;D &lt;core&gt;</data>"#), "{xml}");
    assert!(xml.contains(r#"<data key="n3">Infinity</data>"#), "{xml}");
    assert!(xml.contains(r#"<data key="n4">false</data>"#), "{xml}");

    let reread = MemoryGraph::from_graphml(&xml).expect("read back");
    assert_eq!(reread.attribute(Scope::Node, "a", "name"), None);
    assert_eq!(reread.attribute(Scope::Node, "a", "tag"), Some("R&D <core>".into()));
    assert!(matches!(
        reread.attribute(Scope::Node, "a", "ratio"),
        Some(TypedValue::Float(v)) if v.is_infinite()
    ));
}

#[test]
fn missing_values_are_omitted() {
    let mut graph = MemoryGraph::new("g");
    graph.get_or_create_node("a");
    graph.get_or_create_node("b");
    graph.set_attribute(Scope::Node, "b", "size", 4i64.into());

    let xml = GraphMlWriter::new(&graph)
        .with_options(compact())
        .write_to_string()
        .expect("write");
    assert!(xml.contains(r#"<node id="a"></node>"#), "{xml}");
    assert!(xml.contains(r#"<node id="b"><data key="n1">4</data></node>"#), "{xml}");
}

#[test]
fn graphics_keys_follow_their_scope() {
    let graph = small_graph();
    let mut view = MemoryView::new();
    view.set_node("a", NodeGraphics::default());
    view.set_edge("e0", EdgeGraphics::default());

    let xml = GraphMlWriter::new(&graph)
        .with_view(&view)
        .with_options(compact())
        .write_to_string()
        .expect("write");

    let order = [
        r#"<key id="g1" for="graph""#,
        r#"<key id="n2" for="node""#,
        r#"<key id="n3" for="node" yfiles.type="nodegraphics"/>"#,
        r#"<key id="e4" for="edge""#,
        r#"<key id="e5" for="edge" yfiles.type="edgegraphics"/>"#,
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|key| xml.find(key).unwrap_or_else(|| panic!("missing {key} in {xml}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{xml}");

    // Only nodes the view knows about get a graphics block.
    assert_eq!(xml.matches("<y:ShapeNode>").count(), 1);
    assert!(xml.contains(r#"<node id="b"></node>"#), "{xml}");
    assert!(xml.contains("<y:PolyLine>"), "{xml}");
    assert!(xml.contains(r#"<y:Arrows source="none" target="none"/>"#), "{xml}");
}

#[test]
fn arrows_use_their_own_end_code() {
    let graph = small_graph();
    let mut view = MemoryView::new();
    view.set_edge(
        "e0",
        EdgeGraphics {
            source_arrow: ArrowCode::BLACK_T,
            target_arrow: ArrowCode::WHITE_CIRCLE,
            ..EdgeGraphics::default()
        },
    );

    let xml = GraphMlWriter::new(&graph)
        .with_view(&view)
        .with_options(compact())
        .write_to_string()
        .expect("write");
    assert!(
        xml.contains(r#"<y:Arrows source="t_shape" target="transparent_circle"/>"#),
        "{xml}"
    );
}

#[test]
fn arrow_codes_without_yworks_counterpart_fall_back_to_none() {
    assert_eq!(arrow_type(ArrowCode::WHITE_ARROW), "white_delta");
    assert_eq!(arrow_type(ArrowCode::BLACK_DIAMOND), "diamond");
    assert_eq!(arrow_type(ArrowCode::EDGE_COLOR_ARROW), "none");
    assert_eq!(arrow_type(ArrowCode::EDGE_COLOR_T), "none");
    assert_eq!(arrow_type(ArrowCode(99)), "none");
}

#[test]
fn shape_table_covers_every_shape_code() {
    assert_eq!(shape_type(ShapeCode::VEE), Some("trapezoid2"));
    assert_eq!(shape_type(ShapeCode::ROUNDED_RECTANGLE), Some("roundrectangle"));
    for code in 0..=8 {
        assert!(shape_type(ShapeCode(code)).is_some(), "shape {code}");
    }
    assert_eq!(shape_type(ShapeCode(9)), None);
}

#[test]
fn unmapped_shape_fails_the_write() {
    let graph = small_graph();
    let mut view = MemoryView::new();
    view.set_node(
        "b",
        NodeGraphics {
            shape: ShapeCode(42),
            ..NodeGraphics::default()
        },
    );

    let mut out = Vec::new();
    let err = GraphMlWriter::new(&graph)
        .with_view(&view)
        .write(&mut out)
        .expect_err("shape 42 has no yWorks name");
    assert!(
        matches!(err, WriteError::UnmappedShape { ref node, code: 42 } if node == "b"),
        "unexpected error: {err}"
    );
    // Nothing reaches the destination when the document cannot be completed.
    assert!(out.is_empty());
}

#[test]
fn write_errors_describe_their_cause() {
    let errors = [
        WriteError::from(std::io::Error::other("disk full")),
        WriteError::from(String::from_utf8(vec![0xff]).expect_err("invalid utf8")),
        WriteError::UnmappedShape {
            node: "b".to_string(),
            code: 42,
        },
    ];
    for err in errors {
        let message = err.to_string();
        match err {
            WriteError::Io(_) => assert_eq!(message, "io error: disk full"),
            WriteError::Utf8(_) => assert!(message.starts_with("utf8 error: ")),
            WriteError::UnmappedShape { .. } => {
                assert_eq!(message, "node b: no GraphML shape for shape code 42")
            }
        }
    }
}
