pub mod model;
pub mod parse;
pub mod schema;
pub mod serde_f64;
pub mod value;
pub mod write;
pub use model::{GraphStore, GraphView, MemoryGraph, MemoryView};
pub use parse::{ParseError, ParseResult, read_graphml, read_graphml_from, read_graphml_path};
pub use schema::{DataType, SchemaRegistry, Scope};
pub use value::{TypedValue, coerce};
pub use write::{
    GraphMlWriter, WriteError, WriteOptions, WriteResult, write_graphml, write_graphml_to_path,
    write_graphml_to_string,
};
