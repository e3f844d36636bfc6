use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Structural context an attribute key is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "edge")]
    Edge,
    #[serde(rename = "graph")]
    Graph,
    #[serde(rename = "graphml")]
    DocumentRoot,
    /// Declaration-time wildcard (`for="all"`); never the scope of a
    /// resolved definition.
    #[serde(rename = "all")]
    AllScopes,
}

impl Scope {
    /// Scopes an `all` declaration expands into.
    pub const CONCRETE: [Scope; 3] = [Scope::Node, Scope::Edge, Scope::Graph];

    pub fn tag(self) -> &'static str {
        match self {
            Scope::Node => "node",
            Scope::Edge => "edge",
            Scope::Graph => "graph",
            Scope::DocumentRoot => "graphml",
            Scope::AllScopes => "all",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Scope> {
        match tag {
            "node" => Some(Scope::Node),
            "edge" => Some(Scope::Edge),
            "graph" => Some(Scope::Graph),
            "graphml" => Some(Scope::DocumentRoot),
            "all" => Some(Scope::AllScopes),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Value type named by `key/@attr.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Long,
    Float,
    Double,
    Boolean,
    String,
    Date,
}

impl DataType {
    pub fn tag(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::String => "string",
            DataType::Date => "date",
        }
    }

    /// Case-sensitive, like the wire vocabulary. Unknown tags are `None`.
    pub fn from_tag(tag: &str) -> Option<DataType> {
        match tag {
            "int" => Some(DataType::Int),
            "long" => Some(DataType::Long),
            "float" => Some(DataType::Float),
            "double" => Some(DataType::Double),
            "boolean" => Some(DataType::Boolean),
            "string" => Some(DataType::String),
            "date" => Some(DataType::Date),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKeyId {
    pub scope: Scope,
    pub key: String,
}

impl AttributeKeyId {
    pub fn new(scope: Scope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    pub id: AttributeKeyId,
    pub display_name: String,
    /// `None` when `attr.type` was missing or not a known tag; values are
    /// then kept as text.
    pub datatype: Option<DataType>,
}

/// Key declarations seen so far in one document.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    definitions: HashMap<AttributeKeyId, AttributeDefinition>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. An `AllScopes` declaration is stored once
    /// per concrete scope. Redeclaring a `(scope, key)` pair replaces the
    /// earlier definition.
    pub fn define(&mut self, scope: Scope, key: &str, name: &str, datatype: Option<DataType>) {
        if scope == Scope::AllScopes {
            for each in Scope::CONCRETE {
                self.insert(each, key, name, datatype);
            }
        } else {
            self.insert(scope, key, name, datatype);
        }
    }

    fn insert(&mut self, scope: Scope, key: &str, name: &str, datatype: Option<DataType>) {
        let id = AttributeKeyId::new(scope, key);
        let definition = AttributeDefinition {
            id: id.clone(),
            display_name: name.to_string(),
            datatype,
        };
        if self.definitions.insert(id, definition).is_some() {
            log::debug!("key {key} redeclared for scope {scope}");
        }
    }

    pub fn lookup(&self, scope: Scope, key: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(&AttributeKeyId::new(scope, key))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.values()
    }
}
