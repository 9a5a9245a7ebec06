//! Catalog entries for parts and assemblies.
//!
//! The catalog is owned by an external store. Assemblies declare component
//! edges pointing at either a child part or a child assembly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog category value that marks a leaf part.
pub const PART_CATEGORY: &str = "PART";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblyType {
    Part,
    Simple,
    Complex,
    Kit,
    ServicePart,
}

impl fmt::Display for AssemblyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Part => write!(f, "PART"),
            Self::Simple => write!(f, "SIMPLE"),
            Self::Complex => write!(f, "COMPLEX"),
            Self::Kit => write!(f, "KIT"),
            Self::ServicePart => write!(f, "SERVICE_PART"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAssembly {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub assembly_type: AssemblyType,
    pub category: String,
    #[serde(default)]
    pub components: Vec<ComponentEdge>,
}

/// Edge from an assembly to one of its children. Exactly one of the two
/// child ids is expected to be set; the assembly id wins when both are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEdge {
    pub child_part_id: Option<String>,
    pub child_assembly_id: Option<String>,
    #[serde(default = "crate::configuration::default_quantity")]
    pub quantity: u32,
    pub notes: Option<String>,
}

impl ComponentEdge {
    pub fn child_id(&self) -> Option<&str> {
        self.child_assembly_id
            .as_deref()
            .or(self.child_part_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPart {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub part_type: AssemblyType,
    pub status: Option<String>,
}
