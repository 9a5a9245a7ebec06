//! Catalog lookup
//!
//! Read-only access to catalog assemblies and parts. A missing id is a normal
//! outcome and is reported as `None`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use torvan_models::{CatalogAssembly, CatalogPart};

use crate::error::{PlanningError, PlanningResult};

/// Catalog lookup used by the BOM expansion engine
pub trait Catalog: Send + Sync {
    fn get_assembly(&self, id: &str) -> Option<&CatalogAssembly>;

    fn get_part(&self, id: &str) -> Option<&CatalogPart>;
}

/// Serialized catalog export, as produced by the catalog store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogDocument {
    pub assemblies: Vec<CatalogAssembly>,
    pub parts: Vec<CatalogPart>,
}

/// Catalog held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    assemblies: HashMap<String, CatalogAssembly>,
    parts: HashMap<String, CatalogPart>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assembly(mut self, assembly: CatalogAssembly) -> Self {
        self.insert_assembly(assembly);
        self
    }

    pub fn with_part(mut self, part: CatalogPart) -> Self {
        self.insert_part(part);
        self
    }

    /// Later entries with the same id replace earlier ones.
    pub fn insert_assembly(&mut self, assembly: CatalogAssembly) {
        self.assemblies.insert(assembly.id.clone(), assembly);
    }

    pub fn insert_part(&mut self, part: CatalogPart) {
        self.parts.insert(part.id.clone(), part);
    }

    pub fn from_document(document: CatalogDocument) -> Self {
        let mut catalog = Self::new();
        for assembly in document.assemblies {
            catalog.insert_assembly(assembly);
        }
        for part in document.parts {
            catalog.insert_part(part);
        }
        catalog
    }

    pub fn from_json_str(content: &str) -> PlanningResult<Self> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        Ok(Self::from_document(document))
    }

    pub fn from_yaml_str(content: &str) -> PlanningResult<Self> {
        let document: CatalogDocument = serde_yaml::from_str(content)?;
        Ok(Self::from_document(document))
    }

    /// Load a catalog export; the format follows the file extension and
    /// defaults to JSON.
    pub fn from_path(path: impl AsRef<Path>) -> PlanningResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlanningError::catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"))
            .unwrap_or(false);

        let catalog = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        };

        catalog.map_err(|e| {
            PlanningError::catalog(format!("Failed to parse catalog {}: {}", path.display(), e))
        })
    }

    pub fn assembly_count(&self) -> usize {
        self.assemblies.len()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn get_assembly(&self, id: &str) -> Option<&CatalogAssembly> {
        self.assemblies.get(id)
    }

    fn get_part(&self, id: &str) -> Option<&CatalogPart> {
        self.parts.get(id)
    }
}
