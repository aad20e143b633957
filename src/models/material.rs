// src/models/material.rs
use super::Row;
use serde::{Deserialize, Serialize};

/// Item do catálogo de materiais. Não tem chave única.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub item: String,
    #[serde(flatten)]
    pub extra: Row,
}

impl Material {
    /// "subcategory item", o texto gravado em `Request.material`.
    pub fn label(&self) -> String {
        format!("{} {}", self.subcategory, self.item).trim().to_string()
    }
}
