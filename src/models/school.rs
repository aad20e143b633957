// src/models/school.rs
use super::Row;
use serde::{Deserialize, Serialize};

// Registo de schools.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub city: String,
    /// PS numbers dos coaches associados (relação "soft" com users).
    #[serde(default)]
    pub coaches: Vec<String>,
    #[serde(flatten)]
    pub extra: Row,
}

impl School {
    pub fn has_coach(&self, ps_number: &str) -> bool {
        self.coaches.iter().any(|c| c == ps_number)
    }

    /// Rótulo usado nos selects: "Nome (id)".
    pub fn label(&self) -> String {
        let name = if self.nome.trim().is_empty() { "(no name)" } else { self.nome.as_str() };
        format!("{} ({})", name, self.id)
    }
}
