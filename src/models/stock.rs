// src/models/stock.rs
use super::{request::de_lenient_i64, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROJECT_OPTIONS: [&str; 3] = ["MOE", "ESE", "OTHER"];

/// Linha de stock de kimonos por escola.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: Uuid,
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub project: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub quantity: i64,
    #[serde(flatten)]
    pub extra: Row,
}
