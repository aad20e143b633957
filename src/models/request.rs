// src/models/request.rs
use super::Row;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Estado de um pedido. Não há transições automáticas: só o Admin muda o estado.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    #[default]
    Pending,
    Processed,
    Approved,
    Rejected,
    /// Valor desconhecido, preservado tal como veio.
    Other(String),
}

impl RequestStatus {
    /// Opções oferecidas na grelha de edição do Admin.
    pub const GRID_OPTIONS: [&'static str; 4] = ["Pending", "Processed", "Approved", "Rejected"];
    /// Opções da alteração de estado em lote.
    pub const BATCH_OPTIONS: [&'static str; 3] = ["Pending", "Approved", "Rejected"];

    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Processed => "Processed",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        *self == RequestStatus::Pending
    }
}

impl From<&str> for RequestStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => RequestStatus::Pending,
            "processed" => RequestStatus::Processed,
            "approved" => RequestStatus::Approved,
            "rejected" | "denied" => RequestStatus::Rejected,
            _ => RequestStatus::Other(value.to_string()),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        RequestStatus::from(value.as_str())
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Registo de requests.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequest {
    pub id: Uuid,
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub material: String,
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub quantity: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub ps_number: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(flatten)]
    pub extra: Row,
}

/// Aceita `3`, `3.0` ou `"3"`; o JSON legado tem as três formas.
pub(crate) fn de_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("quantity não inteira: {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("quantity não numérica: {:?}", s))),
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("quantity inválida: {}", other))),
    }
}
