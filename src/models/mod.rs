// src/models/mod.rs
pub mod collection;
pub mod material;
pub mod ps_number;
pub mod request;
pub mod school;
pub mod stock;
pub mod user;

/// Uma linha "crua" de uma coleção JSON (objeto plano).
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Garante um `id` UUID válido; nulo, vazio ou ilegível conta como ausente.
/// Devolve `true` quando gerou um id novo.
pub(crate) fn ensure_uuid_id(row: &mut Row) -> bool {
    let valid = row
        .get("id")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|id| uuid::Uuid::parse_str(id.trim()).is_ok());
    if !valid {
        row.insert("id".into(), uuid::Uuid::new_v4().to_string().into());
    }
    !valid
}
