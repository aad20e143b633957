// src/remote/memory.rs
use super::{RemoteError, RemoteStore};
use crate::models::Row;
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

/// Remoto em memória com a mesma semântica de upsert do PostgREST
/// (merge por chave de conflito, insert simples sem chave).
/// Permite simular falhas por tabela.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    failing: Mutex<HashSet<String>>,
    upserts: Mutex<Vec<(String, Vec<Row>)>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitui o conteúdo de uma tabela.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.lock_tables().insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock_tables().get(table).cloned().unwrap_or_default()
    }

    /// A partir de agora, qualquer operação nesta tabela falha.
    pub fn fail_table(&self, table: &str) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(table.to_string());
    }

    /// Histórico dos payloads de upsert, por ordem.
    pub fn upserts(&self) -> Vec<(String, Vec<Row>)> {
        self.upserts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Row>>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, table: &str) -> Result<(), RemoteError> {
        if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(table) {
            return Err(RemoteError::Api {
                status: 503,
                message: format!("table '{}' unavailable", table),
            });
        }
        Ok(())
    }
}

fn key_matches(row: &Row, column: &str, wanted: &Value) -> bool {
    row.get(column).is_some_and(|v| v == wanted)
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Row>, RemoteError> {
        self.check(table)?;
        Ok(self.rows(table))
    }

    async fn has_rows(&self, table: &str) -> Result<bool, RemoteError> {
        self.check(table)?;
        Ok(!self.rows(table).is_empty())
    }

    async fn upsert(&self, table: &str, rows: &[Row], on_conflict: Option<&str>) -> Result<(), RemoteError> {
        self.check(table)?;
        self.upserts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((table.to_string(), rows.to_vec()));

        let mut tables = self.lock_tables();
        let existing = tables.entry(table.to_string()).or_default();
        for row in rows {
            let position = on_conflict.and_then(|column| {
                let wanted = row.get(column)?;
                existing.iter().position(|r| key_matches(r, column, wanted))
            });
            match position {
                Some(idx) => {
                    for (k, v) in row {
                        existing[idx].insert(k.clone(), v.clone());
                    }
                }
                None => existing.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn delete_in(&self, table: &str, column: &str, values: &[String]) -> Result<(), RemoteError> {
        self.check(table)?;
        let mut tables = self.lock_tables();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| {
                r.get(column)
                    .map(|v| !values.contains(&value_as_text(v)))
                    .unwrap_or(true)
            });
        }
        Ok(())
    }

    async fn delete_all(&self, table: &str, column: &str) -> Result<(), RemoteError> {
        self.check(table)?;
        let mut tables = self.lock_tables();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| r.get(column).map(|v| value_as_text(v).is_empty()).unwrap_or(true));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_key() {
        let remote = MemoryRemote::new();
        remote.seed("schools", vec![row(json!({"id": "1", "nome": "Old", "city": "Rio"}))]);

        remote
            .upsert("schools", &[row(json!({"id": "1", "nome": "New"})), row(json!({"id": "2"}))], Some("id"))
            .await
            .unwrap();

        let rows = remote.rows("schools");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["nome"], json!("New"));
        assert_eq!(rows[0]["city"], json!("Rio"));
    }

    #[tokio::test]
    async fn upsert_without_key_appends() {
        let remote = MemoryRemote::new();
        let item = row(json!({"category": "Books", "item": "Notebook"}));
        remote.upsert("materials", &[item.clone()], None).await.unwrap();
        remote.upsert("materials", &[item], None).await.unwrap();
        assert_eq!(remote.rows("materials").len(), 2);
    }

    #[tokio::test]
    async fn failing_table_returns_api_error() {
        let remote = MemoryRemote::new();
        remote.fail_table("users");
        assert!(matches!(remote.has_rows("users").await, Err(RemoteError::Api { status: 503, .. })));
        assert!(remote.has_rows("schools").await.is_ok());
    }
}
