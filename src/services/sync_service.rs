// src/services/sync_service.rs
//! Sincronização best-effort entre os JSON locais e o armazenamento remoto.
//!
//! - push: local → remoto, upsert pela chave de conflito da coleção;
//! - pull: remoto → local, substitui a coleção local inteira.
//!
//! Cada coleção é tratada isoladamente: uma falha é registada no relatório e
//! as restantes coleções continuam.

use super::Outcome;
use crate::{
    error::AppResult,
    models::{
        collection::Collection, material::Material, request::MaterialRequest, school::School,
        stock::StockItem, user::User, Row,
    },
    remote::{RemoteError, RemoteStore},
    store::{decode_rows, JsonStore},
};

/// Tabela remota que espelha os utilizadores com um esquema reduzido.
pub const COACHES_MIRROR_TABLE: &str = "coaches";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Faz upsert mesmo que a tabela remota já tenha dados.
    pub force: bool,
    /// Apaga a tabela remota antes do upsert (implica `force`).
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableStatus {
    Synced(usize),
    Pulled(usize),
    Skipped,
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub collection: Collection,
    pub status: TableStatus,
    /// Avisos e notas não fatais (ex.: "Cleared remote 'users'").
    pub notes: Vec<String>,
}

impl TableReport {
    pub fn message(&self) -> String {
        let table = self.collection.table();
        match &self.status {
            TableStatus::Synced(n) => format!("Synced {} records to '{}'", n, table),
            TableStatus::Pulled(n) => format!("Pulled {} rows from '{}' to local JSON", n, table),
            TableStatus::Skipped => format!("Skipped '{}': data already exists remotely", table),
            TableStatus::Missing => format!("{} not found", self.collection.file_name()),
            TableStatus::Failed(e) => format!("Could not sync '{}': {}", table, e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, TableStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub tables: Vec<TableReport>,
}

impl SyncReport {
    pub fn synced(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t.status, TableStatus::Synced(_) | TableStatus::Pulled(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.tables.iter().filter(|t| t.status == TableStatus::Skipped).count()
    }

    pub fn errors(&self) -> usize {
        self.tables.iter().filter(|t| t.is_error()).count()
    }

    pub fn status_of(&self, collection: Collection) -> Option<&TableStatus> {
        self.tables.iter().find(|t| t.collection == collection).map(|t| &t.status)
    }

    pub fn summary(&self, action: &str) -> String {
        format!(
            "{}: synced: {}, skipped: {}, errors: {}",
            action,
            self.synced(),
            self.skipped(),
            self.errors()
        )
    }
}

/// Push de todas as coleções.
pub async fn push_all(store: &JsonStore, remote: &dyn RemoteStore, options: SyncOptions) -> SyncReport {
    tracing::info!("⬆️ Push local → {} ({:?})", remote.name(), options);
    let mut report = SyncReport::default();
    for collection in Collection::ALL {
        let table_report = push_collection(store, remote, collection, options).await;
        if table_report.is_error() {
            tracing::warn!("{}", table_report.message());
        } else {
            tracing::info!("{}", table_report.message());
        }
        report.tables.push(table_report);
    }
    tracing::info!("{}", report.summary("Data Sync"));
    report
}

pub async fn push_collection(
    store: &JsonStore,
    remote: &dyn RemoteStore,
    collection: Collection,
    options: SyncOptions,
) -> TableReport {
    let table = collection.table();
    let mut notes = Vec::new();
    let force = options.force || options.replace;

    let finish = |status: TableStatus, notes: Vec<String>| TableReport { collection, status, notes };

    if !store.exists(collection) {
        return finish(TableStatus::Missing, notes);
    }

    // 1) Sem force, não mexe em tabelas remotas que já têm dados
    if !force {
        match remote.has_rows(table).await {
            Ok(true) => return finish(TableStatus::Skipped, notes),
            Ok(false) => {}
            Err(e) => notes.push(format!("Could not check existing data for '{}': {}", table, e)),
        }
    }

    let rows = match store.load_rows(collection) {
        Ok(rows) => rows,
        Err(e) => return finish(TableStatus::Failed(e.to_string()), notes),
    };
    let shaped: Vec<Row> = rows.iter().map(|r| collection.project(r)).collect();

    if options.replace {
        match remote.delete_all(table, collection.clear_key()).await {
            Ok(()) => notes.push(format!("Cleared remote '{}' before sync", table)),
            Err(e) => notes.push(format!("Could not clear remote '{}': {}", table, e)),
        }
    }

    if let Err(e) = remote.upsert(table, &shaped, collection.conflict_key()).await {
        return finish(TableStatus::Failed(e.to_string()), notes);
    }

    if collection == Collection::Users {
        match mirror_coaches(remote, &shaped).await {
            Ok(0) => {}
            Ok(n) => notes.push(format!("Mirrored {} user(s) into '{}'", n, COACHES_MIRROR_TABLE)),
            Err(e) => notes.push(format!("Mirror to '{}' skipped: {}", COACHES_MIRROR_TABLE, e)),
        }
    }

    finish(TableStatus::Synced(shaped.len()), notes)
}

/// Pull de todas as coleções; cada uma substitui o ficheiro local.
pub async fn pull_all(store: &JsonStore, remote: &dyn RemoteStore) -> SyncReport {
    tracing::info!("⬇️ Pull {} → local", remote.name());
    let mut report = SyncReport::default();
    for collection in Collection::ALL {
        let status = match pull_collection(store, remote, collection).await {
            Ok(n) => TableStatus::Pulled(n),
            Err(e) => TableStatus::Failed(e),
        };
        let table_report = TableReport { collection, status, notes: Vec::new() };
        if table_report.is_error() {
            tracing::warn!("{}", table_report.message());
        } else {
            tracing::info!("{}", table_report.message());
        }
        report.tables.push(table_report);
    }
    tracing::info!("{}", report.summary("Pull remote → local"));
    report
}

async fn pull_collection(store: &JsonStore, remote: &dyn RemoteStore, collection: Collection) -> Result<usize, String> {
    let rows = remote
        .select_all(collection.table())
        .await
        .map_err(|e| e.to_string())?;
    let shaped: Vec<Row> = rows.iter().map(|r| collection.project_remote(r)).collect();

    // Valida antes de substituir: um erro aqui deixa o ficheiro local intacto
    validate_rows(collection, &shaped).map_err(|e| e.to_string())?;
    store.save(collection, &shaped).map_err(|e| e.to_string())?;
    Ok(shaped.len())
}

fn validate_rows(collection: Collection, rows: &[Row]) -> AppResult<()> {
    let rows = rows.to_vec();
    match collection {
        Collection::Users => decode_rows::<User>(collection, rows).map(drop),
        Collection::Schools => decode_rows::<School>(collection, rows).map(drop),
        Collection::Materials => decode_rows::<Material>(collection, rows).map(drop),
        Collection::Requests => decode_rows::<MaterialRequest>(collection, rows).map(drop),
        Collection::StockKimonos => decode_rows::<StockItem>(collection, rows).map(drop),
    }
}

/// Upsert best-effort dos registos alterados. Sem remoto configurado é um no-op.
pub async fn push_records(
    remote: Option<&dyn RemoteStore>,
    collection: Collection,
    rows: &[Row],
) -> Result<usize, RemoteError> {
    let Some(remote) = remote else {
        return Ok(0);
    };
    if rows.is_empty() {
        return Ok(0);
    }
    let shaped: Vec<Row> = rows.iter().map(|r| collection.project(r)).collect();
    remote
        .upsert(collection.table(), &shaped, collection.conflict_key())
        .await?;
    Ok(shaped.len())
}

/// Espelha os utilizadores na tabela `coaches` (ps_number, password, credential).
pub async fn mirror_coaches(remote: &dyn RemoteStore, user_rows: &[Row]) -> Result<usize, RemoteError> {
    let mirrored: Vec<Row> = user_rows
        .iter()
        .filter(|r| r.get("ps_number").and_then(|v| v.as_str()).is_some_and(|s| !s.is_empty()))
        .map(|r| {
            let mut m = Row::new();
            for field in ["ps_number", "password"] {
                m.insert(field.to_string(), r.get(field).cloned().unwrap_or_default());
            }
            m.insert(
                "credential".to_string(),
                r.get("credential").cloned().unwrap_or_else(|| "Coach".into()),
            );
            m
        })
        .collect();
    if mirrored.is_empty() {
        return Ok(0);
    }
    remote
        .upsert(COACHES_MIRROR_TABLE, &mirrored, Some("ps_number"))
        .await?;
    Ok(mirrored.len())
}

/// Remoção remota best-effort pela chave de conflito da coleção.
pub async fn delete_records(
    remote: Option<&dyn RemoteStore>,
    collection: Collection,
    keys: &[String],
) -> Result<(), RemoteError> {
    let (Some(remote), Some(column)) = (remote, collection.conflict_key()) else {
        return Ok(());
    };
    remote.delete_in(collection.table(), column, keys).await?;
    if collection == Collection::Users {
        remote.delete_in(COACHES_MIRROR_TABLE, "ps_number", keys).await?;
    }
    Ok(())
}

/// Regista o resultado de um push no `Outcome`, convertendo falhas em aviso.
pub fn record_push(outcome: &mut Outcome, result: Result<usize, RemoteError>) {
    match result {
        Ok(n) => outcome.synced += n,
        Err(e) => {
            tracing::warn!("⚠️ Gravado localmente, sincronização falhou: {}", e);
            outcome.warn(format!("Saved locally, but could not sync to the remote store: {}", e));
        }
    }
}

/// Igual a `record_push`, para remoções.
pub fn record_remote_delete(outcome: &mut Outcome, result: Result<(), RemoteError>) {
    if let Err(e) = result {
        tracing::warn!("⚠️ Removido localmente, remoção remota falhou: {}", e);
        outcome.warn(format!("Could not delete from the remote store: {}", e));
    }
}
