// src/services/mod.rs
pub mod auth_service;
pub mod csv_export;
pub mod material_service;
pub mod request_service;
pub mod school_service;
pub mod stock_service;
pub mod sync_service;
pub mod user_service;

use crate::{
    error::AppResult,
    models::{collection::Collection, Row},
    store::JsonStore,
};

/// Prepara o diretório de dados: admin inicial e ficheiros vazios para as restantes coleções.
pub async fn init_data_dir(store: &JsonStore, admin_password: Option<&str>) -> AppResult<()> {
    std::fs::create_dir_all(store.data_dir())?;
    user_service::ensure_bootstrap_admin(store, admin_password).await?;
    for collection in Collection::ALL.into_iter().filter(|c| *c != Collection::Users) {
        store.ensure_file::<Row>(collection, &[])?;
    }
    tracing::info!("📁 Diretório de dados pronto em {}", store.data_dir().display());
    Ok(())
}

/// Resultado de uma gravação local seguida (ou não) de sincronização remota.
/// Os avisos nunca desfazem o que já foi gravado localmente.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub saved: usize,
    pub updated: usize,
    pub deleted: usize,
    pub synced: usize,
    pub mirrored: usize,
    pub warnings: Vec<String>,
}

impl Outcome {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Resumo numa linha, só com as métricas não nulas: "Acção: saved: 2, synced: 2".
    pub fn summary(&self, action: &str) -> String {
        let metrics = [
            ("saved", self.saved),
            ("updated", self.updated),
            ("deleted", self.deleted),
            ("synced", self.synced),
            ("mirrored", self.mirrored),
        ];
        let parts: Vec<String> = metrics
            .iter()
            .filter(|(_, v)| *v > 0)
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        if parts.is_empty() {
            action.to_string()
        } else {
            format!("{}: {}", action, parts.join(", "))
        }
    }

    /// Avisos juntos numa única mensagem (para a query string de feedback).
    pub fn warning_text(&self) -> Option<String> {
        if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings.join("; "))
        }
    }
}
