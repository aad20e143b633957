//! Armazenamento remoto (uma tabela por coleção).
//!
//! O portal fala com o remoto apenas através de [`RemoteStore`]: em produção é o
//! [`SupabaseClient`] (PostgREST sobre HTTP); nos testes e em demonstrações
//! locais é o [`MemoryRemote`].

use crate::models::Row;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod supabase;

pub use memory::MemoryRemote;
pub use supabase::SupabaseClient;

/// Erros do armazenamento remoto.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Falha de transporte (rede, timeout, TLS).
    #[error("remote transport error: {0}")]
    Transport(String),

    /// O remoto respondeu com um estado de erro.
    #[error("remote API error ({status}): {message}")]
    Api {
        /// Código HTTP devolvido.
        status: u16,
        /// Corpo/mensagem de erro.
        message: String,
    },

    /// Resposta com formato inesperado.
    #[error("remote parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Operações mínimas sobre as tabelas remotas.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Nome para os logs.
    fn name(&self) -> &'static str;

    /// Todas as linhas da tabela (até ao limite do intervalo de leitura).
    async fn select_all(&self, table: &str) -> Result<Vec<Row>, RemoteError>;

    /// `true` se a tabela tiver pelo menos uma linha.
    async fn has_rows(&self, table: &str) -> Result<bool, RemoteError>;

    /// Insert-or-update. Sem `on_conflict` é um insert simples.
    async fn upsert(&self, table: &str, rows: &[Row], on_conflict: Option<&str>) -> Result<(), RemoteError>;

    /// Apaga as linhas cujo `column` está em `values`.
    async fn delete_in(&self, table: &str, column: &str, values: &[String]) -> Result<(), RemoteError>;

    /// Apaga todas as linhas com `column` não vazio.
    async fn delete_all(&self, table: &str, column: &str) -> Result<(), RemoteError>;
}
