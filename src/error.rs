// src/error.rs
use crate::templates::ErrorPage;
use askama::Template;
use axum::{http::StatusCode, response::Html, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro de I/O nos ficheiros de dados: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ficheiro de dados '{file}' inválido: {reason}")]
    InvalidDataFile { file: String, reason: String },

    #[error("Erro na base de dados de sessões: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("Erro ao renderizar template: {0}")]
    Template(#[from] askama::Error),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    /// Erros de validação que bloqueiam um save inteiro.
    #[error("Dados inválidos: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Erro interno inesperado")]
    InternalServerError,

    #[error("Não autorizado")]
    Unauthorized,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::SessionError(e.to_string())
    }
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // Loga o erro detalhado no servidor
        tracing::error!("Erro processado: {:?}", self);

        let (status, user_message) = match &self {
            AppError::Io(_) | AppError::Json(_) | AppError::InvalidDataFile { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not read or write the local data files.".to_string(),
            ),
            AppError::SqlxError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session storage error.".to_string(),
            ),
            AppError::EnvVarError(_) | AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error.".to_string(),
            ),
            AppError::PasswordHashingError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not process credentials.".to_string(),
            ),
            AppError::SessionError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error.".to_string(),
            ),
            AppError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors.join("; ")),
            AppError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this section.".to_string(),
            ),
            AppError::Template(_) | AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error.".to_string(),
            ),
        };

        let page = ErrorPage { status_code: status.as_u16(), message: user_message };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Falha ao renderizar a página de erro: {}", e);
                (status, page.message).into_response()
            }
        }
    }
}


// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;
