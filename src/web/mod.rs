// src/web/mod.rs
pub mod auth_handlers;
pub mod confirm;
pub mod grid;
pub mod home_handlers;
pub mod material_handlers;
pub mod mw_admin;
pub mod mw_auth;
pub mod request_handlers;
pub mod routes;
pub mod school_handlers;
pub mod stock_handlers;
pub mod sync_handlers;
pub mod user_handlers;

use crate::{
    error::{AppError, AppResult},
    services::Outcome,
    templates::Flash,
};
use askama::Template;
use axum::response::{Html, Redirect};
use serde::Deserialize;

// Chaves da sessão
pub const SESSION_USER_KEY: &str = "ps_number";
pub const PENDING_REQUEST_KEY: &str = "pending_request";
pub const UNSYNCED_REQUESTS_KEY: &str = "unsynced_request_ids";

/// Feedback do padrão Post/Redirect/Get (`?success=...&warning=...&error=...`).
#[derive(Deserialize, Debug, Default)]
pub struct FeedbackParams {
    pub success: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl From<FeedbackParams> for Flash {
    fn from(params: FeedbackParams) -> Self {
        Flash { success: params.success, warning: params.warning, error: params.error }
    }
}

/// Renderiza um template Askama, logando falhas.
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template: {}", e);
        AppError::Template(e)
    })
}

/// Redirect com mensagens de feedback codificadas na query string.
pub fn redirect_with(path: &str, messages: &[(&str, Option<String>)]) -> Redirect {
    let query: Vec<String> = messages
        .iter()
        .filter_map(|(key, msg)| msg.as_ref().map(|m| format!("{}={}", key, urlencoding::encode(m))))
        .collect();
    if query.is_empty() {
        return Redirect::to(path);
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    let redirect_url = format!("{}{}{}", path, separator, query.join("&"));
    Redirect::to(&redirect_url)
}

pub fn success_redirect(path: &str, message: impl Into<String>) -> Redirect {
    redirect_with(path, &[("success", Some(message.into()))])
}

pub fn error_redirect(path: &str, message: impl Into<String>) -> Redirect {
    redirect_with(path, &[("error", Some(message.into()))])
}

/// Resumo do `Outcome` como sucesso, avisos de sincronização como `warning`.
pub fn outcome_redirect(path: &str, action: &str, outcome: &Outcome) -> Redirect {
    redirect_with(
        path,
        &[("success", Some(outcome.summary(action))), ("warning", outcome.warning_text())],
    )
}

/// Erros de validação voltam à página como `?error=`; os restantes propagam.
pub fn result_redirect(path: &str, action: &str, result: AppResult<Outcome>) -> AppResult<Redirect> {
    match result {
        Ok(outcome) => Ok(outcome_redirect(path, action, &outcome)),
        Err(AppError::Validation(errors)) => Ok(error_redirect(path, errors.join("; "))),
        Err(e) => Err(e),
    }
}
