// src/web/sync_handlers.rs
use crate::{
    error::AppResult,
    models::user::CurrentUser,
    services::sync_service::{self, SyncOptions, SyncReport},
    state::AppState,
    templates::{SyncLineView, SyncPage},
    web::{error_redirect, grid::GridForm, render, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Response},
};

const SYNC_PATH: &str = "/admin/sync";
const NO_REMOTE: &str = "Remote store is not configured.";

/// Botões: "force" força o upsert, "replace" apaga e reenvia; os restantes usam as checkboxes.
fn push_options(form: &GridForm) -> SyncOptions {
    match form.first("mode").unwrap_or("") {
        "force" => SyncOptions { force: true, replace: false },
        "replace" => SyncOptions { force: true, replace: true },
        _ => {
            let replace = form.flag("replace");
            SyncOptions { force: replace || form.flag("force"), replace }
        }
    }
}

fn sync_page(state: &AppState, user: &CurrentUser, flash: FeedbackParams, run: Option<(&str, SyncReport)>) -> SyncPage {
    let (summary, lines) = match run {
        Some((action, report)) => {
            let summary = report.summary(action);
            let lines = report
                .tables
                .into_iter()
                .map(|t| SyncLineView { message: t.message(), is_error: t.is_error(), notes: t.notes })
                .collect();
            (Some(summary), lines)
        }
        None => (None, Vec::new()),
    };
    SyncPage {
        nav: user.into(),
        flash: flash.into(),
        remote_name: state.remote().map(|r| r.name().to_string()),
        summary,
        lines,
    }
}

// GET /admin/sync
pub async fn sync_page_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    render(&sync_page(&state, &user, params, None))
}

// POST /admin/sync/push
pub async fn push_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Response> {
    let Some(remote) = state.remote() else {
        return Ok(error_redirect(SYNC_PATH, NO_REMOTE).into_response());
    };
    let options = push_options(&GridForm::parse(pairs));
    tracing::info!("Sync push pedido por {} ({:?})", user.ps_number, options);
    let report = sync_service::push_all(&state.store, remote, options).await;
    Ok(render(&sync_page(&state, &user, FeedbackParams::default(), Some(("Data Sync", report))))?.into_response())
}

// POST /admin/sync/pull
pub async fn pull_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Response> {
    let Some(remote) = state.remote() else {
        return Ok(error_redirect(SYNC_PATH, NO_REMOTE).into_response());
    };
    tracing::info!("Sync pull pedido por {}", user.ps_number);
    let report = sync_service::pull_all(&state.store, remote).await;
    Ok(render(&sync_page(&state, &user, FeedbackParams::default(), Some(("Pull", report))))?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> GridForm {
        GridForm::parse(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn buttons_override_checkboxes() {
        assert_eq!(push_options(&form(&[("mode", "force")])), SyncOptions { force: true, replace: false });
        assert_eq!(
            push_options(&form(&[("force", "on"), ("mode", "replace")])),
            SyncOptions { force: true, replace: true }
        );
    }

    #[test]
    fn replace_checkbox_implies_force() {
        assert_eq!(
            push_options(&form(&[("replace", "on"), ("mode", "options")])),
            SyncOptions { force: true, replace: true }
        );
        assert_eq!(push_options(&form(&[("mode", "options")])), SyncOptions::default());
    }
}
