// src/web/user_handlers.rs
use crate::{
    error::AppResult,
    models::{
        collection::Collection,
        ps_number,
        user::{Credential, CurrentUser},
    },
    services::{
        auth_service,
        user_service::{self, UserRowInput},
    },
    state::AppState,
    templates::{AdminUsersPage, SelectOption, UserRowView},
    web::{confirm, grid::GridForm, redirect_with, render, result_redirect, success_redirect, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;

const USERS_PATH: &str = "/admin/users";
const BLANK_ROWS: usize = 3;
const DELETE_PREVIEW_LIMIT: usize = 20;

// GET /admin/users
pub async fn admin_users_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /admin/users: Carregando página de gestão...");
    let users = user_service::find_all_users(&state.store)?;
    let staged = confirm::staged(&session, Collection::Users).await?;
    let confirm = (!staged.is_empty()).then(|| {
        confirm::confirm_view("user(s)", USERS_PATH, staged.clone(), staged.len(), DELETE_PREVIEW_LIMIT)
    });

    let existing = users.len();
    let mut rows: Vec<UserRowView> = users
        .into_iter()
        .enumerate()
        .map(|(idx, u)| UserRowView {
            idx,
            credential_options: SelectOption::list(&Credential::OPTIONS, u.credential.as_str()),
            legacy_password: !auth_service::is_bcrypt_hash(&u.password),
            ps_number: u.ps_number.to_string(),
            name: u.name,
            is_new: false,
        })
        .collect();
    rows.extend((existing..existing + BLANK_ROWS).map(|idx| UserRowView {
        idx,
        ps_number: String::new(),
        name: String::new(),
        credential_options: SelectOption::list(&Credential::OPTIONS, Credential::Coach.as_str()),
        is_new: true,
        legacy_password: false,
    }));

    render(&AdminUsersPage { nav: (&user).into(), flash: params.into(), rows, confirm })
}

// POST /admin/users/save
pub async fn save_users(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let form = GridForm::parse(pairs);
    let rows = form
        .rows
        .iter()
        .map(|row| UserRowInput {
            ps_number: row.get("ps_number").to_string(),
            new_password: row.get("password").to_string(),
            credential: row.get("credential").to_string(),
            name: row.get("name").to_string(),
        })
        .collect();
    let result = user_service::save_user_grid(&state.store, state.remote(), rows).await;
    result_redirect(USERS_PATH, "Admin Users — Save", result)
}

// POST /admin/users/delete
pub async fn stage_delete(
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let marked: Vec<String> = GridForm::parse(pairs)
        .all("mark")
        .iter()
        .map(|p| ps_number::normalize(p))
        .collect();
    if marked.is_empty() {
        return Ok(redirect_with(USERS_PATH, &[("warning", Some("No users selected for deletion.".to_string()))]));
    }
    if marked.iter().any(|p| p == user.ps_number.as_str()) {
        return Ok(redirect_with(USERS_PATH, &[("error", Some("You cannot delete your own account.".to_string()))]));
    }
    let message = format!("Review and confirm deletion of {} user(s) below.", marked.len());
    confirm::stage(&session, Collection::Users, marked).await?;
    Ok(redirect_with(USERS_PATH, &[("warning", Some(message))]))
}

// POST /admin/users/delete/confirm
pub async fn confirm_delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
) -> AppResult<Redirect> {
    let ps_numbers = confirm::take(&session, Collection::Users).await?;
    if ps_numbers.is_empty() {
        return Ok(Redirect::to(USERS_PATH));
    }
    let result = user_service::delete_users(&state.store, state.remote(), &user.ps_number, &ps_numbers).await;
    result_redirect(USERS_PATH, "Admin Users — Delete", result)
}

// POST /admin/users/delete/cancel
pub async fn cancel_delete(session: Session) -> AppResult<Redirect> {
    confirm::take(&session, Collection::Users).await?;
    Ok(success_redirect(USERS_PATH, "User deletion canceled."))
}
