// src/web/school_handlers.rs
use crate::{
    error::AppResult,
    models::{collection::Collection, user::CurrentUser},
    services::{
        csv_export,
        school_service::{self, SchoolRowInput},
    },
    state::AppState,
    templates::{AdminSchoolsPage, SchoolRowView},
    web::{
        confirm, grid::GridForm, redirect_with, render, result_redirect, success_redirect, FeedbackParams,
    },
};
use axum::{
    extract::{Extension, Form, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;

const SCHOOLS_PATH: &str = "/admin/schools";
const BLANK_ROWS: usize = 3;
const DELETE_PREVIEW_LIMIT: usize = 10;

// GET /admin/schools
pub async fn admin_schools_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let schools = school_service::find_all_schools(&state.store)?;
    let staged = confirm::staged(&session, Collection::Schools).await?;

    let confirm = (!staged.is_empty()).then(|| {
        let preview = schools
            .iter()
            .filter(|s| staged.contains(&s.id))
            .map(|s| s.label())
            .collect();
        confirm::confirm_view("school(s)", SCHOOLS_PATH, preview, staged.len(), DELETE_PREVIEW_LIMIT)
    });

    let existing = schools.len();
    let mut rows: Vec<SchoolRowView> = schools
        .into_iter()
        .enumerate()
        .map(|(idx, s)| SchoolRowView {
            idx,
            coaches: s.coaches.join(","),
            id: s.id,
            nome: s.nome,
            city: s.city,
            is_new: false,
        })
        .collect();
    rows.extend((existing..existing + BLANK_ROWS).map(|idx| SchoolRowView {
        idx,
        id: String::new(),
        nome: String::new(),
        city: String::new(),
        coaches: String::new(),
        is_new: true,
    }));

    render(&AdminSchoolsPage { nav: (&user).into(), flash: params.into(), rows, confirm })
}

// POST /admin/schools/save
pub async fn save_schools(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let form = GridForm::parse(pairs);
    // Linhas em branco (as novas por preencher) não contam
    let rows = form
        .filled_rows()
        .map(|row| SchoolRowInput {
            id: row.get("id").to_string(),
            nome: row.get("nome").to_string(),
            city: row.get("city").to_string(),
            coaches: row.get("coaches").to_string(),
        })
        .collect();
    let result = school_service::save_school_grid(&state.store, state.remote(), rows).await;
    result_redirect(SCHOOLS_PATH, "Admin Schools — Save", result)
}

// POST /admin/schools/delete
pub async fn stage_delete(session: Session, Form(pairs): Form<Vec<(String, String)>>) -> AppResult<Redirect> {
    let ids = GridForm::parse(pairs).all("mark");
    if ids.is_empty() {
        return Ok(redirect_with(SCHOOLS_PATH, &[("warning", Some("No schools selected for deletion.".to_string()))]));
    }
    let message = format!("Review and confirm deletion of {} school(s) below.", ids.len());
    confirm::stage(&session, Collection::Schools, ids).await?;
    Ok(redirect_with(SCHOOLS_PATH, &[("warning", Some(message))]))
}

// POST /admin/schools/delete/confirm
pub async fn confirm_delete(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    let ids = confirm::take(&session, Collection::Schools).await?;
    if ids.is_empty() {
        return Ok(Redirect::to(SCHOOLS_PATH));
    }
    let result = school_service::delete_schools(&state.store, state.remote(), &ids).await;
    result_redirect(SCHOOLS_PATH, "Admin Schools — Delete", result)
}

// POST /admin/schools/delete/cancel
pub async fn cancel_delete(session: Session) -> AppResult<Redirect> {
    confirm::take(&session, Collection::Schools).await?;
    Ok(success_redirect(SCHOOLS_PATH, "School deletion canceled."))
}

// GET /admin/schools/export.csv
pub async fn export_schools(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let schools = school_service::find_all_schools(&state.store)?;
    let disposition = format!("attachment; filename=\"{}\"", csv_export::export_file_name("schools"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv_export::schools_csv(&schools),
    ))
}
