// src/web/request_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        collection::Collection,
        request::{MaterialRequest, RequestStatus},
        user::CurrentUser,
    },
    services::{
        csv_export, material_service,
        request_service::{self, NewRequestItem, RequestEditInput},
        school_service, user_service,
    },
    state::AppState,
    templates::{BatchItemView, RequestNewPage, RequestRowView, RequestsPage, SelectOption},
    web::{
        confirm, error_redirect, grid::GridForm, outcome_redirect, redirect_with, render, result_redirect,
        success_redirect, FeedbackParams, PENDING_REQUEST_KEY, UNSYNCED_REQUESTS_KEY,
    },
};
use axum::{
    extract::{Extension, Form, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::collections::HashMap;
use tower_sessions::Session;

const REQUESTS_PATH: &str = "/requests";
const NEW_REQUEST_PATH: &str = "/requests/new";
const DELETE_PREVIEW_LIMIT: usize = 10;

#[derive(Deserialize, Debug)]
pub struct NewRequestQuery {
    category: Option<String>,
    #[serde(flatten)]
    feedback: FeedbackParams,
}

#[derive(Deserialize, Debug)]
pub struct AddItemForm {
    school_id: String,
    category: String,
    material: String,
    quantity: String,
}

#[derive(Deserialize, Debug)]
pub struct ManageQuery {
    school: Option<String>,
    #[serde(flatten)]
    feedback: FeedbackParams,
}

async fn pending_batch(session: &Session) -> AppResult<Vec<NewRequestItem>> {
    Ok(session.get(PENDING_REQUEST_KEY).await?.unwrap_or_default())
}

async fn unsynced_ids(session: &Session) -> AppResult<Vec<String>> {
    Ok(session.get(UNSYNCED_REQUESTS_KEY).await?.unwrap_or_default())
}

fn new_request_path(category: &str) -> String {
    format!("{}?category={}", NEW_REQUEST_PATH, urlencoding::encode(category))
}

// GET /requests/new
pub async fn new_request_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Query(query): Query<NewRequestQuery>,
) -> AppResult<impl IntoResponse> {
    let schools = school_service::visible_schools(school_service::find_all_schools(&state.store)?, &user);
    let materials = material_service::find_all_materials(&state.store)?;
    let categories = material_service::categories(&materials);

    // Sem categoria escolhida, usa a primeira do catálogo
    let category = query
        .category
        .filter(|c| categories.contains(c))
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    let names = school_service::school_names(&schools);
    let batch = pending_batch(&session)
        .await?
        .into_iter()
        .map(|item| BatchItemView {
            school: names.get(&item.school_id).cloned().unwrap_or_else(|| item.school_id.clone()),
            category: item.category,
            material: item.material,
            quantity: item.quantity,
        })
        .collect();

    let page = RequestNewPage {
        nav: (&user).into(),
        flash: query.feedback.into(),
        schools: schools
            .iter()
            .map(|s| SelectOption::new(s.id.as_str(), s.label(), false))
            .collect(),
        categories: SelectOption::list(&categories, &category),
        materials: material_service::by_category(&materials, &category)
            .into_iter()
            .map(|m| SelectOption::new(m.label(), m.label(), false))
            .collect(),
        category,
        batch,
    };
    render(&page)
}

// POST /requests/batch/add
pub async fn add_to_batch(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Form(form): Form<AddItemForm>,
) -> AppResult<Redirect> {
    let back = new_request_path(&form.category);

    let quantity = match form.quantity.trim().parse::<i64>() {
        Ok(q) if q >= 1 => q,
        _ => return Ok(error_redirect(&back, "Quantity must be a whole number of at least 1.")),
    };
    let visible = school_service::visible_school_ids(&state.store, &user)?;
    if !visible.contains(form.school_id.trim()) {
        tracing::warn!("{} tentou pedir para a escola {} sem acesso.", user.ps_number, form.school_id);
        return Ok(error_redirect(&back, "Pick one of your schools."));
    }
    let materials = material_service::find_all_materials(&state.store)?;
    let known = material_service::by_category(&materials, &form.category)
        .iter()
        .any(|m| m.label() == form.material);
    if !known {
        return Ok(error_redirect(&back, "Pick an item from the catalog."));
    }

    let mut batch = pending_batch(&session).await?;
    batch.push(NewRequestItem {
        school_id: form.school_id.trim().to_string(),
        category: form.category.clone(),
        material: form.material.clone(),
        quantity,
    });
    session.insert(PENDING_REQUEST_KEY, &batch).await?;
    tracing::debug!("Lote de {} tem agora {} item(ns).", user.ps_number, batch.len());

    Ok(success_redirect(&back, format!("Added {} × {} to the current batch.", quantity, form.material)))
}

// POST /requests/batch/clear
pub async fn clear_batch(session: Session) -> AppResult<Redirect> {
    session.remove::<Vec<NewRequestItem>>(PENDING_REQUEST_KEY).await?;
    Ok(success_redirect(NEW_REQUEST_PATH, "Current batch cleared."))
}

// POST /requests/submit
pub async fn submit_batch(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
) -> AppResult<Redirect> {
    let batch = pending_batch(&session).await?;
    let submission =
        match request_service::submit_batch(&state.store, state.remote(), user.ps_number.as_str(), &batch).await {
            Ok(submission) => submission,
            Err(AppError::Validation(errors)) => {
                return Ok(redirect_with(
                    NEW_REQUEST_PATH,
                    &[
                        ("error", Some("Cannot submit: invalid items detected.".to_string())),
                        ("warning", Some(errors.join("; "))),
                    ],
                ));
            }
            Err(e) => return Err(e),
        };

    session.remove::<Vec<NewRequestItem>>(PENDING_REQUEST_KEY).await?;
    let failed = submission.unsynced_ids();
    if !failed.is_empty() {
        let mut unsynced = unsynced_ids(&session).await?;
        unsynced.extend(failed.iter().map(|id| id.to_string()));
        session.insert(UNSYNCED_REQUESTS_KEY, &unsynced).await?;
    }
    Ok(outcome_redirect(NEW_REQUEST_PATH, "Submit Request", &submission.outcome))
}

fn row_view(
    idx: usize,
    request: MaterialRequest,
    school_names: &HashMap<String, String>,
    requesters: &HashMap<String, String>,
) -> RequestRowView {
    let school_id = request.school_id.trim();
    let status = request.status.to_string();
    RequestRowView {
        idx,
        id: request.id.to_string(),
        school: school_names
            .get(school_id)
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| school_id.to_string()),
        requester: request_service::requester_name(requesters, &request.ps_number),
        ps_number: request.ps_number.clone(),
        category: request.category,
        material: request.material,
        quantity: request.quantity,
        status_options: SelectOption::list(&RequestStatus::GRID_OPTIONS, &status),
        status,
        date: request.date,
    }
}

// GET /requests
pub async fn manage_requests_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Query(query): Query<ManageQuery>,
) -> AppResult<impl IntoResponse> {
    let all_schools = school_service::find_all_schools(&state.store)?;
    let school_names = school_service::school_names(&all_schools);
    let visible_ids = school_service::visible_school_ids(&state.store, &user)?;
    let requests = request_service::load_requests(&state.store)?;
    let staged = confirm::staged(&session, Collection::Requests).await?;

    // Pré-visualização da remoção pendente (antes do filtro por escola)
    let confirm = if staged.is_empty() {
        None
    } else {
        let preview = requests
            .iter()
            .filter(|r| staged.contains(&r.id.to_string()))
            .map(|r| format!("{} · {} · {} · {}", r.school_id, r.material, r.quantity, r.date))
            .collect();
        Some(confirm::confirm_view("request(s)", REQUESTS_PATH, preview, staged.len(), DELETE_PREVIEW_LIMIT))
    };

    let mut visible = request_service::visible_requests(requests, &user, &visible_ids);
    let school_filter = query.school.unwrap_or_default();

    // Opções do filtro: escolas que aparecem nos pedidos visíveis
    let mut filter_ids: Vec<String> = visible.iter().map(|r| r.school_id.trim().to_string()).collect();
    filter_ids.sort();
    filter_ids.dedup();
    filter_ids.retain(|id| !id.is_empty());
    let schools = filter_ids
        .iter()
        .map(|id| {
            let name = school_names.get(id).map(String::as_str).unwrap_or("(unknown)");
            SelectOption::new(id.as_str(), format!("{} ({})", name, id), *id == school_filter)
        })
        .collect();

    if !school_filter.is_empty() {
        visible.retain(|r| r.school_id.trim() == school_filter);
    }

    let requesters = if user.is_admin() {
        user_service::requester_lookup(&user_service::find_all_users(&state.store)?)
    } else {
        HashMap::new()
    };

    let (pending, finalized): (Vec<_>, Vec<_>) = visible.into_iter().partition(|r| r.status.is_pending());
    let page = RequestsPage {
        nav: (&user).into(),
        flash: query.feedback.into(),
        schools,
        school_filter,
        pending: pending
            .into_iter()
            .enumerate()
            .map(|(idx, r)| row_view(idx, r, &school_names, &requesters))
            .collect(),
        finalized: finalized
            .into_iter()
            .enumerate()
            .map(|(idx, r)| row_view(idx, r, &school_names, &requesters))
            .collect(),
        batch_status_options: SelectOption::list(&RequestStatus::BATCH_OPTIONS, RequestStatus::Approved.as_str()),
        unsynced_count: unsynced_ids(&session).await?.len(),
        confirm,
    };
    render(&page)
}

// POST /requests/save
pub async fn save_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let form = GridForm::parse(pairs);
    let edits = form
        .rows
        .iter()
        .filter(|row| !row.get("id").is_empty())
        .map(|row| RequestEditInput {
            id: row.get("id").to_string(),
            category: row.get("category").to_string(),
            material: row.get("material").to_string(),
            quantity: row.get("quantity").to_string(),
            status: row.has("status").then(|| row.get("status").to_string()),
        })
        .collect();
    let result = request_service::save_pending_edits(&state.store, state.remote(), &user, edits).await;
    result_redirect(REQUESTS_PATH, "Manage Requests — Save", result)
}

// POST /requests/delete
pub async fn stage_delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let marked = GridForm::parse(pairs).all("mark");
    let ids = request_service::deletable_ids(&state.store, &user, &marked)?;
    if ids.is_empty() {
        return Ok(redirect_with(REQUESTS_PATH, &[("warning", Some("No rows selected for deletion.".to_string()))]));
    }
    let message = format!("Review and confirm deletion of {} request(s) below.", ids.len());
    confirm::stage(&session, Collection::Requests, ids).await?;
    Ok(redirect_with(REQUESTS_PATH, &[("warning", Some(message))]))
}

// POST /requests/delete/confirm
pub async fn confirm_delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
) -> AppResult<Redirect> {
    let ids = confirm::take(&session, Collection::Requests).await?;
    if ids.is_empty() {
        return Ok(Redirect::to(REQUESTS_PATH));
    }
    let result = request_service::delete_requests(&state.store, state.remote(), &user, &ids).await;
    result_redirect(REQUESTS_PATH, "Manage Requests — Delete", result)
}

// POST /requests/delete/cancel
pub async fn cancel_delete(session: Session) -> AppResult<Redirect> {
    confirm::take(&session, Collection::Requests).await?;
    Ok(success_redirect(REQUESTS_PATH, "Deletion canceled."))
}

// POST /requests/resync
pub async fn resync_requests(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    let ids = unsynced_ids(&session).await?;
    let outcome = match request_service::resync(&state.store, state.remote(), &ids).await {
        Ok(outcome) => outcome,
        Err(AppError::Validation(errors)) => return Ok(error_redirect(REQUESTS_PATH, errors.join("; "))),
        Err(e) => return Err(e),
    };
    if outcome.warnings.is_empty() {
        session.remove::<Vec<String>>(UNSYNCED_REQUESTS_KEY).await?;
    }
    Ok(outcome_redirect(REQUESTS_PATH, "Retry Sync", &outcome))
}

// POST /admin/requests/status
pub async fn batch_status(
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let form = GridForm::parse(pairs);
    let selected = form.all("select");
    let status = RequestStatus::from(form.first("new_status").unwrap_or(RequestStatus::Approved.as_str()));
    let result = request_service::update_status(&state.store, state.remote(), &selected, status).await;
    if result.is_ok() {
        confirm::take(&session, Collection::Requests).await?;
    }
    result_redirect(REQUESTS_PATH, "Manage Requests — Batch Status", result)
}

// GET /admin/requests/export.csv
pub async fn export_requests(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let body = request_service::export_requests_csv(&state.store)?;
    let disposition = format!("attachment; filename=\"{}\"", csv_export::export_file_name("requests"));
    tracing::info!("📤 Export CSV de pedidos.");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
