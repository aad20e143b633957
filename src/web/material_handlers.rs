// src/web/material_handlers.rs
use crate::{
    error::AppResult,
    models::user::CurrentUser,
    services::material_service::{self, MaterialRowInput},
    state::AppState,
    templates::{AdminMaterialsPage, MaterialRowView},
    web::{grid::GridForm, render, result_redirect, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect},
};

const MATERIALS_PATH: &str = "/admin/materials";
const BLANK_ROWS: usize = 5;

// GET /admin/materials
pub async fn admin_materials_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let materials = material_service::find_all_materials(&state.store)?;
    let existing = materials.len();
    let mut rows: Vec<MaterialRowView> = materials
        .into_iter()
        .enumerate()
        .map(|(idx, m)| MaterialRowView { idx, category: m.category, subcategory: m.subcategory, item: m.item })
        .collect();
    rows.extend((existing..existing + BLANK_ROWS).map(|idx| MaterialRowView {
        idx,
        category: String::new(),
        subcategory: String::new(),
        item: String::new(),
    }));
    render(&AdminMaterialsPage { nav: (&user).into(), flash: params.into(), rows })
}

// POST /admin/materials/save
pub async fn save_materials(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let rows = GridForm::parse(pairs)
        .rows
        .iter()
        .map(|row| MaterialRowInput {
            category: row.get("category").to_string(),
            subcategory: row.get("subcategory").to_string(),
            item: row.get("item").to_string(),
        })
        .collect();
    let result = material_service::save_material_grid(&state.store, state.remote(), rows).await;
    result_redirect(MATERIALS_PATH, "Materials — Save", result)
}
