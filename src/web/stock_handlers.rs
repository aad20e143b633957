// src/web/stock_handlers.rs
use crate::{
    error::AppResult,
    models::{stock::PROJECT_OPTIONS, user::CurrentUser},
    services::{
        school_service,
        stock_service::{self, StockRowInput},
    },
    state::AppState,
    templates::{SelectOption, StockLineView, StockPage, StockProjectView, StockRowView},
    web::{grid::GridForm, render, result_redirect, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::collections::HashSet;

const BLANK_ROWS: usize = 3;

#[derive(Deserialize, Debug)]
pub struct StockQuery {
    school: Option<String>,
    #[serde(flatten)]
    feedback: FeedbackParams,
}

fn stock_path(school: &str) -> String {
    if school.is_empty() {
        "/stock".to_string()
    } else {
        format!("/stock?school={}", urlencoding::encode(school))
    }
}

/// Select de projeto; valores fora da lista (ex.: legado) continuam disponíveis.
fn project_options(current: &str) -> Vec<SelectOption> {
    let mut options = SelectOption::list(&PROJECT_OPTIONS, current);
    if !current.is_empty() && !PROJECT_OPTIONS.contains(&current) {
        options.push(SelectOption::new(current, current, true));
    }
    options
}

// GET /stock
pub async fn stock_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StockQuery>,
) -> AppResult<impl IntoResponse> {
    let schools = school_service::visible_schools(school_service::find_all_schools(&state.store)?, &user);
    let visible_ids: HashSet<String> = schools.iter().map(|s| s.id.clone()).collect();
    let school_filter = query.school.unwrap_or_default();

    let stock = stock_service::visible_stock(
        stock_service::load_stock(&state.store)?,
        &user,
        &visible_ids,
        (!school_filter.is_empty()).then_some(school_filter.as_str()),
    );

    let summary = stock_service::summarize(&stock)
        .into_iter()
        .map(|(project, types)| StockProjectView {
            project,
            lines: types
                .into_iter()
                .flat_map(|(kind, sizes)| {
                    sizes.into_iter().map(move |(size, quantity)| StockLineView {
                        kind: kind.clone(),
                        size,
                        quantity,
                    })
                })
                .collect(),
        })
        .collect();

    let existing = stock.len();
    let mut rows: Vec<StockRowView> = stock
        .into_iter()
        .enumerate()
        .map(|(idx, s)| StockRowView {
            idx,
            id: s.id.to_string(),
            project_options: project_options(&s.project),
            school_id: s.school_id,
            kind: s.kind,
            size: s.size,
            quantity: s.quantity.to_string(),
        })
        .collect();
    rows.extend((existing..existing + BLANK_ROWS).map(|idx| StockRowView {
        idx,
        id: String::new(),
        school_id: school_filter.clone(),
        project_options: project_options(PROJECT_OPTIONS[0]),
        kind: String::new(),
        size: String::new(),
        quantity: String::new(),
    }));

    let page = StockPage {
        nav: (&user).into(),
        flash: query.feedback.into(),
        schools: schools
            .iter()
            .map(|s| SelectOption::new(s.id.as_str(), s.label(), s.id == school_filter))
            .collect(),
        school_filter,
        summary,
        rows,
    };
    render(&page)
}

// POST /stock/save
pub async fn save_stock(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let form = GridForm::parse(pairs);
    let back = stock_path(form.first("school").unwrap_or(""));

    // Linhas novas só com o project pré-selecionado contam como vazias
    let rows = form
        .rows
        .iter()
        .filter(|row| {
            !(row.get("id").is_empty()
                && row.get("type").trim().is_empty()
                && row.get("size").trim().is_empty()
                && row.get("quantity").trim().is_empty())
        })
        .map(|row| StockRowInput {
            id: row.get("id").to_string(),
            school_id: row.get("school_id").to_string(),
            project: row.get("project").to_string(),
            kind: row.get("type").to_string(),
            size: row.get("size").to_string(),
            quantity: row.get("quantity").to_string(),
        })
        .collect();
    let result = stock_service::save_stock_grid(&state.store, state.remote(), &user, rows).await;
    result_redirect(&back, "Kimono Stock — Save", result)
}
