// src/web/routes.rs
use crate::{
    state::AppState,
    web::{
        auth_handlers, home_handlers, material_handlers, mw_admin, mw_auth, request_handlers, school_handlers,
        stock_handlers, sync_handlers, user_handlers,
    },
};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/", get(|| async { Redirect::to("/login") }));

    // --- Rotas de Admin ---
    // Exigem login E credencial Admin
    let admin_routes = Router::new()
        .route("/requests/status", post(request_handlers::batch_status))
        .route("/requests/export.csv", get(request_handlers::export_requests))
        .route("/schools", get(school_handlers::admin_schools_page))
        .route("/schools/save", post(school_handlers::save_schools))
        .route("/schools/delete", post(school_handlers::stage_delete))
        .route("/schools/delete/confirm", post(school_handlers::confirm_delete))
        .route("/schools/delete/cancel", post(school_handlers::cancel_delete))
        .route("/schools/export.csv", get(school_handlers::export_schools))
        .route("/users", get(user_handlers::admin_users_page))
        .route("/users/save", post(user_handlers::save_users))
        .route("/users/delete", post(user_handlers::stage_delete))
        .route("/users/delete/confirm", post(user_handlers::confirm_delete))
        .route("/users/delete/cancel", post(user_handlers::cancel_delete))
        .route("/materials", get(material_handlers::admin_materials_page))
        .route("/materials/save", post(material_handlers::save_materials))
        .route("/sync", get(sync_handlers::sync_page_handler))
        .route("/sync/push", post(sync_handlers::push_handler))
        .route("/sync/pull", post(sync_handlers::pull_handler))
        // Só o require_admin aqui; o require_auth é aplicado no router pai
        .route_layer(middleware::from_fn(mw_admin::require_admin));

    // --- Rotas Autenticadas ---
    let authenticated_routes = Router::new()
        .route("/home", get(home_handlers::home_page_handler))
        .route("/requests/new", get(request_handlers::new_request_page))
        .route("/requests/batch/add", post(request_handlers::add_to_batch))
        .route("/requests/batch/clear", post(request_handlers::clear_batch))
        .route("/requests/submit", post(request_handlers::submit_batch))
        .route("/requests", get(request_handlers::manage_requests_page))
        .route("/requests/save", post(request_handlers::save_requests))
        .route("/requests/delete", post(request_handlers::stage_delete))
        .route("/requests/delete/confirm", post(request_handlers::confirm_delete))
        .route("/requests/delete/cancel", post(request_handlers::cancel_delete))
        .route("/requests/resync", post(request_handlers::resync_requests))
        .route("/stock", get(stock_handlers::stock_page))
        .route("/stock/save", post(stock_handlers::save_stock))
        .nest("/admin", admin_routes)
        // require_auth cobre todas as rotas acima, incluindo /admin/*
        .route_layer(middleware::from_fn_with_state(app_state.clone(), mw_auth::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
