// src/web/home_handlers.rs
use crate::{
    error::AppResult,
    models::user::CurrentUser,
    services::{request_service, school_service},
    state::AppState,
    templates::HomePage,
    web::{render, FeedbackParams, UNSYNCED_REQUESTS_KEY},
};
use axum::{
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use tower_sessions::Session;

// GET /home
pub async fn home_page_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /home: Acesso para {}", user.ps_number);

    let school_ids = school_service::visible_school_ids(&state.store, &user)?;
    let requests = request_service::visible_requests(request_service::load_requests(&state.store)?, &user, &school_ids);
    let unsynced: Vec<String> = session.get(UNSYNCED_REQUESTS_KEY).await?.unwrap_or_default();

    let page = HomePage {
        nav: (&user).into(),
        flash: params.into(),
        school_count: school_ids.len(),
        pending_count: requests.iter().filter(|r| r.status.is_pending()).count(),
        unsynced_count: unsynced.len(),
        remote_enabled: state.remote.is_some(),
    };
    render(&page)
}
