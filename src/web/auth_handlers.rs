// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::LoginForm,
    services::auth_service,
    state::AppState,
    templates::LoginPage,
    web::{render, SESSION_USER_KEY},
};
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;

// GET /login
pub async fn show_login_form(session: Session) -> AppResult<impl IntoResponse> {
    if session.get::<String>(SESSION_USER_KEY).await.ok().flatten().is_some() {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /home");
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(render(&LoginPage { error: None })?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("Tentativa de login para: {}", form.ps_number.trim());

    match auth_service::authenticate(&state.store, &form.ps_number, form.password.trim()).await? {
        Some(user) => {
            // Novo ID de sessão após autenticar
            session
                .cycle_id()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
            session
                .insert(SESSION_USER_KEY, user.ps_number.as_str())
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;

            tracing::info!("✅ Login bem-sucedido para: {}", user.ps_number);
            Ok(Redirect::to("/home").into_response())
        }
        None => {
            let page = LoginPage { error: Some("Invalid PS Number or password.".to_string()) };
            Ok(render(&page)?.into_response())
        }
    }
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let ps_number: Option<String> = session.get(SESSION_USER_KEY).await.ok().flatten();

    // Apaga também o lote pendente e as remoções por confirmar
    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match ps_number {
        Some(ps) => tracing::info!("🚪 Utilizador '{}' desligado.", ps),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }
    Ok(Redirect::to("/login"))
}
