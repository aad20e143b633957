// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::CurrentUser,
    services::user_service,
    state::AppState,
    web::SESSION_USER_KEY,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

// Middleware que verifica se o utilizador está logado e põe o `CurrentUser` nas extensões
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ps_number = match session.get::<String>(SESSION_USER_KEY).await {
        Ok(Some(ps)) => ps,
        Ok(None) => {
            tracing::debug!("Autenticação MW: sem sessão, redirecionando para /login");
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => {
            tracing::error!("Autenticação MW: Erro ao ler sessão: {:?}", e);
            return Err(AppError::SessionError(format!("Erro ao verificar sessão: {}", e)));
        }
    };

    // Relê o utilizador a cada pedido: credencial alterada ou conta removida têm efeito imediato
    match user_service::find_user(&state.store, &ps_number)? {
        Some(user) => {
            tracing::debug!("Autenticação MW: '{}' autenticado.", ps_number);
            request.extensions_mut().insert(CurrentUser::from(&user));
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!("Autenticação MW: '{}' já não existe em users.json; terminando sessão.", ps_number);
            session.flush().await?;
            Ok(Redirect::to("/login").into_response())
        }
    }
}
