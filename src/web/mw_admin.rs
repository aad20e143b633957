// src/web/mw_admin.rs
use crate::{error::AppError, models::user::CurrentUser};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Só deixa passar utilizadores com credencial Admin.
/// Deve correr *depois* do `require_auth`, que põe o `CurrentUser` nas extensões.
pub async fn require_admin(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.is_admin() {
        tracing::debug!("Admin MW: acesso concedido para {}", user.ps_number);
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Admin MW: acesso negado para {} (credencial {}).", user.ps_number, user.credential);
        Err(AppError::Unauthorized)
    }
}
