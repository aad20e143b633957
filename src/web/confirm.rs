// src/web/confirm.rs
//! Remoção em dois passos: as chaves marcadas ficam na sessão até "Confirm" ou "Cancel".

use crate::{error::AppResult, models::collection::Collection, templates::ConfirmView};
use tower_sessions::Session;

fn session_key(collection: Collection) -> String {
    format!("confirm_delete_{}", collection.table())
}

pub async fn stage(session: &Session, collection: Collection, keys: Vec<String>) -> AppResult<()> {
    tracing::debug!("Remoção pendente em {}: {:?}", collection, keys);
    session.insert(&session_key(collection), keys).await?;
    Ok(())
}

pub async fn staged(session: &Session, collection: Collection) -> AppResult<Vec<String>> {
    Ok(session
        .get::<Vec<String>>(&session_key(collection))
        .await?
        .unwrap_or_default())
}

/// Remove e devolve as chaves pendentes.
pub async fn take(session: &Session, collection: Collection) -> AppResult<Vec<String>> {
    Ok(session
        .remove::<Vec<String>>(&session_key(collection))
        .await?
        .unwrap_or_default())
}

/// Caixa de confirmação com uma pré-visualização limitada a `limit` linhas.
pub fn confirm_view(noun: &str, base_path: &str, preview: Vec<String>, total: usize, limit: usize) -> ConfirmView {
    let shown: Vec<String> = preview.into_iter().take(limit).collect();
    ConfirmView {
        message: format!("Confirm deletion of {} {}? This cannot be undone.", total, noun),
        more: total.saturating_sub(shown.len()),
        preview: shown,
        confirm_action: format!("{}/delete/confirm", base_path),
        cancel_action: format!("{}/delete/cancel", base_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_capped() {
        let preview: Vec<String> = (0..25).map(|i| format!("PS{}", i)).collect();
        let view = confirm_view("user(s)", "/admin/users", preview, 25, 20);
        assert_eq!(view.preview.len(), 20);
        assert_eq!(view.more, 5);
        assert_eq!(view.confirm_action, "/admin/users/delete/confirm");
        assert!(view.message.contains("25 user(s)"));
    }
}
