// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{collection::Collection, ps_number, user::User},
    store::JsonStore,
};

/// Verifica se a senha fornecida corresponde ao hash guardado.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verificando hash bcrypt...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao verificar senha: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Gera um hash bcrypt para uma senha.
pub async fn hash_password(password: &str) -> AppResult<String> {
    hash_password_with_cost(password, bcrypt::DEFAULT_COST).await
}

pub(crate) async fn hash_password_with_cost(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Gerando hash bcrypt...");
        bcrypt::hash(&password, cost)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao gerar hash: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// `true` se o valor guardado já é um hash bcrypt ($2a$, $2b$, $2y$...).
pub fn is_bcrypt_hash(stored: &str) -> bool {
    stored.len() == 60 && stored.starts_with("$2")
}

/// Autentica por PS number + senha.
///
/// Senhas legadas em texto simples ainda são aceites uma vez; nesse caso o
/// registo é regravado com o hash bcrypt.
pub async fn authenticate(store: &JsonStore, raw_ps_number: &str, password: &str) -> AppResult<Option<User>> {
    let ps = ps_number::normalize(raw_ps_number);
    let mut users: Vec<User> = store.load(Collection::Users)?;

    let Some(idx) = users.iter().position(|u| u.ps_number.as_str() == ps) else {
        tracing::warn!("Utilizador não encontrado: {}", ps);
        return Ok(None);
    };

    let stored = users[idx].password.clone();
    if is_bcrypt_hash(&stored) {
        if verify_password(password, &stored).await? {
            return Ok(Some(users[idx].clone()));
        }
        tracing::warn!("Senha incorreta para: {}", ps);
        return Ok(None);
    }

    // Registo legado (texto simples)
    if stored.is_empty() || stored != password {
        tracing::warn!("Senha incorreta para: {}", ps);
        return Ok(None);
    }
    tracing::info!("🔐 Convertendo senha legada de {} para bcrypt.", ps);
    users[idx].password = hash_password(password).await?;
    store.save(Collection::Users, &users)?;
    Ok(Some(users[idx].clone()))
}
