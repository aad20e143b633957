// src/services/user_service.rs
use super::{auth_service, sync_service, Outcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        collection::Collection,
        ps_number::{self, PsNumber},
        user::{Credential, User},
        Row,
    },
    remote::RemoteStore,
    store::{encode_rows, JsonStore},
};
use std::collections::{BTreeSet, HashMap};

pub const BOOTSTRAP_ADMIN: &str = "PS1724";

/// Cria users.json com o administrador inicial quando não existe.
pub async fn ensure_bootstrap_admin(store: &JsonStore, password: Option<&str>) -> AppResult<()> {
    if store.exists(Collection::Users) {
        return Ok(());
    }
    let admin = User {
        ps_number: PsNumber::parse(BOOTSTRAP_ADMIN).map_err(|_| AppError::InternalServerError)?,
        password: auth_service::hash_password(password.unwrap_or(BOOTSTRAP_ADMIN)).await?,
        credential: Credential::Admin,
        name: "Administrator".to_string(),
        extra: Row::new(),
    };
    store.ensure_file(Collection::Users, &[admin])?;
    if password.is_none() {
        tracing::warn!("⚠️ Admin inicial {} criado com a senha por omissão; altere-a.", BOOTSTRAP_ADMIN);
    } else {
        tracing::info!("Admin inicial {} criado.", BOOTSTRAP_ADMIN);
    }
    Ok(())
}

pub fn find_all_users(store: &JsonStore) -> AppResult<Vec<User>> {
    let users: Vec<User> = store.load(Collection::Users)?;
    tracing::debug!("Encontrados {} utilizadores.", users.len());
    Ok(users)
}

/// Busca um utilizador pelo PS number (normalizado).
pub fn find_user(store: &JsonStore, raw_ps_number: &str) -> AppResult<Option<User>> {
    let ps = ps_number::normalize(raw_ps_number);
    Ok(find_all_users(store)?
        .into_iter()
        .find(|u| u.ps_number.as_str() == ps))
}

/// PS number → nome a mostrar.
pub fn requester_lookup(users: &[User]) -> HashMap<String, String> {
    users
        .iter()
        .map(|u| (u.ps_number.to_string(), u.display_name().to_string()))
        .collect()
}

/// Uma linha da grelha de utilizadores, tal como veio do formulário.
#[derive(Debug, Clone, Default)]
pub struct UserRowInput {
    pub ps_number: String,
    /// Em branco = manter a senha atual.
    pub new_password: String,
    pub credential: String,
    pub name: String,
}

/// Valida e grava a grelha inteira de utilizadores; depois faz push best-effort.
pub async fn save_user_grid(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    rows: Vec<UserRowInput>,
) -> AppResult<Outcome> {
    let existing = find_all_users(store)?;
    let by_ps: HashMap<&str, &User> = existing.iter().map(|u| (u.ps_number.as_str(), u)).collect();

    let mut invalid = BTreeSet::new();
    let mut duplicated = BTreeSet::new();
    let mut missing_password = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut accepted = Vec::new();

    for row in rows {
        let raw_ps = ps_number::normalize(&row.ps_number);
        if raw_ps.is_empty() {
            continue;
        }
        let Ok(ps) = PsNumber::parse(&raw_ps) else {
            invalid.insert(raw_ps);
            continue;
        };
        if !seen.insert(ps.clone()) {
            duplicated.insert(ps.to_string());
            continue;
        }
        let current = by_ps.get(ps.as_str()).copied();
        if current.is_none() && row.new_password.trim().is_empty() {
            missing_password.insert(ps.to_string());
            continue;
        }
        accepted.push((ps, row, current));
    }

    let mut errors = Vec::new();
    if !invalid.is_empty() {
        errors.push(format!("Invalid PS Number format: {:?}", invalid));
    }
    if !duplicated.is_empty() {
        errors.push(format!("Duplicated PS Number: {:?}", duplicated));
    }
    if !missing_password.is_empty() {
        errors.push(format!(
            "Password required for new user(s): {:?}. A changed PS Number counts as a new user.",
            missing_password
        ));
    }
    if errors.is_empty() && !accepted.iter().any(|(_, row, _)| Credential::from(row.credential.as_str()).is_admin()) {
        errors.push("At least one Admin user is required.".to_string());
    }
    if !errors.is_empty() {
        tracing::warn!("Grelha de utilizadores rejeitada: {:?}", errors);
        return Err(AppError::Validation(errors));
    }

    let mut users = Vec::with_capacity(accepted.len());
    for (ps, row, current) in accepted {
        let password = if row.new_password.trim().is_empty() {
            current.map(|u| u.password.clone()).unwrap_or_default()
        } else {
            auth_service::hash_password(row.new_password.trim()).await?
        };
        users.push(User {
            ps_number: ps,
            password,
            credential: Credential::from(row.credential.as_str()),
            name: row.name.trim().to_string(),
            extra: current.map(|u| u.extra.clone()).unwrap_or_default(),
        });
    }

    store.save(Collection::Users, &users)?;
    tracing::info!("✅ {} utilizador(es) gravados.", users.len());

    let mut outcome = Outcome { saved: users.len(), ..Default::default() };
    let encoded = encode_rows(&users)?;
    sync_service::record_push(&mut outcome, sync_service::push_records(remote, Collection::Users, &encoded).await);
    if let (Some(remote), true) = (remote, outcome.warnings.is_empty()) {
        let shaped: Vec<Row> = encoded.iter().map(|r| Collection::Users.project(r)).collect();
        match sync_service::mirror_coaches(remote, &shaped).await {
            Ok(n) => outcome.mirrored = n,
            Err(e) => outcome.warn(format!("Mirror to 'coaches' skipped: {}", e)),
        }
    }
    Ok(outcome)
}

/// Remove utilizadores (local + remoto best-effort). Não permite remover a própria conta.
pub async fn delete_users(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    acting: &PsNumber,
    ps_numbers: &[String],
) -> AppResult<Outcome> {
    let targets: BTreeSet<String> = ps_numbers.iter().map(|p| ps_number::normalize(p)).collect();
    if targets.contains(acting.as_str()) {
        return Err(AppError::validation("You cannot delete your own account."));
    }

    let users = find_all_users(store)?;
    let before = users.len();
    let kept: Vec<User> = users
        .into_iter()
        .filter(|u| !targets.contains(u.ps_number.as_str()))
        .collect();
    let deleted = before - kept.len();
    store.save(Collection::Users, &kept)?;
    tracing::info!("🗑️ {} utilizador(es) removidos.", deleted);

    let mut outcome = Outcome { deleted, ..Default::default() };
    let keys: Vec<String> = targets.into_iter().collect();
    sync_service::record_remote_delete(
        &mut outcome,
        sync_service::delete_records(remote, Collection::Users, &keys).await,
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;

    fn input(ps: &str, password: &str, credential: &str, name: &str) -> UserRowInput {
        UserRowInput {
            ps_number: ps.to_string(),
            new_password: password.to_string(),
            credential: credential.to_string(),
            name: name.to_string(),
        }
    }

    async fn store_with_admin() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        let admin = User {
            ps_number: PsNumber::parse("PS1724").unwrap(),
            password: auth_service::hash_password_with_cost("PS1724", 4).await.unwrap(),
            credential: Credential::Admin,
            name: "Administrator".into(),
            extra: Row::new(),
        };
        store.save(Collection::Users, &[admin]).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn bootstrap_admin_is_only_created_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        ensure_bootstrap_admin(&store, Some("s3cret")).await.unwrap();
        let users = find_all_users(&store).unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin());
        assert!(auth_service::is_bcrypt_hash(&users[0].password));
        assert!(auth_service::verify_password("s3cret", &users[0].password).await.unwrap());

        store.save::<User>(Collection::Users, &[]).unwrap();
        ensure_bootstrap_admin(&store, None).await.unwrap();
        assert!(find_all_users(&store).unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_and_duplicated_ps_numbers_block_the_whole_save() {
        let (_dir, store) = store_with_admin().await;
        let rows = vec![
            input("PS1724", "", "Admin", "Administrator"),
            input("ps20", "pw", "Coach", "Ana"),
            input("PS20", "pw", "Coach", "Ana again"),
            input("X99", "pw", "Coach", "Bad"),
        ];
        let err = save_user_grid(&store, None, rows).await.unwrap_err();
        let AppError::Validation(errors) = err else { panic!("expected validation error") };
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("X99"));
        assert!(errors[1].contains("PS20"));
        // nada foi gravado
        assert_eq!(find_all_users(&store).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_password_keeps_existing_hash_and_new_users_need_one() {
        let (_dir, store) = store_with_admin().await;
        let original_hash = find_all_users(&store).unwrap()[0].password.clone();

        let err = save_user_grid(
            &store,
            None,
            vec![input("PS1724", "", "Admin", "Root"), input("PS30", "", "Coach", "No pw")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let remote = MemoryRemote::new();
        let outcome = save_user_grid(
            &store,
            Some(&remote),
            vec![input("PS1724", "", "Admin", "Root"), input("ps30", "pw30", "weird", ""), input("", "", "", "")],
        )
        .await
        .unwrap();
        assert_eq!(outcome.saved, 2);
        assert_eq!(outcome.synced, 2);
        assert_eq!(outcome.mirrored, 2);

        let users = find_all_users(&store).unwrap();
        assert_eq!(users[0].password, original_hash);
        assert_eq!(users[0].name, "Root");
        assert_eq!(users[1].ps_number.as_str(), "PS30");
        assert_eq!(users[1].credential, Credential::Coach);
        assert!(auth_service::is_bcrypt_hash(&users[1].password));
    }

    #[tokio::test]
    async fn renaming_a_ps_number_needs_a_password() {
        let (_dir, store) = store_with_admin().await;
        save_user_grid(&store, None, vec![input("PS1724", "", "Admin", "A"), input("PS2", "pw", "Coach", "B")])
            .await
            .unwrap();

        let err = save_user_grid(&store, None, vec![input("PS1724", "", "Admin", "A"), input("PS3", "", "Coach", "B")])
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else { panic!("expected validation error") };
        assert!(errors[0].contains("PS3"));
        assert!(errors[0].contains("changed PS Number"));

        save_user_grid(&store, None, vec![input("PS1724", "", "Admin", "A"), input("PS3", "pw3", "Coach", "B")])
            .await
            .unwrap();
        let users = find_all_users(&store).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].ps_number.as_str(), "PS3");
    }

    #[tokio::test]
    async fn the_last_admin_cannot_be_demoted() {
        let (_dir, store) = store_with_admin().await;
        let err = save_user_grid(&store, None, vec![input("PS1724", "", "Coach", "x")]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn remote_failure_is_a_warning_not_an_error() {
        let (_dir, store) = store_with_admin().await;
        let remote = MemoryRemote::new();
        remote.fail_table("users");
        let outcome = save_user_grid(&store, Some(&remote), vec![input("PS1724", "", "Admin", "A")])
            .await
            .unwrap();
        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.synced, 0);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn deleting_yourself_is_refused() {
        let (_dir, store) = store_with_admin().await;
        let me = PsNumber::parse("PS1724").unwrap();
        assert!(delete_users(&store, None, &me, &["ps1724".to_string()]).await.is_err());

        save_user_grid(&store, None, vec![input("PS1724", "", "Admin", "A"), input("PS2", "pw", "Coach", "B")])
            .await
            .unwrap();
        let outcome = delete_users(&store, None, &me, &["PS2".to_string()]).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(find_all_users(&store).unwrap().len(), 1);
    }
}
