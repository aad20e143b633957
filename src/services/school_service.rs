// src/services/school_service.rs
use super::{sync_service, Outcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        collection::Collection,
        ps_number,
        school::School,
        user::{CurrentUser, User},
    },
    remote::RemoteStore,
    store::{encode_rows, JsonStore},
};
use std::collections::{BTreeSet, HashMap, HashSet};

pub fn find_all_schools(store: &JsonStore) -> AppResult<Vec<School>> {
    store.load(Collection::Schools)
}

/// Admin vê todas; um coach só as escolas onde o seu PS number consta em `coaches`.
pub fn visible_schools(schools: Vec<School>, user: &CurrentUser) -> Vec<School> {
    if user.is_admin() {
        return schools;
    }
    schools
        .into_iter()
        .filter(|s| s.has_coach(user.ps_number.as_str()))
        .collect()
}

pub fn visible_school_ids(store: &JsonStore, user: &CurrentUser) -> AppResult<HashSet<String>> {
    Ok(visible_schools(find_all_schools(store)?, user)
        .into_iter()
        .map(|s| s.id)
        .collect())
}

/// id → nome, para resolver `school_id` nas listagens e no CSV.
pub fn school_names(schools: &[School]) -> HashMap<String, String> {
    schools.iter().map(|s| (s.id.clone(), s.nome.clone())).collect()
}

#[derive(Debug, Clone, Default)]
pub struct SchoolRowInput {
    pub id: String,
    pub nome: String,
    pub city: String,
    /// Lista separada por vírgulas, tal como editada na grelha.
    pub coaches: String,
}

/// Separa e normaliza a lista de coaches; devolve (válidos, inválidos).
pub fn parse_coaches(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let ps = ps_number::normalize(entry);
        if ps_number::is_valid(&ps) {
            if !valid.contains(&ps) {
                valid.push(ps);
            }
        } else {
            invalid.push(entry.to_string());
        }
    }
    (valid, invalid)
}

/// Valida e grava a grelha de escolas (substitui a coleção), depois push best-effort.
pub async fn save_school_grid(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    rows: Vec<SchoolRowInput>,
) -> AppResult<Outcome> {
    let existing = find_all_schools(store)?;
    let known_users: HashSet<String> = store
        .load::<User>(Collection::Users)?
        .into_iter()
        .map(|u| u.ps_number.to_string())
        .collect();

    let mut missing_id_rows = Vec::new();
    let mut duplicated = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();
    let mut schools = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        let id = row.id.trim().to_string();
        if id.is_empty() {
            missing_id_rows.push(idx + 1);
            continue;
        }
        if !seen.insert(id.clone()) {
            duplicated.insert(id);
            continue;
        }

        let (coaches, invalid) = parse_coaches(&row.coaches);
        if !invalid.is_empty() {
            warnings.push(format!("School {}: removed invalid PS numbers {:?}", id, invalid));
        }
        let unknown: Vec<&String> = coaches.iter().filter(|c| !known_users.contains(*c)).collect();
        if !unknown.is_empty() {
            warnings.push(format!("School {}: coaches without a user account {:?}", id, unknown));
        }

        let extra = existing
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.extra.clone())
            .unwrap_or_default();
        schools.push(School {
            id,
            nome: row.nome.trim().to_string(),
            city: row.city.trim().to_string(),
            coaches,
            extra,
        });
    }

    let mut errors = Vec::new();
    if !missing_id_rows.is_empty() {
        errors.push(format!("Cannot save: rows missing ID → {:?}", missing_id_rows));
    }
    if !duplicated.is_empty() {
        errors.push(format!("Duplicated school ID: {:?}", duplicated));
    }
    if !errors.is_empty() {
        tracing::warn!("Grelha de escolas rejeitada: {:?}", errors);
        return Err(AppError::Validation(errors));
    }

    store.save(Collection::Schools, &schools)?;
    tracing::info!("🏫 {} escola(s) gravadas.", schools.len());

    let mut outcome = Outcome { saved: schools.len(), warnings, ..Default::default() };
    let encoded = encode_rows(&schools)?;
    sync_service::record_push(
        &mut outcome,
        sync_service::push_records(remote, Collection::Schools, &encoded).await,
    );
    Ok(outcome)
}

pub async fn delete_schools(store: &JsonStore, remote: Option<&dyn RemoteStore>, ids: &[String]) -> AppResult<Outcome> {
    let targets: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
    let schools = find_all_schools(store)?;
    let before = schools.len();
    let kept: Vec<School> = schools
        .into_iter()
        .filter(|s| !targets.contains(s.id.as_str()))
        .collect();
    let deleted = before - kept.len();
    store.save(Collection::Schools, &kept)?;
    tracing::info!("🗑️ {} escola(s) removidas.", deleted);

    let mut outcome = Outcome { deleted, ..Default::default() };
    sync_service::record_remote_delete(
        &mut outcome,
        sync_service::delete_records(remote, Collection::Schools, ids).await,
    );
    Ok(outcome)
}
