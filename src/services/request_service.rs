// src/services/request_service.rs
use super::{school_service, sync_service, user_service, Outcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        collection::Collection,
        ps_number,
        request::{MaterialRequest, RequestStatus},
        school::School,
        ensure_uuid_id,
        user::CurrentUser,
        Row,
    },
    remote::RemoteStore,
    services::csv_export,
    store::{decode_rows, encode_rows, JsonStore},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const UNKNOWN_REQUESTER: &str = "unknown";

/// Completa linhas legadas (sem id / status / ps_number) e regrava se algo mudou,
/// para que os ids passem a ser estáveis.
pub fn load_requests(store: &JsonStore) -> AppResult<Vec<MaterialRequest>> {
    let mut rows = store.load_rows(Collection::Requests)?;
    let repaired = repair_rows(&mut rows);
    if repaired > 0 {
        tracing::info!("🔧 {} pedido(s) legados completados com id/status/ps_number.", repaired);
        store.save(Collection::Requests, &rows)?;
    }
    decode_rows(Collection::Requests, rows)
}

fn repair_rows(rows: &mut [Row]) -> usize {
    let mut repaired = 0;
    for row in rows.iter_mut() {
        let mut changed = ensure_uuid_id(row);
        if !has_text(row, "status") {
            row.insert("status".into(), RequestStatus::Pending.as_str().into());
            changed = true;
        }
        if !has_text(row, "ps_number") {
            row.insert("ps_number".into(), UNKNOWN_REQUESTER.into());
            changed = true;
        }
        if changed {
            repaired += 1;
        }
    }
    repaired
}

// null, número ou texto em branco contam como campo em falta
fn has_text(row: &Row, key: &str) -> bool {
    row.get(key)
        .and_then(serde_json::Value::as_str)
        .is_some_and(|v| !v.trim().is_empty())
}

/// Admin vê tudo; um coach vê os pedidos das suas escolas, seja quem for o autor.
pub fn visible_requests(
    requests: Vec<MaterialRequest>,
    user: &CurrentUser,
    visible_school_ids: &HashSet<String>,
) -> Vec<MaterialRequest> {
    if user.is_admin() {
        return requests;
    }
    requests
        .into_iter()
        .filter(|r| visible_school_ids.contains(r.school_id.trim()))
        .collect()
}

/// Item do "Current Batch", guardado na sessão até ao envio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequestItem {
    pub school_id: String,
    pub category: String,
    pub material: String,
    pub quantity: i64,
}

/// Valida o lote inteiro; qualquer erro bloqueia o envio.
pub fn validate_batch(items: &[NewRequestItem], schools: &[School]) -> Vec<String> {
    let valid_ids: HashSet<&str> = schools.iter().map(|s| s.id.as_str()).collect();
    let mut errors = Vec::new();
    for item in items {
        let sid = item.school_id.trim();
        if sid.is_empty() || !valid_ids.contains(sid) {
            errors.push(format!("Invalid school_id: {}", sid));
        }
        if item.quantity <= 0 {
            errors.push(format!("Invalid quantity for school {}: {}", sid, item.quantity));
        }
        if item.category.trim().is_empty() || item.material.trim().is_empty() {
            errors.push(format!("Missing category or material for school {}", sid));
        }
    }
    errors
}

#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub outcome: Outcome,
    pub ids: Vec<Uuid>,
}

impl Submission {
    /// Ids que ficaram só no JSON local.
    pub fn unsynced_ids(&self) -> Vec<Uuid> {
        if self.outcome.warnings.is_empty() {
            Vec::new()
        } else {
            self.ids.clone()
        }
    }
}

/// Converte o lote em pedidos (`Pending`, id novo, data atual) e grava/sincroniza.
pub async fn submit_batch(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    requester: &str,
    items: &[NewRequestItem],
) -> AppResult<Submission> {
    if items.is_empty() {
        return Err(AppError::validation("The current batch is empty."));
    }
    let schools = school_service::find_all_schools(store)?;
    let errors = validate_batch(items, &schools);
    if !errors.is_empty() {
        tracing::warn!("Lote de pedidos rejeitado: {:?}", errors);
        return Err(AppError::Validation(errors));
    }

    let ps = ps_number::normalize(requester);
    let date = chrono::Local::now().format(DATE_FORMAT).to_string();
    let records: Vec<MaterialRequest> = items
        .iter()
        .map(|item| MaterialRequest {
            id: Uuid::new_v4(),
            school_id: item.school_id.trim().to_string(),
            category: item.category.trim().to_string(),
            material: item.material.trim().to_string(),
            quantity: item.quantity,
            date: date.clone(),
            ps_number: ps.clone(),
            status: RequestStatus::Pending,
            extra: Row::new(),
        })
        .collect();
    let ids = records.iter().map(|r| r.id).collect();

    let outcome = persist_requests(store, remote, records).await?;
    tracing::info!("📝 {} pedido(s) submetidos por {}.", outcome.saved, ps);
    Ok(Submission { outcome, ids })
}

/// Junta os registos à coleção pelo id (substitui ou acrescenta), grava e faz push só deles.
pub async fn persist_requests(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    records: Vec<MaterialRequest>,
) -> AppResult<Outcome> {
    if records.is_empty() {
        return Ok(Outcome::default());
    }
    let mut all = load_requests(store)?;
    for record in &records {
        match all.iter().position(|r| r.id == record.id) {
            Some(idx) => all[idx] = record.clone(),
            None => all.push(record.clone()),
        }
    }
    store.save(Collection::Requests, &all)?;

    let mut outcome = Outcome { saved: records.len(), ..Default::default() };
    let encoded = encode_rows(&records)?;
    sync_service::record_push(
        &mut outcome,
        sync_service::push_records(remote, Collection::Requests, &encoded).await,
    );
    Ok(outcome)
}

/// Volta a enviar pedidos que ficaram só no JSON local.
pub async fn resync(store: &JsonStore, remote: Option<&dyn RemoteStore>, ids: &[String]) -> AppResult<Outcome> {
    if remote.is_none() {
        return Err(AppError::validation("The remote store is not configured."));
    }
    let wanted: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
    let records: Vec<MaterialRequest> = load_requests(store)?
        .into_iter()
        .filter(|r| wanted.contains(r.id.to_string().as_str()))
        .collect();

    let mut outcome = Outcome::default();
    let encoded = encode_rows(&records)?;
    sync_service::record_push(
        &mut outcome,
        sync_service::push_records(remote, Collection::Requests, &encoded).await,
    );
    Ok(outcome)
}

/// Linha editada da grelha de pedidos pendentes.
#[derive(Debug, Clone, Default)]
pub struct RequestEditInput {
    pub id: String,
    pub category: String,
    pub material: String,
    pub quantity: String,
    /// Ignorado quando quem edita não é Admin.
    pub status: Option<String>,
}

/// Aplica as edições da grelha. Só pedidos pendentes e visíveis ao utilizador;
/// escola e data nunca mudam aqui.
pub async fn save_pending_edits(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    user: &CurrentUser,
    edits: Vec<RequestEditInput>,
) -> AppResult<Outcome> {
    let visible_ids = school_service::visible_school_ids(store, user)?;
    let mut all = load_requests(store)?;
    let mut errors = Vec::new();
    let mut changed = Vec::new();

    for (idx, edit) in edits.into_iter().enumerate() {
        let row = idx + 1;
        let Some(pos) = Uuid::parse_str(edit.id.trim())
            .ok()
            .and_then(|id| all.iter().position(|r| r.id == id))
        else {
            errors.push(format!("row {}: unknown request", row));
            continue;
        };
        let current = &all[pos];
        if !current.status.is_pending() || !(user.is_admin() || visible_ids.contains(current.school_id.trim())) {
            errors.push(format!("row {}: request can no longer be edited", row));
            continue;
        }
        let quantity = match edit.quantity.trim().parse::<i64>() {
            Ok(q) if q > 0 => q,
            _ => {
                errors.push(format!("row {}: quantity must be a positive integer", row));
                continue;
            }
        };
        if edit.category.trim().is_empty() || edit.material.trim().is_empty() {
            errors.push(format!("row {}: category and material are required", row));
            continue;
        }

        let mut updated = current.clone();
        updated.category = edit.category.trim().to_string();
        updated.material = edit.material.trim().to_string();
        updated.quantity = quantity;
        if let (true, Some(status)) = (user.is_admin(), edit.status.as_deref()) {
            updated.status = RequestStatus::from(status);
        }
        if updated != *current {
            all[pos] = updated.clone();
            changed.push(updated);
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    finish_update(store, remote, all, changed).await
}

/// Altera o estado de vários pedidos pendentes de uma vez (Admin).
pub async fn update_status(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    ids: &[String],
    status: RequestStatus,
) -> AppResult<Outcome> {
    let wanted: HashSet<Uuid> = ids.iter().filter_map(|id| Uuid::parse_str(id.trim()).ok()).collect();
    if wanted.is_empty() {
        return Err(AppError::validation("Select at least one request to update."));
    }
    let mut all = load_requests(store)?;
    let mut changed = Vec::new();
    for record in all.iter_mut() {
        if wanted.contains(&record.id) && record.status.is_pending() {
            record.status = status.clone();
            changed.push(record.clone());
        }
    }
    if changed.is_empty() {
        return Err(AppError::validation("No valid requests selected for batch update."));
    }
    tracing::info!("🔁 Estado '{}' aplicado a {} pedido(s).", status, changed.len());
    finish_update(store, remote, all, changed).await
}

async fn finish_update(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    all: Vec<MaterialRequest>,
    changed: Vec<MaterialRequest>,
) -> AppResult<Outcome> {
    let mut outcome = Outcome { updated: changed.len(), ..Default::default() };
    if changed.is_empty() {
        return Ok(outcome);
    }
    store.save(Collection::Requests, &all)?;
    let encoded = encode_rows(&changed)?;
    sync_service::record_push(
        &mut outcome,
        sync_service::push_records(remote, Collection::Requests, &encoded).await,
    );
    Ok(outcome)
}

/// Filtra os ids que o utilizador pode apagar: pedidos pendentes e visíveis.
pub fn deletable_ids(store: &JsonStore, user: &CurrentUser, ids: &[String]) -> AppResult<Vec<String>> {
    let visible_ids = school_service::visible_school_ids(store, user)?;
    let wanted: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
    Ok(load_requests(store)?
        .into_iter()
        .filter(|r| wanted.contains(r.id.to_string().as_str()))
        .filter(|r| r.status.is_pending())
        .filter(|r| user.is_admin() || visible_ids.contains(r.school_id.trim()))
        .map(|r| r.id.to_string())
        .collect())
}

pub async fn delete_requests(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    user: &CurrentUser,
    ids: &[String],
) -> AppResult<Outcome> {
    let allowed = deletable_ids(store, user, ids)?;
    let targets: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let all = load_requests(store)?;
    let before = all.len();
    let kept: Vec<MaterialRequest> = all
        .into_iter()
        .filter(|r| !targets.contains(r.id.to_string().as_str()))
        .collect();
    let deleted = before - kept.len();
    store.save(Collection::Requests, &kept)?;
    tracing::info!("🗑️ {} pedido(s) removidos.", deleted);

    let mut outcome = Outcome { deleted, ..Default::default() };
    sync_service::record_remote_delete(
        &mut outcome,
        sync_service::delete_records(remote, Collection::Requests, &allowed).await,
    );
    Ok(outcome)
}

/// CSV de todos os pedidos, com nomes de escola e requerente.
pub fn export_requests_csv(store: &JsonStore) -> AppResult<String> {
    let requests = load_requests(store)?;
    let schools = school_service::find_all_schools(store)?;
    let users = user_service::find_all_users(store)?;
    Ok(csv_export::requests_csv(
        &requests,
        &school_service::school_names(&schools),
        &user_service::requester_lookup(&users),
    ))
}

/// Nome do requerente por PS number; cai para o próprio PS number.
pub fn requester_name(lookup: &HashMap<String, String>, ps_number: &str) -> String {
    let ps = ps_number.trim();
    lookup
        .get(ps)
        .filter(|name| !name.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| ps.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ps_number::PsNumber, user::Credential};
    use crate::remote::MemoryRemote;
    use serde_json::json;

    fn user(ps: &str, credential: Credential) -> CurrentUser {
        CurrentUser { ps_number: PsNumber::parse(ps).unwrap(), name: ps.into(), credential }
    }

    fn store_with_schools() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        let schools: Vec<School> = serde_json::from_value(json!([
            {"id": "1565", "nome": "Escola", "coaches": ["PS1724"]},
            {"id": "20", "nome": "Other", "coaches": ["PS2"]}
        ]))
        .unwrap();
        store.save(Collection::Schools, &schools).unwrap();
        (dir, store)
    }

    fn item(school_id: &str, quantity: i64) -> NewRequestItem {
        NewRequestItem {
            school_id: school_id.into(),
            category: "Books".into(),
            material: "Notebook".into(),
            quantity,
        }
    }

    #[tokio::test]
    async fn submitted_request_is_normalized_and_pending() {
        let (_dir, store) = store_with_schools();
        let remote = MemoryRemote::new();

        let first = submit_batch(&store, Some(&remote), "ps1724", &[item("1565", 3)]).await.unwrap();
        let second = submit_batch(&store, Some(&remote), "ps1724", &[item("1565", 3)]).await.unwrap();

        let stored = load_requests(&store).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].ps_number, "PS1724");
        assert_eq!(stored[0].status, RequestStatus::Pending);
        assert_eq!(stored[0].quantity, 3);
        assert_eq!(stored[0].id, first.ids[0]);
        assert_ne!(first.ids[0], second.ids[0]);
        assert!(chrono::NaiveDateTime::parse_from_str(&stored[0].date, DATE_FORMAT).is_ok());
        assert_eq!(first.outcome.synced, 1);
        assert!(first.unsynced_ids().is_empty());
    }

    #[tokio::test]
    async fn bad_quantity_or_school_blocks_before_persistence() {
        let (_dir, store) = store_with_schools();
        for bad in [item("1565", 0), item("1565", -2), item("", 1), item("404", 1)] {
            let err = submit_batch(&store, None, "PS1724", &[item("1565", 1), bad]).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(!store.exists(Collection::Requests));
    }

    #[tokio::test]
    async fn failed_push_marks_the_batch_unsynced() {
        let (_dir, store) = store_with_schools();
        let remote = MemoryRemote::new();
        remote.fail_table("requests");
        let submission = submit_batch(&store, Some(&remote), "PS1724", &[item("1565", 1), item("20", 2)])
            .await
            .unwrap();
        assert_eq!(submission.outcome.saved, 2);
        assert_eq!(submission.unsynced_ids(), submission.ids);
        assert_eq!(load_requests(&store).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resync_pushes_the_remembered_ids() {
        let (_dir, store) = store_with_schools();
        let remote = MemoryRemote::new();
        remote.fail_table("requests");
        let submission = submit_batch(&store, Some(&remote), "PS1724", &[item("1565", 1)]).await.unwrap();
        let unsynced: Vec<String> = submission.unsynced_ids().iter().map(Uuid::to_string).collect();

        let healthy = MemoryRemote::new();
        let outcome = resync(&store, Some(&healthy), &unsynced).await.unwrap();
        assert_eq!(outcome.synced, 1);
        assert!(outcome.warnings.is_empty());
        assert_eq!(healthy.rows("requests").len(), 1);
        assert!(resync(&store, None, &unsynced).await.is_err());
    }

    #[test]
    fn legacy_rows_are_repaired_once_and_ids_stay_stable() {
        let (_dir, store) = store_with_schools();
        store
            .save(Collection::Requests, &[json!({"school_id": "1565", "quantity": 2})])
            .unwrap();
        let first = load_requests(&store).unwrap();
        let second = load_requests(&store).unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].ps_number, UNKNOWN_REQUESTER);
        assert!(first[0].status.is_pending());
    }

    #[test]
    fn blank_or_null_legacy_fields_are_repaired_too() {
        let (_dir, store) = store_with_schools();
        let valid = Uuid::new_v4();
        store
            .save(
                Collection::Requests,
                &[
                    json!({"id": valid.to_string(), "school_id": "1565", "status": "Approved", "ps_number": "PS2"}),
                    json!({"id": "", "school_id": "1565", "status": null, "ps_number": null}),
                    json!({"id": "not-a-uuid", "school_id": "20", "status": " ", "ps_number": ""}),
                ],
            )
            .unwrap();

        let requests = load_requests(&store).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].id, valid);
        assert_eq!(requests[0].status, RequestStatus::Approved);
        assert_ne!(requests[1].id, requests[2].id);
        assert!(requests[1..].iter().all(|r| r.status.is_pending() && r.ps_number == UNKNOWN_REQUESTER));
        assert_eq!(load_requests(&store).unwrap(), requests);
    }

    #[tokio::test]
    async fn coaches_see_and_edit_only_their_schools_but_not_status() {
        let (_dir, store) = store_with_schools();
        let mine = submit_batch(&store, None, "PS1724", &[item("1565", 1)]).await.unwrap().ids[0];
        let theirs = submit_batch(&store, None, "PS2", &[item("20", 1)]).await.unwrap().ids[0];

        let coach = user("PS1724", Credential::Coach);
        let ids = school_service::visible_school_ids(&store, &coach).unwrap();
        let visible = visible_requests(load_requests(&store).unwrap(), &coach, &ids);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, mine);

        let edit = |id: Uuid| RequestEditInput {
            id: id.to_string(),
            category: "Books".into(),
            material: "Pen".into(),
            quantity: "5".into(),
            status: Some("Approved".into()),
        };
        let outcome = save_pending_edits(&store, None, &coach, vec![edit(mine)]).await.unwrap();
        assert_eq!(outcome.updated, 1);
        let stored = load_requests(&store).unwrap();
        assert_eq!(stored[0].quantity, 5);
        assert!(stored[0].status.is_pending());

        assert!(save_pending_edits(&store, None, &coach, vec![edit(theirs)]).await.is_err());
    }

    #[tokio::test]
    async fn batch_status_only_touches_pending_requests() {
        let (_dir, store) = store_with_schools();
        let ids = submit_batch(&store, None, "PS1724", &[item("1565", 1), item("1565", 2)]).await.unwrap().ids;
        let remote = MemoryRemote::new();

        let outcome = update_status(&store, Some(&remote), &[ids[0].to_string()], RequestStatus::Approved)
            .await
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.synced, 1);
        // já não está pendente
        assert!(update_status(&store, None, &[ids[0].to_string()], RequestStatus::Rejected).await.is_err());
        // e deixou de poder ser apagado
        let admin = user("PS1724", Credential::Admin);
        let outcome = delete_requests(&store, None, &admin, &[ids[0].to_string(), ids[1].to_string()])
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(load_requests(&store).unwrap()[0].id, ids[0]);
    }

    #[test]
    fn requester_name_falls_back_to_ps_number() {
        let lookup = HashMap::from([("PS1".to_string(), "Ana".to_string()), ("PS2".to_string(), " ".to_string())]);
        assert_eq!(requester_name(&lookup, "PS1"), "Ana");
        assert_eq!(requester_name(&lookup, "PS2"), "PS2");
        assert_eq!(requester_name(&lookup, "PS3"), "PS3");
    }
}
