// src/services/stock_service.rs
use super::{school_service, sync_service, Outcome};
use crate::{
    error::{AppError, AppResult},
    models::{collection::Collection, ensure_uuid_id, stock::StockItem, user::CurrentUser, Row},
    remote::RemoteStore,
    store::{decode_rows, encode_rows, JsonStore},
};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

const UNKNOWN: &str = "UNKNOWN";

/// project → type → size → quantidade total.
pub type StockSummary = BTreeMap<String, BTreeMap<String, BTreeMap<String, i64>>>;

/// Lê o stock garantindo id, quantity inteira e project em maiúsculas.
pub fn load_stock(store: &JsonStore) -> AppResult<Vec<StockItem>> {
    let mut rows = store.load_rows(Collection::StockKimonos)?;
    if repair_rows(&mut rows) {
        tracing::info!("🔧 stock_kimonos.json completado (ids/quantidades).");
        store.save(Collection::StockKimonos, &rows)?;
    }
    decode_rows(Collection::StockKimonos, rows)
}

fn repair_rows(rows: &mut [Row]) -> bool {
    let mut changed = false;
    for row in rows.iter_mut() {
        changed |= ensure_uuid_id(row);
        let quantity = row.get("quantity").map(integer_quantity);
        match quantity {
            Some(Some(q)) => {
                if row.get("quantity") != Some(&Value::from(q)) {
                    row.insert("quantity".into(), q.into());
                    changed = true;
                }
            }
            _ => {
                row.insert("quantity".into(), 0.into());
                changed = true;
            }
        }
        let project = row.get("project").and_then(Value::as_str).map(|p| p.trim().to_uppercase());
        if let Some(project) = project {
            row.insert("project".into(), project.into());
        }
    }
    changed
}

fn integer_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Stock visível (escolas do utilizador) com filtro opcional por escola.
pub fn visible_stock(
    stock: Vec<StockItem>,
    user: &CurrentUser,
    visible_school_ids: &HashSet<String>,
    school_filter: Option<&str>,
) -> Vec<StockItem> {
    stock
        .into_iter()
        .filter(|s| user.is_admin() || visible_school_ids.contains(&s.school_id))
        .filter(|s| school_filter.is_none_or(|id| s.school_id == id))
        .collect()
}

pub fn summarize(stock: &[StockItem]) -> StockSummary {
    let mut summary = StockSummary::new();
    for row in stock {
        let label = |v: &str| {
            let v = v.trim();
            if v.is_empty() { UNKNOWN.to_string() } else { v.to_string() }
        };
        *summary
            .entry(label(&row.project.to_uppercase()))
            .or_default()
            .entry(label(&row.kind))
            .or_default()
            .entry(label(&row.size))
            .or_default() += row.quantity;
    }
    summary
}

#[derive(Debug, Clone, Default)]
pub struct StockRowInput {
    /// Vazio para linhas novas.
    pub id: String,
    pub school_id: String,
    pub project: String,
    pub kind: String,
    pub size: String,
    pub quantity: String,
}

impl StockRowInput {
    fn is_blank(&self) -> bool {
        [&self.school_id, &self.project, &self.kind, &self.size, &self.quantity]
            .iter()
            .all(|v| v.trim().is_empty())
    }
}

/// Junta as linhas editadas ao stock completo pelo id; linhas novas recebem um UUID.
/// Um coach só grava linhas das suas escolas.
pub async fn save_stock_grid(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    user: &CurrentUser,
    rows: Vec<StockRowInput>,
) -> AppResult<Outcome> {
    let visible_ids = school_service::visible_school_ids(store, user)?;
    let mut all = load_stock(store)?;
    let mut errors = Vec::new();
    let mut changed = Vec::new();

    for (idx, input) in rows.into_iter().enumerate() {
        if input.is_blank() {
            continue;
        }
        let row = idx + 1;
        let school_id = input.school_id.trim().to_string();
        if school_id.is_empty() {
            errors.push(format!("row {}: missing school_id", row));
            continue;
        }
        if !user.is_admin() && !visible_ids.contains(&school_id) {
            errors.push(format!("row {}: school {} is not assigned to you", row, school_id));
            continue;
        }
        let quantity = match input.quantity.trim() {
            "" => 0,
            raw => match raw.parse::<i64>() {
                Ok(q) if q >= 0 => q,
                _ => {
                    errors.push(format!("row {}: invalid quantity", row));
                    continue;
                }
            },
        };

        let existing = Uuid::parse_str(input.id.trim())
            .ok()
            .and_then(|id| all.iter().position(|s| s.id == id));
        if let Some(pos) = existing {
            if !user.is_admin() && !visible_ids.contains(&all[pos].school_id) {
                errors.push(format!("row {}: school {} is not assigned to you", row, all[pos].school_id));
                continue;
            }
        }
        let mut item = match existing {
            Some(pos) => all[pos].clone(),
            None => StockItem {
                id: Uuid::new_v4(),
                school_id: String::new(),
                project: String::new(),
                kind: String::new(),
                size: String::new(),
                quantity: 0,
                extra: Row::new(),
            },
        };
        item.school_id = school_id;
        item.project = input.project.trim().to_uppercase();
        item.kind = input.kind.trim().to_string();
        item.size = input.size.trim().to_string();
        item.quantity = quantity;

        match existing {
            Some(pos) => all[pos] = item.clone(),
            None => all.push(item.clone()),
        }
        changed.push(item);
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    store.save(Collection::StockKimonos, &all)?;
    tracing::info!("👘 {} linha(s) de stock gravadas.", changed.len());

    let mut outcome = Outcome { saved: changed.len(), ..Default::default() };
    let encoded = encode_rows(&changed)?;
    sync_service::record_push(
        &mut outcome,
        sync_service::push_records(remote, Collection::StockKimonos, &encoded).await,
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ps_number::PsNumber, school::School, user::Credential};
    use serde_json::json;

    fn coach() -> CurrentUser {
        CurrentUser { ps_number: PsNumber::parse("PS1").unwrap(), name: "Ana".into(), credential: Credential::Coach }
    }

    fn seeded() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        let schools: Vec<School> = serde_json::from_value(json!([
            {"id": "1", "nome": "Mine", "coaches": ["PS1"]},
            {"id": "2", "nome": "Not mine", "coaches": []}
        ]))
        .unwrap();
        store.save(Collection::Schools, &schools).unwrap();
        store
            .save(
                Collection::StockKimonos,
                &[
                    json!({"school_id": "1", "project": " moe", "type": "A1", "size": "C1", "quantity": "4"}),
                    json!({"school_id": "1", "project": "MOE", "type": "A1", "size": "C1", "quantity": 2}),
                    json!({"id": "", "school_id": "2", "project": "ese", "type": "A2", "size": "C0", "quantity": "lots"}),
                ],
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn legacy_rows_get_ids_integer_quantities_and_upper_projects() {
        let (_dir, store) = seeded();
        let stock = load_stock(&store).unwrap();
        assert_eq!(stock[0].project, "MOE");
        assert_eq!(stock[0].quantity, 4);
        assert_eq!(stock[2].quantity, 0);
        let again = load_stock(&store).unwrap();
        assert_eq!(again[0].id, stock[0].id);
        assert_eq!(again[2].id, stock[2].id);
    }

    #[test]
    fn summary_sums_by_project_type_and_size() {
        let (_dir, store) = seeded();
        let user = coach();
        let ids = school_service::visible_school_ids(&store, &user).unwrap();
        let visible = visible_stock(load_stock(&store).unwrap(), &user, &ids, None);
        assert_eq!(visible.len(), 2);

        let summary = summarize(&visible);
        assert_eq!(summary["MOE"]["A1"]["C1"], 6);
        assert!(!summary.contains_key("ESE"));
    }

    #[tokio::test]
    async fn coach_cannot_write_other_schools_stock() {
        let (_dir, store) = seeded();
        let user = coach();
        let row = |school: &str, qty: &str| StockRowInput {
            school_id: school.into(),
            project: "ese".into(),
            kind: "A3".into(),
            size: "C2".into(),
            quantity: qty.into(),
            ..Default::default()
        };

        assert!(save_stock_grid(&store, None, &user, vec![row("2", "1")]).await.is_err());
        assert!(save_stock_grid(&store, None, &user, vec![row("1", "-1")]).await.is_err());

        let outcome = save_stock_grid(&store, None, &user, vec![row("1", "7"), StockRowInput::default()])
            .await
            .unwrap();
        assert_eq!(outcome.saved, 1);
        let stock = load_stock(&store).unwrap();
        assert_eq!(stock.len(), 4);
        assert_eq!(stock[3].project, "ESE");
        assert_eq!(stock[3].quantity, 7);
    }

    #[tokio::test]
    async fn edits_merge_by_id() {
        let (_dir, store) = seeded();
        let admin = CurrentUser { credential: Credential::Admin, ..coach() };
        let first = load_stock(&store).unwrap()[0].clone();
        let edit = StockRowInput {
            id: first.id.to_string(),
            school_id: "1".into(),
            project: "moe".into(),
            kind: "A1".into(),
            size: "C1".into(),
            quantity: "10".into(),
        };
        save_stock_grid(&store, None, &admin, vec![edit]).await.unwrap();
        let stock = load_stock(&store).unwrap();
        assert_eq!(stock.len(), 3);
        assert_eq!(stock[0].id, first.id);
        assert_eq!(stock[0].quantity, 10);
    }
}
