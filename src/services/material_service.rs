// src/services/material_service.rs
use super::{sync_service, Outcome};
use crate::{
    error::{AppError, AppResult},
    models::{collection::Collection, material::Material},
    remote::{RemoteError, RemoteStore},
    store::{encode_rows, JsonStore},
};
use std::collections::BTreeSet;

pub fn find_all_materials(store: &JsonStore) -> AppResult<Vec<Material>> {
    store.load(Collection::Materials)
}

/// Categorias distintas, ordenadas.
pub fn categories(materials: &[Material]) -> Vec<String> {
    materials
        .iter()
        .map(|m| m.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn by_category<'a>(materials: &'a [Material], category: &str) -> Vec<&'a Material> {
    materials.iter().filter(|m| m.category == category).collect()
}

#[derive(Debug, Clone, Default)]
pub struct MaterialRowInput {
    pub category: String,
    pub subcategory: String,
    pub item: String,
}

impl MaterialRowInput {
    fn is_blank(&self) -> bool {
        self.category.trim().is_empty() && self.subcategory.trim().is_empty() && self.item.trim().is_empty()
    }
}

/// Grava o catálogo inteiro. Sem chave única, o remoto é limpo e reinserido.
pub async fn save_material_grid(
    store: &JsonStore,
    remote: Option<&dyn RemoteStore>,
    rows: Vec<MaterialRowInput>,
) -> AppResult<Outcome> {
    let existing = find_all_materials(store)?;
    let mut errors = Vec::new();
    let mut materials = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        let category = row.category.trim().to_string();
        let item = row.item.trim().to_string();
        if category.is_empty() {
            errors.push(format!("row {}: missing category", idx + 1));
        }
        if item.is_empty() {
            errors.push(format!("row {}: missing item", idx + 1));
        }
        let subcategory = row.subcategory.trim().to_string();
        let extra = existing
            .iter()
            .find(|m| m.category == category && m.subcategory == subcategory && m.item == item)
            .map(|m| m.extra.clone())
            .unwrap_or_default();
        materials.push(Material { category, subcategory, item, extra });
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    store.save(Collection::Materials, &materials)?;
    tracing::info!("📚 Catálogo gravado: {} material(is).", materials.len());

    let mut outcome = Outcome { saved: materials.len(), ..Default::default() };
    if let Some(remote) = remote {
        let encoded = encode_rows(&materials)?;
        sync_service::record_push(&mut outcome, replace_remote(remote, &encoded).await);
    }
    Ok(outcome)
}

async fn replace_remote(remote: &dyn RemoteStore, rows: &[crate::models::Row]) -> Result<usize, RemoteError> {
    let collection = Collection::Materials;
    remote.delete_all(collection.table(), collection.clear_key()).await?;
    sync_service::push_records(Some(remote), collection, rows).await
}
