// src/models/collection.rs
use super::Row;
use serde_json::Value;
use std::fmt;

/// As coleções persistidas em `DATA_DIR`, uma tabela remota por coleção.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Schools,
    Materials,
    Requests,
    StockKimonos,
}

impl Collection {
    /// Ordem usada pelo push/pull.
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Schools,
        Collection::Materials,
        Collection::Requests,
        Collection::StockKimonos,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Schools => "schools",
            Collection::Materials => "materials",
            Collection::Requests => "requests",
            Collection::StockKimonos => "stock_kimonos",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Schools => "schools.json",
            Collection::Materials => "materials.json",
            Collection::Requests => "requests.json",
            Collection::StockKimonos => "stock_kimonos.json",
        }
    }

    /// Campos que podem atravessar a fronteira local/remoto.
    pub fn allowed_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["ps_number", "password", "credential", "name"],
            Collection::Schools => &["id", "nome", "city", "coaches"],
            Collection::Materials => &["category", "subcategory", "item"],
            Collection::Requests => &[
                "id", "school_id", "category", "material", "quantity", "date", "ps_number", "status",
            ],
            Collection::StockKimonos => &["id", "school_id", "project", "type", "size", "quantity"],
        }
    }

    /// Chave de conflito do upsert. `materials` não tem chave única.
    pub fn conflict_key(self) -> Option<&'static str> {
        match self {
            Collection::Users => Some("ps_number"),
            Collection::Schools | Collection::Requests | Collection::StockKimonos => Some("id"),
            Collection::Materials => None,
        }
    }

    /// Coluna usada para apagar tudo no modo "replace" (`key <> ''`).
    pub fn clear_key(self) -> &'static str {
        match self {
            Collection::Users => "ps_number",
            Collection::Materials => "category",
            Collection::Schools | Collection::Requests | Collection::StockKimonos => "id",
        }
    }

    fn has_integer_quantity(self) -> bool {
        matches!(self, Collection::Requests | Collection::StockKimonos)
    }

    /// Projeta uma linha local para o allowlist da coleção.
    /// Campos extra são descartados; `quantity` é convertido para inteiro quando possível.
    pub fn project(self, row: &Row) -> Row {
        let mut shaped = Row::new();
        for &field in self.allowed_fields() {
            if let Some(value) = row.get(field) {
                shaped.insert(field.to_string(), value.clone());
            }
        }
        if self.has_integer_quantity() {
            if let Some(qty) = shaped.get_mut("quantity") {
                coerce_integer(qty);
            }
        }
        shaped
    }

    /// Igual a `project`, mas descarta `null` (vindo do remoto) para que os defaults locais se apliquem.
    pub fn project_remote(self, row: &Row) -> Row {
        let mut shaped = self.project(row);
        shaped.retain(|_, v| !v.is_null());
        shaped
    }
}

fn coerce_integer(value: &mut Value) {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) if n.is_f64() => n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64),
        _ => None,
    };
    if let Some(n) = parsed {
        *value = Value::from(n);
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn project_drops_fields_outside_the_allowlist() {
        let school = row(json!({
            "id": "1565", "nome": "Escola A", "city": "Rio", "coaches": ["PS1"], "notes": "secret"
        }));
        let shaped = Collection::Schools.project(&school);
        assert!(!shaped.contains_key("notes"));
        assert_eq!(shaped.len(), 4);
        assert_eq!(shaped["coaches"], json!(["PS1"]));
    }

    #[test]
    fn project_coerces_request_quantity() {
        let req = row(json!({"id": "a", "quantity": "3"}));
        assert_eq!(Collection::Requests.project(&req)["quantity"], json!(3));

        let bad = row(json!({"id": "a", "quantity": "three"}));
        assert_eq!(Collection::Requests.project(&bad)["quantity"], json!("three"));

        // materials não tem quantity numérica
        let mat = row(json!({"category": "Books", "quantity": "3"}));
        assert!(!Collection::Materials.project(&mat).contains_key("quantity"));
    }

    #[test]
    fn remote_projection_drops_nulls() {
        let remote = row(json!({"id": "1", "nome": "A", "city": null, "created_at": "x"}));
        let shaped = Collection::Schools.project_remote(&remote);
        assert_eq!(shaped.len(), 2);
        assert!(!shaped.contains_key("city"));
    }

    #[test]
    fn materials_have_no_conflict_key() {
        assert_eq!(Collection::Materials.conflict_key(), None);
        assert_eq!(Collection::Users.conflict_key(), Some("ps_number"));
        assert_eq!(Collection::StockKimonos.table(), "stock_kimonos");
    }
}
