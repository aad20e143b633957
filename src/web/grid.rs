// src/web/grid.rs
//! Formulários em grelha: inputs `campo.N`, uma linha por índice N.
//!
//! Os restantes pares (checkboxes `mark`, selects soltos, botões) ficam em
//! `values`, pela ordem em que chegaram.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridRow {
    pub index: usize,
    fields: BTreeMap<String, String>,
}

impl GridRow {
    /// Valor do campo, ou "" quando não veio no formulário.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GridForm {
    pub rows: Vec<GridRow>,
    pub values: Vec<(String, String)>,
}

impl GridForm {
    pub fn parse(pairs: Vec<(String, String)>) -> Self {
        let mut rows: BTreeMap<usize, GridRow> = BTreeMap::new();
        let mut values = Vec::new();

        for (name, value) in pairs {
            let indexed = name
                .rsplit_once('.')
                .and_then(|(field, idx)| idx.parse::<usize>().ok().map(|i| (field.to_string(), i)));
            match indexed {
                Some((field, index)) if !field.is_empty() => {
                    rows.entry(index)
                        .or_insert_with(|| GridRow { index, ..Default::default() })
                        .fields
                        .insert(field, value);
                }
                _ => values.push((name, value)),
            }
        }

        Self { rows: rows.into_values().collect(), values }
    }

    /// Linhas com algum valor preenchido.
    pub fn filled_rows(&self) -> impl Iterator<Item = &GridRow> {
        self.rows.iter().filter(|r| !r.is_blank())
    }

    /// Todos os valores de um campo repetido (ex.: checkboxes `mark`), sem vazios.
    pub fn all(&self, name: &str) -> Vec<String> {
        self.values
            .iter()
            .filter(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
            .collect()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn flag(&self, name: &str) -> bool {
        self.first(name).is_some_and(|v| !v.is_empty() && v != "false")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn rows_are_grouped_and_ordered_by_index() {
        let form = GridForm::parse(pairs(&[
            ("id.10", "b"),
            ("id.2", "a"),
            ("nome.2", "Alfa"),
            ("mark", "a"),
            ("nome.10", "Beta"),
            ("mark", "b"),
            ("mark", ""),
            ("id.3", " "),
        ]));
        assert_eq!(form.rows.len(), 3);
        assert_eq!(form.rows[0].get("nome"), "Alfa");
        assert_eq!(form.rows[1].index, 3);
        assert_eq!(form.rows[2].get("id"), "b");
        assert_eq!(form.rows[2].get("city"), "");
        assert_eq!(form.filled_rows().count(), 2);
        assert_eq!(form.all("mark"), vec!["a", "b"]);
    }

    #[test]
    fn dotted_names_without_numeric_suffix_stay_plain() {
        let form = GridForm::parse(pairs(&[("v1.x", "1"), ("force", "on")]));
        assert!(form.rows.is_empty());
        assert!(form.flag("force"));
        assert!(!form.flag("replace"));
        assert_eq!(form.first("v1.x"), Some("1"));
    }
}
