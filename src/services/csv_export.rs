// src/services/csv_export.rs
use crate::models::{request::MaterialRequest, school::School};
use std::collections::HashMap;

pub const SCHOOLS_HEADER: [&str; 4] = ["id", "nome", "city", "coaches"];

pub const REQUESTS_HEADER: [&str; 10] = [
    "id",
    "school_id",
    "school_name",
    "category",
    "material",
    "quantity",
    "status",
    "date",
    "ps_number",
    "requester_name",
];

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn push_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| csv_quote(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Escolas em CSV; `coaches` vira uma única célula "PS1,PS2".
pub fn schools_csv(schools: &[School]) -> String {
    let mut out = String::new();
    push_record(&mut out, &SCHOOLS_HEADER);
    for school in schools {
        push_record(
            &mut out,
            &[
                school.id.clone(),
                school.nome.clone(),
                school.city.clone(),
                school.coaches.join(","),
            ],
        );
    }
    out
}

/// Todos os pedidos (export do Admin), com nome da escola e do requerente resolvidos.
/// Escola desconhecida cai para o próprio id; requerente desconhecido fica vazio.
pub fn requests_csv(
    requests: &[MaterialRequest],
    school_names: &HashMap<String, String>,
    requester_names: &HashMap<String, String>,
) -> String {
    let mut out = String::new();
    push_record(&mut out, &REQUESTS_HEADER);
    for r in requests {
        let school_id = r.school_id.trim();
        let ps = r.ps_number.trim();
        let school_name = school_names.get(school_id).map(String::as_str).unwrap_or(school_id);
        let requester = requester_names.get(ps).map(String::as_str).unwrap_or("");
        push_record(
            &mut out,
            &[
                r.id.to_string(),
                school_id.to_string(),
                school_name.to_string(),
                r.category.clone(),
                r.material.clone(),
                r.quantity.to_string(),
                r.status.to_string(),
                r.date.clone(),
                ps.to_string(),
                requester.to_string(),
            ],
        );
    }
    out
}

/// Nome do ficheiro de download com carimbo temporal.
pub fn export_file_name(prefix: &str) -> String {
    format!("{}_{}.csv", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn schools_flatten_coaches_into_one_cell() {
        let schools: Vec<School> = serde_json::from_value(json!([
            {"id": "1565", "nome": "Escola Azul", "city": "Rio", "coaches": ["PS1", "PS2"]},
            {"id": "7", "nome": "Solo", "coaches": []}
        ]))
        .unwrap();
        let csv = schools_csv(&schools);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,nome,city,coaches");
        assert_eq!(lines[1], "1565,Escola Azul,Rio,\"PS1,PS2\"");
        assert_eq!(lines[2], "7,Solo,,");
    }

    #[test]
    fn requests_resolve_school_and_requester_names() {
        let requests: Vec<MaterialRequest> = serde_json::from_value(json!([
            {"id": "2b1c7b9e-5c1e-4b8e-9d55-1b2d3c4e5f60", "school_id": "1565", "category": "Books",
             "material": "School Notebook", "quantity": 3, "date": "2025-11-09 10:00:00",
             "ps_number": "PS1724", "status": "Denied"},
            {"id": "3b1c7b9e-5c1e-4b8e-9d55-1b2d3c4e5f61", "school_id": "99", "quantity": 1, "ps_number": "PS9"}
        ]))
        .unwrap();
        let schools = HashMap::from([("1565".to_string(), "Escola Azul".to_string())]);
        let users = HashMap::from([("PS1724".to_string(), "Administrator".to_string())]);

        let csv = requests_csv(&requests, &schools, &users);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], REQUESTS_HEADER.join(","));
        assert_eq!(
            lines[1],
            "2b1c7b9e-5c1e-4b8e-9d55-1b2d3c4e5f60,1565,Escola Azul,Books,School Notebook,3,Rejected,2025-11-09 10:00:00,PS1724,Administrator"
        );
        assert!(lines[2].starts_with("3b1c7b9e-5c1e-4b8e-9d55-1b2d3c4e5f61,99,99,,,1,Pending,,PS9,"));
    }
}
