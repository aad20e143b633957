// src/store.rs
use crate::{
    error::{AppError, AppResult},
    models::{collection::Collection, Row},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Armazenamento local: um ficheiro JSON (array de objetos) por coleção.
/// Cada save reescreve a coleção inteira; assume-se um único processo escritor.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    pub fn exists(&self, collection: Collection) -> bool {
        self.path(collection).is_file()
    }

    /// Cria o diretório de dados e os ficheiros em falta com `default_rows`.
    pub fn ensure_file<T: Serialize>(&self, collection: Collection, default_rows: &[T]) -> AppResult<bool> {
        fs::create_dir_all(&self.data_dir)?;
        if self.exists(collection) {
            return Ok(false);
        }
        tracing::info!("📄 Criando {} com {} registo(s) por omissão.", collection.file_name(), default_rows.len());
        self.save(collection, default_rows)?;
        Ok(true)
    }

    /// Lê as linhas "cruas" pela ordem do ficheiro. Ficheiro inexistente = coleção vazia.
    pub fn load_rows(&self, collection: Collection) -> AppResult<Vec<Row>> {
        let path = self.path(collection);
        if !path.is_file() {
            tracing::debug!("{} não existe, coleção vazia.", path.display());
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let serde_json::Value::Array(items) = value else {
            return Err(AppError::InvalidDataFile {
                file: collection.file_name().to_string(),
                reason: "expected a top-level array".to_string(),
            });
        };
        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                serde_json::Value::Object(row) => Ok(row),
                other => Err(AppError::InvalidDataFile {
                    file: collection.file_name().to_string(),
                    reason: format!("entry {} is not an object: {}", idx + 1, other),
                }),
            })
            .collect()
    }

    /// Lê e converte cada linha para o tipo da coleção.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> AppResult<Vec<T>> {
        let rows = self.load_rows(collection)?;
        decode_rows(collection, rows)
    }

    /// Reescreve a coleção inteira de forma atómica (ficheiro temporário + rename).
    pub fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> AppResult<()> {
        let path = self.path(collection);
        let content = serde_json::to_string_pretty(records)?;
        write_atomic(&path, &content)?;
        tracing::debug!("💾 {} gravado ({} registo(s)).", collection.file_name(), records.len());
        Ok(())
    }
}

/// Converte linhas cruas em registos tipados, indicando a linha problemática.
pub fn decode_rows<T: DeserializeOwned>(collection: Collection, rows: Vec<Row>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| AppError::InvalidDataFile {
                file: collection.file_name().to_string(),
                reason: format!("entry {}: {}", idx + 1, e),
            })
        })
        .collect()
}

/// Registos tipados de volta para linhas cruas (objetos JSON).
pub fn encode_rows<T: Serialize>(records: &[T]) -> AppResult<Vec<Row>> {
    records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            serde_json::Value::Object(row) => Ok(row),
            _ => Err(AppError::InternalServerError),
        })
        .collect()
}

fn write_atomic(path: &Path, content: &str) -> AppResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    // O temporário fica no mesmo diretório para o rename ser atómico
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.write_all(b"\n")?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{school::School, user::User};
    use serde_json::json;

    fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let (_dir, store) = store();
        let schools: Vec<School> = store.load(Collection::Schools).unwrap();
        assert!(schools.is_empty());
    }

    #[test]
    fn save_then_load_is_identity_and_keeps_order() {
        let (_dir, store) = store();
        let schools: Vec<School> = serde_json::from_value(json!([
            {"id": "20", "nome": "Zeta", "city": "Niterói", "coaches": ["PS2"]},
            {"id": "3", "nome": "Alfa", "city": "", "coaches": [], "notes": "extra field"},
            {"id": "100", "nome": "Ação", "city": "São Gonçalo", "coaches": ["PS1", "PS2"]}
        ]))
        .unwrap();

        store.save(Collection::Schools, &schools).unwrap();
        let loaded: Vec<School> = store.load(Collection::Schools).unwrap();
        assert_eq!(loaded, schools);

        // UTF-8 gravado como está, sem escapes
        let text = std::fs::read_to_string(store.path(Collection::Schools)).unwrap();
        assert!(text.contains("São Gonçalo"));
    }

    #[test]
    fn non_array_file_is_an_error_not_an_empty_collection() {
        let (_dir, store) = store();
        std::fs::write(store.path(Collection::Users), r#"{"ps_number": "PS1"}"#).unwrap();
        let err = store.load::<User>(Collection::Users).unwrap_err();
        assert!(matches!(err, AppError::InvalidDataFile { .. }));
    }

    #[test]
    fn ensure_file_only_writes_once() {
        let (_dir, store) = store();
        let defaults = vec![json!({"category": "Books", "subcategory": "", "item": "Notebook"})];
        assert!(store.ensure_file(Collection::Materials, &defaults).unwrap());
        assert!(!store.ensure_file(Collection::Materials, &Vec::<Row>::new()).unwrap());
        assert_eq!(store.load_rows(Collection::Materials).unwrap().len(), 1);
    }
}
