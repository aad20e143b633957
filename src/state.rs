// src/state.rs
use crate::{remote::RemoteStore, store::JsonStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: JsonStore,
    // None quando o remoto não está configurado: a app funciona só com os JSON locais
    pub remote: Option<Arc<dyn RemoteStore>>,
}

impl AppState {
    pub fn new(store: JsonStore, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { store, remote }
    }

    pub fn remote(&self) -> Option<&dyn RemoteStore> {
        self.remote.as_deref()
    }
}
