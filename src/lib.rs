// src/lib.rs
//! Portal de pedidos de material: coleções JSON locais com sincronização
//! best-effort para um armazenamento remoto (Supabase/PostgREST).

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
pub mod templates;
pub mod web;
