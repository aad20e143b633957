// src/bin/portal_check.rs
//! Verificação do ambiente: configuração, ficheiros de dados e acesso ao remoto.
//! Termina com código 1 se alguma verificação falhar.

use requests_portal::{
    config::AppConfig,
    models::collection::Collection,
    remote::{RemoteStore, SupabaseClient},
    store::JsonStore,
};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "requests_portal=info,portal_check=info".into()))
        .with(fmt::layer())
        .init();

    let mut failures = 0usize;

    let config = match AppConfig::from_env() {
        Ok(config) => {
            tracing::info!("✅ Config: data dir {}, bind {}", config.data_dir.display(), config.bind_addr);
            config
        }
        Err(e) => {
            tracing::error!("❌ Config: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let store = JsonStore::new(&config.data_dir);
    for collection in Collection::ALL {
        if !store.exists(collection) {
            tracing::warn!("⚠️ {}: missing (created on first launch)", collection.file_name());
            continue;
        }
        match store.load_rows(collection) {
            Ok(rows) => tracing::info!("✅ {}: {} record(s)", collection.file_name(), rows.len()),
            Err(e) => {
                failures += 1;
                tracing::error!("❌ {}: {}", collection.file_name(), e);
            }
        }
    }

    match &config.remote {
        None => tracing::warn!("⚠️ Remote: not configured (SUPABASE_URL / SUPABASE_KEY)"),
        Some(remote_config) => {
            let client = SupabaseClient::new(remote_config)?;
            for collection in Collection::ALL {
                match client.has_rows(collection.table()).await {
                    Ok(true) => tracing::info!("✅ remote '{}': reachable, has data", collection.table()),
                    Ok(false) => tracing::info!("✅ remote '{}': reachable, empty", collection.table()),
                    Err(e) => {
                        failures += 1;
                        tracing::error!("❌ remote '{}': {}", collection.table(), e);
                    }
                }
            }
        }
    }

    if failures > 0 {
        tracing::error!("{} check(s) failed.", failures);
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!("All checks passed.");
        Ok(ExitCode::SUCCESS)
    }
}
