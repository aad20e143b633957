// src/main.rs
use requests_portal::{
    config::AppConfig,
    remote::{RemoteStore, SupabaseClient},
    services,
    state::AppState,
    store::JsonStore,
    web,
};
use axum::serve;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{env, str::FromStr, sync::Arc};
use time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::Key, ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuração do Logging (Tracing) ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "requests_portal=debug,tower_http=info,sqlx=warn,tower_sessions=info".into())
                .into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Iniciando o portal de pedidos...");

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("❌ Configuração inválida: {}", e);
        anyhow::anyhow!("Configuração inválida: {}", e)
    })?;

    // --- Dados locais ---
    let store = JsonStore::new(&config.data_dir);
    services::init_data_dir(&store, config.bootstrap_admin_password.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Falha ao preparar {}: {}", config.data_dir.display(), e))?;

    // --- Remoto (opcional) ---
    let remote: Option<Arc<dyn RemoteStore>> = match &config.remote {
        Some(remote_config) => {
            let client = SupabaseClient::new(remote_config)
                .map_err(|e| anyhow::anyhow!("Falha ao criar o cliente remoto: {}", e))?;
            tracing::info!("🔗 Sincronização remota ativa ({}).", client.name());
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("⚠️ SUPABASE_URL/SUPABASE_KEY ausentes: a funcionar só com os JSON locais.");
            None
        }
    };

    // --- Configuração das Sessões ---
    let connect_options = SqliteConnectOptions::from_str(&config.session_database_url)?.create_if_missing(true);
    let session_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!("❌ Falha ao abrir a base de dados de sessões: {}", e);
            anyhow::anyhow!("Falha ao conectar à DB de sessões: {}", e)
        })?;

    let session_store = SqliteStore::new(session_pool)
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Falha ao criar session store: {}", e))?;
    session_store.migrate().await?;

    let cleanup_store = session_store.clone();
    tokio::spawn(async move {
        if let Err(e) = cleanup_store
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!("Erro na task de limpeza de sessões: {:?}", e);
        }
    });
    tracing::info!("🧹 Tarefa de limpeza de sessões iniciada.");

    let key = Key::try_from(config.session_secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("SESSION_SECRET inválida: {}", e))?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_signed(key)
        .with_secure(false)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));
    tracing::info!("🔑 Camada de sessão configurada.");

    let app_state = AppState::new(store, remote);

    // --- Listener ---
    let listener = TcpListener::bind(config.bind_addr).await.map_err(|e| {
        tracing::error!("❌ Falha ao iniciar listener em {}: {}", config.bind_addr, e);
        e
    })?;
    tracing::info!("📡 Servidor escutando em http://{}", config.bind_addr);

    let app = web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(session_layer),
    );

    tracing::info!("👂 Servidor pronto para aceitar conexões...");
    if let Err(e) = serve(listener, app.into_make_service()).await {
        tracing::error!("❌ Erro fatal no servidor: {}", e);
        return Err(e.into());
    }

    Ok(())
}
