// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
/// `Key::try_from` exige pelo menos 64 bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

/// Credenciais do armazenamento remoto (Supabase / PostgREST).
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub url: String,
    pub key: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub session_secret: String,
    pub session_database_url: String,
    /// Senha do admin criado no primeiro arranque (por omissão, o próprio PS number).
    pub bootstrap_admin_password: Option<String>,
    /// `None` quando SUPABASE_URL/SUPABASE_KEY não estão definidos: a sincronização fica desligada.
    pub remote: Option<RemoteConfig>,
}

impl AppConfig {
    /// Lê a configuração das variáveis de ambiente (o `.env` já deve ter sido carregado).
    pub fn from_env() -> AppResult<Self> {
        let data_dir = PathBuf::from(
            env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
        );

        let bind_raw = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR '{}' inválido: {}", bind_raw, e)))?;

        let session_secret = env::var("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Config(format!(
                "SESSION_SECRET precisa de pelo menos {} bytes",
                MIN_SESSION_SECRET_LEN
            )));
        }

        let session_database_url = env::var("SESSION_DATABASE_URL").unwrap_or_else(|_| {
            format!("sqlite://{}", data_dir.join("sessions.db").to_string_lossy())
        });

        let bootstrap_admin_password = env::var("BOOTSTRAP_ADMIN_PASSWORD").ok().filter(|v| !v.trim().is_empty());

        let remote = Self::remote_from_env()?;

        Ok(Self {
            data_dir,
            bind_addr,
            session_secret,
            session_database_url,
            bootstrap_admin_password,
            remote,
        })
    }

    /// Só a parte remota; usada também pelo `portal-check`.
    pub fn remote_from_env() -> AppResult<Option<RemoteConfig>> {
        let url = env::var("SUPABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let key = env::var("SUPABASE_KEY").ok().filter(|v| !v.trim().is_empty());

        let timeout_secs = match env::var("REMOTE_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::Config(format!("REMOTE_TIMEOUT_SECS '{}' inválido: {}", raw, e))
            })?,
            Err(_) => DEFAULT_REMOTE_TIMEOUT_SECS,
        };

        match (url, key) {
            (Some(url), Some(key)) => Ok(Some(RemoteConfig {
                url,
                key,
                timeout: Duration::from_secs(timeout_secs),
            })),
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("⚠️ Apenas uma de SUPABASE_URL/SUPABASE_KEY está definida; sincronização desligada.");
                Ok(None)
            }
        }
    }
}
