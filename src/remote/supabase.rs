// src/remote/supabase.rs
use super::{RemoteError, RemoteStore};
use crate::{config::RemoteConfig, models::Row};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use std::time::Duration;

/// Maior intervalo pedido num select (linhas 0..=100000).
const SELECT_RANGE: &str = "0-100000";

/// Cliente PostgREST (`{url}/rest/v1/{tabela}`) autenticado com URL + chave.
pub struct SupabaseClient {
    base_url: String,
    key: String,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() || config.key.trim().is_empty() {
            return Err(RemoteError::Transport("remote URL and key must not be empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15).min(config.timeout))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url,
            key: config.key.clone(),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Lista para filtros `in.(...)`, com aspas duplas em cada valor.
pub(crate) fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Row>, RemoteError> {
        tracing::debug!("Remote: select * from {}", table);
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .header("Range-Unit", "items")
            .header("Range", SELECT_RANGE)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let rows: Vec<Row> = serde_json::from_str(&body)?;
        Ok(rows)
    }

    async fn has_rows(&self, table: &str) -> Result<bool, RemoteError> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(!rows.is_empty())
    }

    async fn upsert(&self, table: &str, rows: &[Row], on_conflict: Option<&str>) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }
        tracing::debug!("Remote: upsert {} linha(s) em {} (on_conflict={:?})", rows.len(), table, on_conflict);
        let mut request = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        if let Some(key) = on_conflict {
            request = request.query(&[("on_conflict", key)]);
        }
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn delete_in(&self, table: &str, column: &str, values: &[String]) -> Result<(), RemoteError> {
        if values.is_empty() {
            return Ok(());
        }
        tracing::debug!("Remote: delete {} linha(s) de {}", values.len(), table);
        let filter = in_filter(values);
        let response = self
            .request(Method::DELETE, table)
            .query(&[(column, filter.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_all(&self, table: &str, column: &str) -> Result<(), RemoteError> {
        tracing::warn!("Remote: apagando todas as linhas de {}", table);
        let response = self
            .request(Method::DELETE, table)
            .query(&[(column, "neq.")])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_filter_quotes_each_value() {
        let values = vec!["1565".to_string(), "a,b".to_string(), "x\"y".to_string()];
        assert_eq!(in_filter(&values), r#"in.("1565","a,b","x\"y")"#);
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let config = RemoteConfig {
            url: "   ".to_string(),
            key: "k".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(SupabaseClient::new(&config).is_err());
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let config = RemoteConfig {
            url: "https://example.supabase.co/".to_string(),
            key: "k".to_string(),
            timeout: Duration::from_secs(5),
        };
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(client.table_url("schools"), "https://example.supabase.co/rest/v1/schools");
    }
}
