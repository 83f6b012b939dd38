//! services/record_client.rs
//! Cliente del servicio externo de records (`POST /records`, `GET /records/{id}`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::poller_config::PollerConfig;
use crate::models::record_model::{CreateRecordRequest, CreateRecordResponse, Record};

/// Contrato con el servidor de records. El poller sólo depende de esto,
/// así los tests pueden inyectar un servidor en memoria.
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Crea el record y devuelve el `record_id` asignado por el servidor
    async fn create_record(&self, doctor: &str) -> Result<String>;

    /// Estado actual del record
    async fn fetch_record(&self, record_id: &str) -> Result<Record>;
}

#[derive(Clone, Debug)]
pub struct HttpRecordClient {
    base_url: String,
    http_client: Client,
}

impl HttpRecordClient {
    pub fn new(config: &PollerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .context("No se pudo construir el cliente HTTP")?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn record_url(&self, record_id: &str) -> String {
        format!(
            "{}/records/{}",
            self.base_url,
            urlencoding::encode(record_id)
        )
    }
}

#[async_trait]
impl RecordApi for HttpRecordClient {
    async fn create_record(&self, doctor: &str) -> Result<String> {
        let url = format!("{}/records", self.base_url);
        log::debug!("(create_record) POST {} doctor='{}'", url, doctor);

        let resp = self
            .http_client
            .post(&url)
            .json(&CreateRecordRequest {
                doctor: doctor.to_string(),
            })
            .send()
            .await
            .context("Fallo al hacer POST /records")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "POST /records respondió {}: {}",
                status,
                body_txt
            ));
        }

        let created = resp
            .json::<CreateRecordResponse>()
            .await
            .context("Respuesta de POST /records sin record_id válido")?;

        Ok(created.record_id)
    }

    async fn fetch_record(&self, record_id: &str) -> Result<Record> {
        let url = self.record_url(record_id);
        log::debug!("(fetch_record) GET {}", url);

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Fallo al hacer GET /records/{}", record_id))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GET /records/{} respondió {}: {}",
                record_id,
                status,
                body_txt
            ));
        }

        resp.json::<Record>()
            .await
            .with_context(|| format!("JSON inválido en GET /records/{}", record_id))
    }
}
