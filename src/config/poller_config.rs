//! config/poller_config.rs
//! Configuración global del poller (URL del servicio de records, intervalo,
//! estados terminales, etc.). Se lee de variables de entorno / `.env`.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Estado de éxito que reporta el servicio de records
pub const STATUS_SUCCESS: &str = "Успешно";
/// Estado de fallo que reporta el servicio de records
pub const STATUS_FAILURE: &str = "FAILURE";

/// Configuración del poller, con valores por defecto
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// URL base del servicio externo (sin `/records`)
    pub api_base_url: String,
    /// Espera entre la respuesta de un poll y el siguiente
    pub poll_interval: Duration,
    /// Estados a partir de los cuales no se sigue consultando
    pub terminal_statuses: HashSet<String>,
    /// Timeout por petición. `None` = sin timeout.
    pub request_timeout: Option<Duration>,
    pub bind_host: String,
    pub bind_port: u16,
    /// Botones que se muestran en la página principal
    pub doctors: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval: Duration::from_millis(2000),
            terminal_statuses: [STATUS_SUCCESS, STATUS_FAILURE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            request_timeout: None,
            bind_host: "0.0.0.0".to_string(),
            bind_port: 5022,
            doctors: vec![
                "Терапевт".to_string(),
                "Лор".to_string(),
                "Хирург".to_string(),
                "Окулист".to_string(),
            ],
        }
    }
}

impl PollerConfig {
    /// Lee la configuración del entorno del proceso.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda
    /// (permite probar sin tocar el entorno real).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = PollerConfig::default();

        if let Some(url) = lookup("RECORDS_API_URL") {
            cfg.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(ms) = lookup("POLLER_INTERVAL_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("POLLER_INTERVAL_MS inválido: '{}'", ms))?;
            cfg.poll_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("POLLER_TERMINAL_STATUSES") {
            let statuses = split_list(&raw);
            if !statuses.is_empty() {
                cfg.terminal_statuses = statuses.into_iter().collect();
            }
        }

        if let Some(secs) = lookup("POLLER_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("POLLER_REQUEST_TIMEOUT_SECS inválido: '{}'", secs))?;
            cfg.request_timeout = Some(Duration::from_secs(secs));
        }

        if let Some(host) = lookup("POLLER_BIND_HOST") {
            cfg.bind_host = host;
        }

        if let Some(port) = lookup("POLLER_BIND_PORT") {
            cfg.bind_port = port
                .trim()
                .parse()
                .with_context(|| format!("POLLER_BIND_PORT inválido: '{}'", port))?;
        }

        if let Some(raw) = lookup("POLLER_DOCTORS") {
            cfg.doctors = split_list(&raw);
        }

        Ok(cfg)
    }
}

/// "a, b,,c" -> ["a", "b", "c"]
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
