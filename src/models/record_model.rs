//! models/record_model.rs
//! Estructuras del contrato `/records` y de la fila que se muestra en la tabla.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body de `POST /records`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub doctor: String,
}

/// Respuesta de `POST /records`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordResponse {
    #[serde(deserialize_with = "de_record_id")]
    pub record_id: String,
}

/// Respuesta de `GET /records/{record_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "de_record_id")]
    pub record_id: String,
    /// Mientras la tarea está en PENDING el servidor manda `null`
    #[serde(default, deserialize_with = "de_display_text")]
    pub doctor: Option<String>,
    pub record_status: String,
}

impl Record {
    #[allow(dead_code)]
    #[cfg(test)]
    pub fn test_new(record_id: &str, doctor: &str, record_status: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            doctor: Some(doctor.to_string()),
            record_status: record_status.to_string(),
        }
    }
}

/// Estado de la cadena de polling asociada a una fila
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainState {
    Polling,
    Done,
    Failed,
    Cancelled,
}

/// Fila de la tabla: id, doctor, estado (en ese orden) + metadatos locales
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub record_id: String,
    pub doctor: Option<String>,
    pub record_status: String,
    pub chain: ChainState,
    /// Cuántas veces se ha pintado la fila
    pub polls: u32,
    pub updated_at: DateTime<Utc>,
}

/// Qué hizo el registro con una respuesta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAction {
    Inserted,
    Updated,
}

/// Cómo terminó una cadena de polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Se observó un estado terminal
    Terminal(String),
    /// Falló el fetch o el parseo; no se reintenta
    Failed(String),
    Cancelled,
}

/// Respuesta del endpoint local de submit
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub record_id: String,
    pub message: String,
}

// El servidor puede mandar el id como string o como número
fn de_record_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "record_id debe ser string o número, llegó: {}",
            other
        ))),
    }
}

// `info` de la tarea: null, string u otro JSON (p.ej. la excepción en FAILURE)
fn de_display_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
