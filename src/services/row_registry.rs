//! services/row_registry.rs
//! Tabla de records que se va pintando con cada poll.
//! Una fila por `record_id`: se agrega la primera vez y luego se actualiza en su lugar.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::record_model::{ChainState, Record, RecordRow, RenderAction};

#[derive(Clone, Default)]
pub struct RowRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    /// Orden de inserción, como las filas de la tabla
    rows: Vec<RecordRow>,
    /// record_id -> posición en `rows`
    index: HashMap<String, usize>,
}

impl RowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pinta la última respuesta del servidor en la fila `record_id`.
    /// Si la fila existe se actualizan doctor y estado; si no, se agrega al final.
    pub async fn render(&self, record_id: &str, record: &Record) -> RenderAction {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        if let Some(&pos) = inner.index.get(record_id) {
            let row = &mut inner.rows[pos];
            row.doctor = record.doctor.clone();
            row.record_status = record.record_status.clone();
            row.polls += 1;
            row.updated_at = now;
            return RenderAction::Updated;
        }

        let pos = inner.rows.len();
        inner.rows.push(RecordRow {
            record_id: record_id.to_string(),
            doctor: record.doctor.clone(),
            record_status: record.record_status.clone(),
            chain: ChainState::Polling,
            polls: 1,
            updated_at: now,
        });
        inner.index.insert(record_id.to_string(), pos);
        RenderAction::Inserted
    }

    /// Devuelve `false` si todavía no hay fila para ese id.
    pub async fn set_chain_state(&self, record_id: &str, state: ChainState) -> bool {
        let mut inner = self.inner.write().await;
        match inner.index.get(record_id).copied() {
            Some(pos) => {
                inner.rows[pos].chain = state;
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, record_id: &str) -> Option<RecordRow> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(record_id)
            .map(|&pos| inner.rows[pos].clone())
    }

    pub async fn rows(&self) -> Vec<RecordRow> {
        self.inner.read().await.rows.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    /// Cuerpo `<tbody id="records">` de la tabla: id, doctor, estado.
    pub async fn render_html(&self) -> String {
        let inner = self.inner.read().await;
        let mut html = String::new();
        for row in &inner.rows {
            html.push_str(&format!(
                "<tr id=\"{id}\"><td>{id}</td><td>{doctor}</td><td>{status}</td></tr>\n",
                id = escape_html(&row.record_id),
                doctor = escape_html(row.doctor.as_deref().unwrap_or("")),
                status = escape_html(&row.record_status),
            ));
        }
        html
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
