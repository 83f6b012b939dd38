//! tests/support.rs
//! Servidor de records en memoria con guiones de estados por record.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{Level, Log, Metadata, Record as LogRecord};
use tokio::time::Instant;

use crate::config::poller_config::PollerConfig;
use crate::models::record_model::Record;
use crate::services::poller_service::PollerService;
use crate::services::record_client::RecordApi;
use crate::services::row_registry::RowRegistry;

/// Un paso del guion: lo que responde el próximo GET
#[derive(Debug, Clone)]
pub enum Step {
    Status(&'static str),
    Fail(&'static str),
}

#[derive(Default)]
struct ScriptState {
    records: HashMap<String, (String, VecDeque<Step>)>,
    /// Guiones para los próximos POST /records
    submissions: VecDeque<Vec<Step>>,
    created: u32,
    fail_create: bool,
    fetches: Vec<(String, Instant)>,
}

#[derive(Default)]
pub struct ScriptedApi {
    state: Mutex<ScriptState>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega pasos al guion de `record_id` (lo crea si no existe)
    pub fn script(&self, record_id: &str, doctor: &str, steps: Vec<Step>) {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .records
            .entry(record_id.to_string())
            .or_insert_with(|| (doctor.to_string(), VecDeque::new()));
        entry.1.extend(steps);
    }

    pub fn queue_submission(&self, steps: Vec<Step>) {
        self.state.lock().unwrap().submissions.push_back(steps);
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fetch_count(&self, record_id: &str) -> usize {
        self.fetch_times(record_id).len()
    }

    pub fn fetch_times(&self, record_id: &str) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .fetches
            .iter()
            .filter(|(id, _)| id == record_id)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl RecordApi for ScriptedApi {
    async fn create_record(&self, doctor: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(anyhow!("connection refused"));
        }
        state.created += 1;
        let record_id = format!("rec-{}", state.created);
        let steps = state.submissions.pop_front().unwrap_or_default();
        state
            .records
            .insert(record_id.clone(), (doctor.to_string(), steps.into()));
        Ok(record_id)
    }

    async fn fetch_record(&self, record_id: &str) -> Result<Record> {
        let mut state = self.state.lock().unwrap();
        state.fetches.push((record_id.to_string(), Instant::now()));

        let (doctor, steps) = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| anyhow!("404 record_id={}", record_id))?;

        match steps.pop_front() {
            Some(Step::Status(status)) => Ok(Record::test_new(record_id, doctor, status)),
            Some(Step::Fail(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("guion agotado para {}", record_id)),
        }
    }
}

pub fn test_config() -> PollerConfig {
    PollerConfig::default()
}

pub fn poller_with(api: Arc<ScriptedApi>, config: &PollerConfig) -> PollerService {
    PollerService::new(api, RowRegistry::new(), config)
}

/// Logger de tests: guarda (nivel, mensaje) de todo lo que se loguea.
/// Los tests corren en paralelo en el mismo proceso, así que cada test
/// filtra por un texto propio (p.ej. un record_id único).
struct CaptureLogger;

static CAPTURED: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());
static INSTALL: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        CAPTURED
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

pub fn capture_logs() {
    INSTALL.call_once(|| {
        log::set_logger(&CaptureLogger).expect("logger de tests ya instalado");
        log::set_max_level(log::LevelFilter::Trace);
    });
}

/// Cuántos `log::error!` mencionan `needle`
pub fn logged_errors(needle: &str) -> usize {
    CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, msg)| *level == Level::Error && msg.contains(needle))
        .count()
}
