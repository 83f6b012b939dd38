use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinError, JoinHandle};

use crate::config::poller_config::PollerConfig;
use crate::models::record_model::{ChainOutcome, ChainState, RenderAction};
use crate::services::record_client::RecordApi;
use crate::services::row_registry::RowRegistry;

/// Cuántos resultados de cadenas terminadas se guardan para `join`
pub const MAX_FINISHED_OUTCOMES: usize = 256;

/// Crea records en el servidor externo y sigue su estado hasta que llega
/// a un estado terminal. Cada record tiene como mucho una cadena de polling
/// activa, que es una task de tokio cancelable.
#[derive(Clone)]
pub struct PollerService {
    api: Arc<dyn RecordApi>,
    registry: RowRegistry,
    poll_interval: Duration,
    terminal_statuses: Arc<HashSet<String>>,
    chains: Arc<Mutex<ChainTable>>,
}

/// Cadenas vivas por record_id + últimos resultados (acotados).
#[derive(Default)]
struct ChainTable {
    running: HashMap<String, RunningChain>,
    finished: VecDeque<(String, ChainOutcome)>,
    next_generation: u64,
}

pub(crate) struct RunningChain {
    /// Una cadena sólo se quita a sí misma si la generación coincide
    pub(crate) generation: u64,
    pub(crate) handle: JoinHandle<ChainOutcome>,
    pub(crate) outcome: watch::Receiver<Option<ChainOutcome>>,
}

impl RunningChain {
    pub(crate) fn is_done(&self) -> bool {
        self.handle.is_finished() || self.outcome.borrow().is_some()
    }
}

impl ChainTable {
    /// La task de la cadena terminó: quitar su entrada si sigue siendo la suya.
    fn finish(&mut self, record_id: &str, generation: u64, outcome: ChainOutcome) {
        let current = self.running.get(record_id).map(|c| c.generation);
        if current == Some(generation) {
            self.running.remove(record_id);
        }
        self.record_outcome(record_id, outcome);
    }

    fn record_outcome(&mut self, record_id: &str, outcome: ChainOutcome) {
        self.finished.push_back((record_id.to_string(), outcome));
        while self.finished.len() > MAX_FINISHED_OUTCOMES {
            self.finished.pop_front();
        }
    }

    fn last_outcome(&self, record_id: &str) -> Option<ChainOutcome> {
        self.finished
            .iter()
            .rev()
            .find(|(id, _)| id == record_id)
            .map(|(_, outcome)| outcome.clone())
    }
}

impl PollerService {
    pub fn new(api: Arc<dyn RecordApi>, registry: RowRegistry, config: &PollerConfig) -> Self {
        Self {
            api,
            registry,
            poll_interval: config.poll_interval,
            terminal_statuses: Arc::new(config.terminal_statuses.clone()),
            chains: Arc::new(Mutex::new(ChainTable::default())),
        }
    }

    pub fn registry(&self) -> &RowRegistry {
        &self.registry
    }

    /// `POST /records` con el doctor y arranca el polling del id devuelto.
    pub async fn submit(&self, doctor: &str) -> Result<String> {
        log::info!("(submit) Creando record para doctor='{}'", doctor);

        let record_id = match self.api.create_record(doctor).await {
            Ok(id) => id,
            Err(e) => {
                log::error!("(submit) No se pudo crear record para '{}': {:?}", doctor, e);
                return Err(e);
            }
        };

        log::info!("(submit) Record creado record_id={}", record_id);
        self.poll_status(&record_id).await;
        Ok(record_id)
    }

    /// Arranca la cadena de polling de `record_id`.
    /// Devuelve `false` si ya había una cadena corriendo para ese id.
    pub async fn poll_status(&self, record_id: &str) -> bool {
        let mut table = self.chains.lock().await;

        if let Some(chain) = table.running.get(record_id) {
            if !chain.is_done() {
                log::info!(
                    "(poll_status) Ya hay una cadena activa para record_id={}",
                    record_id
                );
                return false;
            }
        }

        // Si la fila ya existe (re-poll) vuelve a quedar en "polling"
        self.registry
            .set_chain_state(record_id, ChainState::Polling)
            .await;

        let generation = table.next_generation;
        table.next_generation += 1;

        let chain = PollingChain {
            record_id: record_id.to_string(),
            api: self.api.clone(),
            registry: self.registry.clone(),
            poll_interval: self.poll_interval,
            terminal_statuses: self.terminal_statuses.clone(),
        };
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let chains = self.chains.clone();
        let id = record_id.to_string();

        let handle = tokio::spawn(async move {
            let outcome = chain.run().await;
            // Primero el resultado: `join` no depende de la limpieza
            let _ = outcome_tx.send(Some(outcome.clone()));
            chains.lock().await.finish(&id, generation, outcome.clone());
            outcome
        });

        table.running.insert(
            record_id.to_string(),
            RunningChain {
                generation,
                handle,
                outcome: outcome_rx,
            },
        );

        log::info!(
            "(poll_status) Cadena #{} iniciada para record_id={}",
            generation,
            record_id
        );
        true
    }

    /// Detiene la cadena de `record_id`. `true` si estaba corriendo y se cortó.
    pub async fn cancel(&self, record_id: &str) -> bool {
        let chain = match self.chains.lock().await.running.remove(record_id) {
            Some(chain) => chain,
            None => return false,
        };

        if chain.is_done() {
            return false;
        }

        let outcome = stop_chain(chain).await;
        if outcome != ChainOutcome::Cancelled {
            log::info!(
                "(cancel) record_id={} ya había terminado: {:?}",
                record_id,
                outcome
            );
            return false;
        }

        self.chains
            .lock()
            .await
            .record_outcome(record_id, ChainOutcome::Cancelled);
        self.registry
            .set_chain_state(record_id, ChainState::Cancelled)
            .await;
        log::info!("(cancel) Cadena cancelada para record_id={}", record_id);
        true
    }

    /// Espera a que termine la cadena de `record_id` y devuelve cómo terminó.
    /// Si ya terminó devuelve el último resultado guardado; `None` si no hay ninguno.
    pub async fn join(&self, record_id: &str) -> Option<ChainOutcome> {
        let mut outcome_rx = {
            let table = self.chains.lock().await;
            match table.running.get(record_id) {
                Some(chain) => chain.outcome.clone(),
                None => return table.last_outcome(record_id),
            }
        };

        // La entrada sigue en la tabla mientras esperamos
        let outcome = match outcome_rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            // La task se soltó sin resultado: abortada
            Err(_) => Some(ChainOutcome::Cancelled),
        };
        outcome
    }

    /// Ids con una cadena todavía corriendo.
    pub async fn active_chains(&self) -> Vec<String> {
        let table = self.chains.lock().await;
        let mut ids: Vec<String> = table
            .running
            .iter()
            .filter(|(_, chain)| !chain.is_done())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Cancela todas las cadenas y espera a que terminen.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, RunningChain)> =
            self.chains.lock().await.running.drain().collect();

        let ids: Vec<String> = drained.iter().map(|(id, _)| id.clone()).collect();
        let outcomes = join_all(drained.into_iter().map(|(_, chain)| stop_chain(chain))).await;

        let mut cancelled = 0;
        for (id, outcome) in ids.iter().zip(outcomes) {
            if outcome == ChainOutcome::Cancelled {
                self.registry
                    .set_chain_state(id, ChainState::Cancelled)
                    .await;
                self.chains.lock().await.record_outcome(id, outcome);
                cancelled += 1;
            }
        }
        log::info!("(shutdown) {} cadenas canceladas", cancelled);
    }

    /// (cadenas en la tabla, resultados guardados)
    #[cfg(test)]
    pub(crate) async fn chain_table_sizes(&self) -> (usize, usize) {
        let table = self.chains.lock().await;
        (table.running.len(), table.finished.len())
    }
}

/// Aborta la task y devuelve cómo terminó de verdad: si alcanzó a publicar
/// su resultado antes del abort, ese resultado gana.
pub(crate) async fn stop_chain(chain: RunningChain) -> ChainOutcome {
    chain.handle.abort();
    let joined = chain.handle.await;
    let published = chain.outcome.borrow().clone();
    match published {
        Some(outcome) => outcome,
        None => outcome_of(joined),
    }
}

fn outcome_of(joined: Result<ChainOutcome, JoinError>) -> ChainOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => ChainOutcome::Cancelled,
        Err(e) => ChainOutcome::Failed(format!("la cadena terminó con pánico: {}", e)),
    }
}

/// Una cadena fetch -> pintar -> esperar para un solo record.
struct PollingChain {
    record_id: String,
    api: Arc<dyn RecordApi>,
    registry: RowRegistry,
    poll_interval: Duration,
    terminal_statuses: Arc<HashSet<String>>,
}

impl PollingChain {
    async fn run(self) -> ChainOutcome {
        loop {
            let record = match self.api.fetch_record(&self.record_id).await {
                Ok(record) => record,
                Err(e) => {
                    // Un solo error por cadena, sin reintentos
                    log::error!(
                        "(poll_status) Error consultando record_id={}: {:?}",
                        self.record_id,
                        e
                    );
                    self.registry
                        .set_chain_state(&self.record_id, ChainState::Failed)
                        .await;
                    return ChainOutcome::Failed(format!("{:#}", e));
                }
            };

            if record.record_id != self.record_id {
                log::warn!(
                    "(poll_status) El servidor respondió record_id={} al pedir {}",
                    record.record_id,
                    self.record_id
                );
            }

            let action = self.registry.render(&self.record_id, &record).await;
            log::info!(
                "(poll_status) record_id={} status='{}' ({})",
                self.record_id,
                record.record_status,
                match action {
                    RenderAction::Inserted => "fila nueva",
                    RenderAction::Updated => "fila actualizada",
                }
            );

            if self.terminal_statuses.contains(&record.record_status) {
                self.registry
                    .set_chain_state(&self.record_id, ChainState::Done)
                    .await;
                log::info!(
                    "(poll_status) record_id={} terminó con '{}'",
                    self.record_id,
                    record.record_status
                );
                return ChainOutcome::Terminal(record.record_status);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
