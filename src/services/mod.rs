//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod poller_service;
pub mod record_client;
pub mod row_registry;
