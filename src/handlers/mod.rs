//! handlers/mod.rs
//! Módulo que agrupa los handlers HTTP de la vista local.
pub mod record_handler;
