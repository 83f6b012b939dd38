//! config/mod.rs
//! Configuración de la aplicación.

pub mod poller_config;
