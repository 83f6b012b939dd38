//! tests/mod.rs
//! Pruebas unitarias de la app.

mod registry_tests;
pub mod support;
