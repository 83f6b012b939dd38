use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::config::poller_config::PollerConfig;
use crate::logger::init_logger;
use crate::services::poller_service::PollerService;
use crate::services::record_client::HttpRecordClient;
use crate::services::row_registry::RowRegistry;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = match PollerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Configuración inválida: {:?}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{:#}", e),
            ));
        }
    };
    log::info!(
        "Servicio de records en {} (intervalo {:?}, terminales {:?})",
        config.api_base_url,
        config.poll_interval,
        config.terminal_statuses
    );

    let client = HttpRecordClient::new(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;
    let poller = PollerService::new(Arc::new(client), RowRegistry::new(), &config);

    // Cada argumento de la línea de comandos es un doctor a enviar
    for doctor in std::env::args().skip(1) {
        if let Err(e) = poller.submit(&doctor).await {
            log::error!("No se pudo enviar '{}': {:#}", doctor, e);
        }
    }

    // Levantar servidor
    let bind = (config.bind_host.clone(), config.bind_port);
    log::info!("Levantando servidor en {}:{}", bind.0, bind.1);

    let poller_data = web::Data::new(poller.clone());
    let config_data = web::Data::new(config);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(poller_data.clone())
            .app_data(config_data.clone())
            .configure(app::init_app)
    })
    .workers(1)
    .bind(bind)?
    .run()
    .await;

    // El servidor ya paró (Ctrl+C): cortar las cadenas pendientes
    poller.shutdown().await;
    result
}
