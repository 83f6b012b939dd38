//! app.rs
use crate::handlers::record_handler;
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(record_handler::index_page))
        .route("/submit", web::post().to(record_handler::submit_form))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/records")
                        .route(
                            "",
                            web::post().to(record_handler::submit_record_endpoint),
                        )
                        .route("", web::get().to(record_handler::list_records_endpoint))
                        .route(
                            "/{id}",
                            web::get().to(record_handler::get_record_endpoint),
                        )
                        .route(
                            "/{id}/poll",
                            web::post().to(record_handler::resume_polling_endpoint),
                        )
                        .route(
                            "/{id}/poll",
                            web::delete().to(record_handler::cancel_polling_endpoint),
                        ),
                )
                .route(
                    "/chains",
                    web::get().to(record_handler::active_chains_endpoint),
                ),
        );
}
