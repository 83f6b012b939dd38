//! handlers/record_handler.rs
//! Página con la tabla de records y API JSON local sobre el `PollerService`.

use actix_web::{http::header, web, HttpResponse};
use serde_json::json;

use crate::config::poller_config::PollerConfig;
use crate::models::record_model::{CreateRecordRequest, SubmitResponse};
use crate::services::poller_service::PollerService;
use crate::services::row_registry::escape_html;

/// GET /
/// Un botón por doctor + la tabla de records (se refresca sola cada 2 s).
pub async fn index_page(
    poller: web::Data<PollerService>,
    config: web::Data<PollerConfig>,
) -> HttpResponse {
    let buttons: String = config
        .doctors
        .iter()
        .map(|doctor| {
            let doctor = escape_html(doctor);
            format!(
                "<form method=\"post\" action=\"/submit\" style=\"display:inline\">\
                 <input type=\"hidden\" name=\"doctor\" value=\"{d}\">\
                 <button type=\"submit\">{d}</button></form>\n",
                d = doctor
            )
        })
        .collect();

    let rows = poller.registry().render_html().await;
    let refresh_secs = config.poll_interval.as_secs().max(1);

    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{refresh}\">\n<title>Records</title>\n</head>\n<body>\n\
         {buttons}\
         <table>\n<thead><tr><th>record_id</th><th>doctor</th><th>status</th></tr></thead>\n\
         <tbody id=\"records\">\n{rows}</tbody>\n</table>\n</body>\n</html>\n",
        refresh = refresh_secs,
        buttons = buttons,
        rows = rows
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// POST /submit (formulario de la página principal)
pub async fn submit_form(
    poller: web::Data<PollerService>,
    form: web::Form<CreateRecordRequest>,
) -> HttpResponse {
    let doctor = form.into_inner().doctor;

    match poller.submit(&doctor).await {
        Ok(_) => HttpResponse::SeeOther()
            .append_header((header::LOCATION, "/"))
            .finish(),
        Err(e) => HttpResponse::BadGateway()
            .content_type("text/plain; charset=utf-8")
            .body(format!("No se pudo crear el record: {}", e)),
    }
}

/// POST /api/records
pub async fn submit_record_endpoint(
    poller: web::Data<PollerService>,
    body: web::Json<CreateRecordRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    match poller.submit(&req.doctor).await {
        Ok(record_id) => HttpResponse::Ok().json(SubmitResponse {
            success: true,
            record_id,
            message: "Record creado, siguiendo su estado".to_string(),
        }),
        Err(e) => HttpResponse::BadGateway().json(json!({
            "success": false,
            "error": format!("{:#}", e)
        })),
    }
}

/// GET /api/records
pub async fn list_records_endpoint(poller: web::Data<PollerService>) -> HttpResponse {
    HttpResponse::Ok().json(poller.registry().rows().await)
}

/// GET /api/records/{id}
pub async fn get_record_endpoint(
    poller: web::Data<PollerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = path.into_inner();

    match poller.registry().get(&record_id).await {
        Some(row) => HttpResponse::Ok().json(row),
        None => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": format!("No hay fila para record_id={}", record_id)
        })),
    }
}

/// POST /api/records/{id}/poll
/// Retoma la observación de un record (no duplica la fila).
pub async fn resume_polling_endpoint(
    poller: web::Data<PollerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = path.into_inner();
    let started = poller.poll_status(&record_id).await;

    HttpResponse::Ok().json(json!({
        "record_id": record_id,
        "started": started
    }))
}

/// DELETE /api/records/{id}/poll
pub async fn cancel_polling_endpoint(
    poller: web::Data<PollerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = path.into_inner();
    let cancelled = poller.cancel(&record_id).await;

    HttpResponse::Ok().json(json!({
        "record_id": record_id,
        "cancelled": cancelled
    }))
}

/// GET /api/chains
pub async fn active_chains_endpoint(poller: web::Data<PollerService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "active": poller.active_chains().await,
        "rows": poller.registry().len().await
    }))
}
