//! Read-only status surface of the linker.
//!
//! * `GET /health` answers as long as the HTTP server is up.
//! * `GET /status` returns the worker's [`LinkerStatus`] as JSON.
use std::sync::Mutex;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;

use crate::{errors::ServerError, linker_worker::LinkerStatus};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Status  ----------------------------------------------------
#[get("/status")]
pub async fn status(status: web::Data<Mutex<LinkerStatus>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received status request");
    let snapshot = status
        .lock()
        .map_err(|e| ServerError::BackendError(format!("Linker status is unavailable. {e}")))?
        .clone();
    Ok(HttpResponse::Ok().json(snapshot))
}
