//! `GET /status` over the ESP-IDF HTTP server.
//!
//! Reads the shared [`StateStore`] on every request and answers with
//! [`status::render`]; the poll loop is never consulted.

use std::sync::Arc;

use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::{EspIOError, Write};
use esp_idf_svc::sys::EspError;
use log::info;

use crate::app::ports::StateStore;
use crate::status;

pub const STATUS_PATH: &str = "/status";

/// Start the server on `port` with the status route registered.
///
/// The returned server must be kept alive; dropping it stops listening.
pub fn serve<S>(port: u16, store: Arc<S>) -> Result<EspHttpServer<'static>, EspError>
where
    S: StateStore + Send + Sync + 'static,
{
    let mut server = EspHttpServer::new(&Configuration {
        http_port: port,
        ..Default::default()
    })?;

    server.fn_handler(STATUS_PATH, Method::Get, move |req| -> Result<(), EspIOError> {
        let (code, body) = status::render(status::query(store.as_ref()));
        let mut resp = req.into_response(code, None, &[("Content-Type", "application/json")])?;
        resp.write_all(body.as_bytes())?;
        Ok(())
    })?;

    info!("Status endpoint listening on :{}{}", port, STATUS_PATH);
    Ok(server)
}
