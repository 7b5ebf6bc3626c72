//! Native HTTP server
//!
//! One request at a time on the receive loop, so `ApiState` needs no lock.

use std::io::Read;

use tiny_http::{Header, Request, Response, Server};

use crate::api::{ApiResponse, ApiState, Method};
use crate::error::StorageError;

/// Largest request body accepted (bytes)
const MAX_BODY: u64 = 1 << 20;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,OPTIONS,DELETE,POST"),
    ("Access-Control-Allow-Headers", "Content-Type, Accept, X-Requested-With"),
];

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Serve `state` on `addr` until the listener fails
pub fn run(addr: &str, mut state: ApiState) -> Result<(), StorageError> {
    let server = Server::http(addr)
        .map_err(|e| StorageError::Unavailable(format!("Failed to bind {}: {}", addr, e)))?;
    log::info!(
        "Lucky draw API listening on http://{} ({} participants)",
        addr,
        state.roster().len()
    );

    for request in server.incoming_requests() {
        serve(&mut state, request);
    }
    Ok(())
}

fn serve(state: &mut ApiState, mut request: Request) {
    let method = Method::parse(request.method().as_str());
    let url = request.url().to_string();

    let mut body = String::new();
    let read = request.as_reader().take(MAX_BODY).read_to_string(&mut body);
    let api = match read {
        Ok(_) => state.handle(method, &url, &body),
        Err(e) => {
            log::warn!("Unreadable body for {} {}: {}", request.method(), url, e);
            ApiResponse::error(400, format!("Unreadable body: {}", e))
        }
    };
    log::debug!("{} {} -> {}", request.method(), url, api.status);

    let mut response =
        Response::from_string(api.body_string()).with_status_code(api.status);
    if let Some(h) = header("Content-Type", api.content_type()) {
        response = response.with_header(h);
    }
    for (name, value) in CORS_HEADERS {
        if let Some(h) = header(name, value) {
            response = response.with_header(h);
        }
    }

    if let Err(e) = request.respond(response) {
        log::warn!("Failed to respond to {}: {}", url, e);
    }
}
