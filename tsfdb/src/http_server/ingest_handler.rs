//
// Copyright (c) tsfdb contributors
// See License.txt for details
use std::io::Read;

use eyre::{eyre, Result};
use log::warn;
use tiny_http::{Method, Request, Response};

use crate::db::Db;
use crate::http_server::{HttpHandler, HttpHandlerResult};

/// `POST /write` — body is a line-protocol batch. Parse failures on
/// individual lines are logged by the writer and do not fail the batch; a
/// store-level failure is surfaced as the mapped `{code, description}`
/// error envelope.
#[derive(Clone)]
pub struct IngestHandler {
    db: Db,
}

impl IngestHandler {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn handle_write(&self, request: &mut Request) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .map_err(|e| eyre!("reading write body: {e}"))?;

        match self.db.ingest(&body) {
            Ok(()) => Ok(Response::from_string("").with_status_code(204)),
            Err(e) => {
                warn!("ingest failed: {e}");
                let body = serde_json::json!({ "code": e.status_code(), "description": e.description() });
                Ok(Response::from_string(body.to_string())
                    .with_status_code(e.status_code() as u16))
            }
        }
    }
}

impl HttpHandler for IngestHandler {
    fn handle_request(&self, request: &mut Request) -> HttpHandlerResult {
        if request.url() != "/write" || *request.method() != Method::Post {
            return HttpHandlerResult::NotHandled;
        }
        match self.handle_write(request) {
            Ok(response) => HttpHandlerResult::Response(response.boxed()),
            Err(e) => HttpHandlerResult::Error(e.to_string()),
        }
    }
}
