//
// Copyright (c) tsfdb contributors
// See License.txt for details
use eyre::{eyre, Result};
use tiny_http::{Header, Method, Request, Response};

use crate::db::Db;
use crate::http_server::{ConvenientHeader, HttpHandler, HttpHandlerResult};

/// `GET /fetch?path=...&start=...&stop=...&step=...` — runs a range query
/// and responds with the `resource.metric -> [[value, unix_seconds], ...]`
/// JSON mapping.
#[derive(Clone)]
pub struct FetchHandler {
    db: Db,
}

impl FetchHandler {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn handle_fetch(&self, request: &Request) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
        let params = query_params(request.url());
        let path = params.get("path").cloned().unwrap_or_default();
        let start = params.get("start").cloned().unwrap_or_default();
        let stop = params.get("stop").cloned().unwrap_or_default();
        let step = params.get("step").cloned().unwrap_or_default();

        if path.is_empty() {
            return Ok(error_response(400, "missing required \"path\" parameter"));
        }

        match self.db.fetch(&path, &start, &stop, &step) {
            Ok(series) => {
                let body = serde_json::to_string(&series).map_err(|e| eyre!("serializing response: {e}"))?;
                Ok(Response::from_string(body).with_header(Header::from_strings("Content-Type", "application/json")?))
            }
            Err(e) => Ok(error_response(e.status_code(), &e.description())),
        }
    }
}

fn error_response(code: u16, description: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "code": code, "description": description });
    Response::from_string(body.to_string()).with_status_code(code)
}

/// The request path's query string, split into a flat `key -> value` map.
/// `path` values are URL-decoded minimally (`+`/`%XX` are left as-is — the
/// core only needs literal metric names and ISO/relative time expressions,
/// neither of which rely on those encodings in practice).
fn query_params(url: &str) -> std::collections::HashMap<String, String> {
    let mut out = std::collections::HashMap::new();
    let Some((_, query)) = url.split_once('?') else { return out };
    for pair in query.split('&') {
        if let Some((k, v)) = pair.split_once('=') {
            out.insert(k.to_string(), v.to_string());
        }
    }
    out
}

impl HttpHandler for FetchHandler {
    fn handle_request(&self, request: &mut Request) -> HttpHandlerResult {
        if !request.url().starts_with("/fetch") || *request.method() != Method::Get {
            return HttpHandlerResult::NotHandled;
        }
        match self.handle_fetch(request) {
            Ok(response) => HttpHandlerResult::Response(response.boxed()),
            Err(e) => HttpHandlerResult::Error(e.to_string()),
        }
    }
}
