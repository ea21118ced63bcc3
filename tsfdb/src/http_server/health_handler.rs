//
// Copyright (c) tsfdb contributors
// See License.txt for details
use tiny_http::{Method, Request, Response};

use crate::http_server::{HttpHandler, HttpHandlerResult};

/// `GET /health` — liveness probe. Always `200` once the process has a
/// `Db` to hand the handler, since opening the `sled` store is what would
/// have failed at startup otherwise.
#[derive(Clone, Default)]
pub struct HealthHandler;

impl HttpHandler for HealthHandler {
    fn handle_request(&self, request: &mut Request) -> HttpHandlerResult {
        if request.url() != "/health" || *request.method() != Method::Get {
            return HttpHandlerResult::NotHandled;
        }
        HttpHandlerResult::Response(Response::from_string("ok").boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_http::TestRequest;

    #[test]
    fn responds_ok_to_health_checks() {
        let handler = HealthHandler;
        let r = TestRequest::new().with_method(Method::Get).with_path("/health");
        assert!(matches!(handler.handle_request(&mut r.into()), HttpHandlerResult::Response(_)));
    }

    #[test]
    fn ignores_other_paths() {
        let handler = HealthHandler;
        let r = TestRequest::new().with_method(Method::Get).with_path("/write");
        assert!(matches!(handler.handle_request(&mut r.into()), HttpHandlerResult::NotHandled));
    }
}
