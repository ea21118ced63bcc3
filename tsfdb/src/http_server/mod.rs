//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! The daemon's HTTP surface: a chain of `HttpHandler`s tried in order
//! against each incoming request, dispatched onto a worker thread pool.
//!
//! Typically binds to 127.0.0.1 and only available locally.
//!
mod fetch_handler;
mod handler;
mod health_handler;
mod ingest_handler;
mod server;
mod utils;

pub use fetch_handler::FetchHandler;
pub use handler::{HttpHandler, HttpHandlerResult};
pub use health_handler::HealthHandler;
pub use ingest_handler::IngestHandler;
pub use server::HttpServer;

pub use utils::ConvenientHeader;
