//! kiss-httpd - a deliberately tiny HTTP responder
//!
//! A single thread multiplexes a listening socket and its accepted
//! connections with a readiness wait. Requests for `/` get the configured
//! page (or a built-in one); everything else gets a 404 page.

pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod server;

pub use error::ServerError;
pub use server::Server;
