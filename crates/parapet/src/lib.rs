//! Parapet serving layer.
//!
//! Wraps a [`parapet_core::Pipeline`] with route resolution and error
//! pages ([`App`]) and exposes it over HTTP/1 ([`serve`]).

pub mod app;
pub mod server;

pub use app::{App, ResolvedRoute, RouteResolver};
pub use server::{handle_http, serve, serve_listener, ServerError};
