//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /cache/:group/:id` - Store a JSON value
//! - `GET /cache/:group/:id` - Retrieve a value
//! - `DELETE /cache/:group/:id` - Delete a value
//! - `POST /cache/:group/:id/incr` - Increment a counter
//! - `POST /cache/:group/:id/decr` - Decrement a counter
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint
//!
//! The tenant is taken from the `x-tenant-id` header. Cache endpoints accept
//! `?debug=true` to attach the request's statistics to the response.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
