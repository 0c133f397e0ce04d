//! API Module
//!
//! HTTP handlers and routing for the tiered cache server.
//!
//! # Endpoints
//! - `PUT /set` - Store a value in the selected tiers
//! - `GET /get/:key?tier=` - Retrieve a value
//! - `DELETE /del/:key?tier=` - Delete a key
//! - `POST /clear?tier=` - Clear the selected tiers
//! - `POST /cleanup` - Purge expired entries now
//! - `GET /stats` - Statistics of both tiers
//! - `GET /entries` - Memory tier entry metadata
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
