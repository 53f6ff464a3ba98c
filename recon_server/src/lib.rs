//! # Recon server
//! Runs the deposit-to-order linker on a timer and exposes a small read-only status surface.
//!
//! At startup the server opens (and if needed creates and migrates) the store, reports any claims left orphaned by an
//! earlier run, and starts the linker worker. The first cycle runs immediately; after that one cycle starts every poll
//! interval, and a tick that arrives while a cycle is still running is dropped.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/status`: Counters and the report of the last cycle, as JSON.

pub mod cli;
pub mod config;
pub mod errors;
pub mod linker_worker;
pub mod routes;
pub mod server;
pub mod single_flight;
