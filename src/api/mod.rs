// HTTP surface for the supply-catalog service.
// Thin plumbing around the import pipeline and the catalog store.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
