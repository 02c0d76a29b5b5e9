pub mod api;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod models;
pub mod schema;
pub mod state;
