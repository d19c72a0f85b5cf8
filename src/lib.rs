pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
