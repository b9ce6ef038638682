pub mod config;
pub mod gateway;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
