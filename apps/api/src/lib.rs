pub mod accounts;
pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod models;
pub mod password;
pub mod provider;
pub mod routes;
pub mod state;
pub mod store;
