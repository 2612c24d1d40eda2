pub mod app;
pub mod auth;
pub mod cli;
pub mod clients;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;
