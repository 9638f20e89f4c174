pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod http;
pub mod notify;
pub mod oauth;
pub mod registrar;
pub mod state;
pub mod types;
pub mod webhook;
