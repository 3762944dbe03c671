pub mod adapter;
pub mod auth;
pub mod client;
pub mod command;
pub mod config;
pub mod protocol;
pub mod server;
pub mod session;
