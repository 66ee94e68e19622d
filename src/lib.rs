pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod policy;
pub mod projects;
pub mod state;
pub mod store;
pub mod tasks;
