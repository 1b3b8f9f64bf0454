pub mod access;
pub mod auth;
pub mod config;
pub mod health;
pub mod permission;
pub mod plan;
pub mod user;
