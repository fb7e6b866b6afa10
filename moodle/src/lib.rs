pub mod api;
pub mod catalog;
pub mod client;
pub mod error;
pub mod models;
