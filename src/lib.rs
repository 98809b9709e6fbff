pub mod config;
pub mod db;
pub mod history;
pub mod loader;
pub mod schema;
pub mod spotify;
