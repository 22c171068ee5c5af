pub mod agents;
pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod templates;
