pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hub;
pub mod model;
pub mod server;
pub mod service;
pub mod storage;
pub mod store;
pub mod token;
