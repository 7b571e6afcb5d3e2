//! A counter that lives in a single database row, served over HTTP

pub mod client;
pub mod config;
pub mod http;
pub mod model;
pub mod pool;
pub mod schema;
pub mod service;
pub mod store;
pub mod view;

pub type DbConnection = diesel::PgConnection;
