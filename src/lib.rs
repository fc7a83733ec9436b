//! Hybrid collaborative-filtering movie recommendations over HTTP

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
