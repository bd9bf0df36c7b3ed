//! Library crate for rostrum, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
mod dto;
mod error;
pub mod guild;
pub mod ids;
pub mod rating;
pub mod routes;
pub mod services;
pub mod state;
