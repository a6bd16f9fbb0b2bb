pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod parser;
pub mod web;
