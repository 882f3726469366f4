pub mod backend;
pub mod bus;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod presentation;
pub mod surfaces;
pub mod tally;
