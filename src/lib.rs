pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod mood;
pub mod pages;
pub mod tmdb;
pub mod watch;
