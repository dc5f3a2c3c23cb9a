pub mod auth;
pub mod calendar;
pub mod client;
pub mod config;
pub mod consumption;
pub mod error;
pub mod firestore;
pub mod food_search;
pub mod goals;
pub mod models;
pub mod profile;
pub mod progress;
pub mod store;
