// Library exports for joinfutbol
// Integration tests drive the router through these modules

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod ledger;
pub mod routes;
pub mod state;
