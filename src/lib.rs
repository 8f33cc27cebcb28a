#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::cargo)]

pub mod common;
pub mod config;
pub mod dataset;
pub mod loader;
pub mod migration;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;
