pub mod catalog;
pub mod controller;
pub mod error;
pub mod exercise;
pub mod identity;
pub mod models;
pub mod nutrition;
pub mod service;
pub mod store;

pub use error::{Error, Result};
