//! Client library for the poetri platform: credential lifecycle, the
//! authenticated request pipeline and the resource calls built on it.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod net;
pub mod resources;

pub use error::{ApiError, Error, Result};
