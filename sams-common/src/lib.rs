//! # SAMS Common Library
//!
//! Shared code for the School Attendance & Meal System:
//! - Database initialization and models
//! - Bootstrap configuration loading
//! - Common error type
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
