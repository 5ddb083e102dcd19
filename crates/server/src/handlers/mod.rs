//! Request handlers.

pub mod cache;
pub mod convert;
pub mod health;
pub mod pages;
