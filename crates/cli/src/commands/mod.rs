pub mod cache;
pub mod convert;
