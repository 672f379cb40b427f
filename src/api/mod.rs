//! HTTP page handlers

mod pages;

pub use pages::pages_router;
