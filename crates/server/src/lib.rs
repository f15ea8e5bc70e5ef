//! HTTP surface for the degree audit service.

pub mod api;
pub mod state;
