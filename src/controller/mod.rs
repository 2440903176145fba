//! HTTP controllers: JSON under `/api`, HTML pages at the root.

pub mod api;
pub mod dashboard;
