pub mod api;
pub mod countries;
pub mod events;
pub mod models;
