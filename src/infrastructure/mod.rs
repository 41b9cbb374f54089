//! Infrastructure layer - Collaborator implementations and services

pub mod api_key;
pub mod audit;
pub mod auth;
pub mod logging;
pub mod observability;
pub mod secrets;
pub mod timeout;
