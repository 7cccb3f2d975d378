// Business logic services module

pub mod auth;
pub mod cache_manager;
pub mod email;
pub mod image_transformer;
pub mod media_storage;
pub mod qr;
pub mod rate_limiter;
pub mod roles;
pub mod transformations;
