// Application layer - Use cases and the ports they depend on
pub mod errors;
pub mod price_repository;
pub mod price_service;
pub mod price_source;
pub mod sync_service;
