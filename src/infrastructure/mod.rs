// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod esios_client;
pub mod influx_repository;
pub mod memory_repository;
pub mod ree_client;
