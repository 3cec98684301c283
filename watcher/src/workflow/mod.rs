pub mod bulletin;
pub mod config;
pub mod entity_db;
pub mod replay;
pub mod runner;
pub mod workers;
