pub mod db;
pub mod dir;
pub mod errors;
pub mod memory;
pub mod snapshot;
pub mod tables;
