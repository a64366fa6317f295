pub mod calculator;
pub mod context;
pub mod cross_chain;
pub mod errors;
pub mod governance;
pub mod grade;
pub mod percentile;
pub mod reliability;
pub mod service;
pub mod sources;
