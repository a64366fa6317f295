pub mod cli;
pub mod networks;
