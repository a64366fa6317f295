pub mod catalog;
pub mod criterion;
pub mod env;
pub mod errors;
pub mod grades;
