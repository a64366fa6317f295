pub mod chain_map;
pub mod node;
pub mod producer;
pub mod proposal;
pub mod score;
pub mod subject;
pub mod version;
pub mod votes;
pub mod window;
