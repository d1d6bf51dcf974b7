pub mod feeds;
pub mod specs;
