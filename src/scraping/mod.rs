pub mod feed;
pub mod spec_extractor;
pub mod transport;
