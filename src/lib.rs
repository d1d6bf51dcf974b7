pub mod core;
pub mod features;
pub mod scraping;
pub mod server;
pub mod tools;

// --- Primary core exports ---
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::ScoutContext;

// --- Short module paths ---
pub use features::{antibot, identity_pool, proxy_grabber};
pub use scraping::{feed, spec_extractor, transport};
pub use tools::{feeds, specs};
