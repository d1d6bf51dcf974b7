pub mod antibot;
pub mod identity_pool;
pub mod proxy_grabber;
