pub mod class_session;
pub mod club_session;
pub mod config;
pub mod fake_feed;
pub mod feed_api;
pub mod http_client;
pub mod model;
pub mod persist;
pub mod projection;
pub mod provider;
pub mod refresh;
pub mod state;
pub mod status;
