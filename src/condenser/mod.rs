pub mod chat;
pub mod config;
pub mod extract;
pub mod hide;
pub mod paths;
pub mod rules;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod worldinfo;
