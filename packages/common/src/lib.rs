pub mod config;
pub mod preview;
pub mod storage;

pub use config::AvatarConfig;
