pub mod avatar;
pub mod upload_lock;
