pub mod avatar;
pub mod shared;
