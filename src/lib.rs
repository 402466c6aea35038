pub mod clock;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod portal;
