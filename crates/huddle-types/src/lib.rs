pub mod message;
pub mod session;
pub mod credential;
pub mod exchange;
pub mod event;
pub mod config;
pub mod error;


pub use error::HuddleError;
pub type Result<T> = std::result::Result<T, HuddleError>;
