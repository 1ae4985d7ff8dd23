pub mod artifact;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod prompt;
pub mod request;
pub mod response;
pub mod server;
pub mod tools;
pub mod video;
