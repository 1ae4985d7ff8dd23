pub mod prompt;
pub mod video;
