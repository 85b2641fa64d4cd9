pub mod job;
pub mod slides;
