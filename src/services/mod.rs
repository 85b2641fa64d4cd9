pub mod batch;
pub mod generation;
pub mod output;
pub mod pool;
