pub mod manager;
pub mod processor;

pub use manager::{ActiveManager, Manager};
