pub mod loader;
pub mod network;

pub use loader::{LoadError, ModelLoader, load_model};
pub use network::LstmNetwork;
