pub mod controller;
pub mod machine;
pub mod safety;
pub mod state;
pub mod system;
pub mod types;

pub use controller::*;
pub use state::*;
pub use types::*;
