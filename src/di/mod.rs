mod injector;
mod provider;

pub use injector::{ControllerRef, Injector};
pub use provider::{Deps, Provider};
