#[allow(clippy::module_inception)]
pub mod coordinator;
pub(crate) mod state;

pub use coordinator::RefreshCoordinator;
