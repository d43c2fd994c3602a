pub mod bus;
pub mod event;

pub use bus::{AuthEventBus, Subscription};
pub use event::AuthEvent;
