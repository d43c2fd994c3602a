use tokio::sync::broadcast::{self, Sender};

use crate::events::event::AuthEvent;


const BUFFER_SIZE: usize = 50;
pub fn run() -> Sender<AuthEvent> {
    let (event_sender, _) = broadcast::channel(BUFFER_SIZE);
    event_sender
}
