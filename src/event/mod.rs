mod events;
mod handlers;

pub use events::{EditorEvent, LayerEvent};
pub use handlers::{EventQueue, LoggingEventHandler, Subscribers};

pub trait EventHandler {
    fn handle_event(&mut self, event: &EditorEvent);
}
