use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{EditorEvent, EventHandler};

/// Handlers an editor notifies, in subscription order.
///
/// Owned by the editor, so notifying needs `&mut` and a handler can never
/// re-enter the list it is called from.
#[derive(Default)]
pub struct Subscribers {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscribers(<{} handlers>)", self.handlers.len())
    }
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn notify(&mut self, event: EditorEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(&event);
        }
    }
}

/// Writes every event to the debug log
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &EditorEvent) {
        log::debug!("editor event: {event:?}");
    }
}

/// Collects events into a shared queue the owner drains once per frame
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<Vec<EditorEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler feeding this queue, for [`Subscribers::add`]
    pub fn handler(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }

    /// Take every event received so far
    pub fn drain(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventHandler for EventQueue {
    fn handle_event(&mut self, event: &EditorEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn test_queue_receives_notified_events() {
        let mut subscribers = Subscribers::new();
        let queue = EventQueue::new();
        subscribers.add(queue.handler());
        subscribers.add(Box::new(LoggingEventHandler));
        assert_eq!(subscribers.len(), 2);

        subscribers.notify(EditorEvent::ShapeSnapped { kind: ShapeKind::Line });
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(), vec![EditorEvent::ShapeSnapped { kind: ShapeKind::Line }]);
        assert!(queue.is_empty());
    }
}
