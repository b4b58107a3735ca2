use std::collections::HashMap;

use crate::outbox::event::{DomainEvent, Event};

// ============================================================================
// In-Process Event Bus
// ============================================================================
//
// Synchronous fan-out to handlers registered per message type. Handlers run
// in registration order on the caller's task; the first failing handler
// stops dispatch and its error is returned to the caller, which keeps the
// outbox message pending.
//
// ============================================================================

type Handler = Box<dyn Fn(&dyn Event) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Handler #{index} for {message_type} failed: {source}")]
    HandlerFailed {
        message_type: &'static str,
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Event {0} could not be downcast to its registered type")]
    TypeMismatch(&'static str),
}

#[derive(Default)]
pub struct InProcessEventBus {
    handlers: HashMap<&'static str, Vec<Handler>>,
}

impl InProcessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: DomainEvent,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let message_type = E::event_type();
        let erased: Handler = Box::new(move |event: &dyn Event| {
            let event = event
                .as_any()
                .downcast_ref::<E>()
                .ok_or(DispatchError::TypeMismatch(message_type))?;
            handler(event)
        });

        self.handlers.entry(message_type).or_default().push(erased);
        tracing::debug!(message_type = message_type, "Subscribed event handler");
        self
    }

    pub fn handler_count(&self, message_type: &str) -> usize {
        self.handlers.get(message_type).map_or(0, Vec::len)
    }

    /// Invoke every handler for the event's type. Returns how many ran.
    pub fn publish(&self, event: &dyn Event) -> Result<usize, DispatchError> {
        let message_type = event.message_type();
        let Some(handlers) = self.handlers.get(message_type) else {
            tracing::debug!(message_type = message_type, "No handlers subscribed, event dropped");
            return Ok(0);
        };

        for (index, handler) in handlers.iter().enumerate() {
            handler(event).map_err(|source| {
                match source.downcast::<DispatchError>() {
                    Ok(mismatch) => mismatch,
                    Err(source) => DispatchError::HandlerFailed {
                        message_type,
                        index,
                        source,
                    },
                }
            })?;
        }

        Ok(handlers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::event::fixtures::{Pinged, Ponged};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_handlers_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut bus = InProcessEventBus::new();

        let first = calls.clone();
        let second = calls.clone();
        bus.subscribe::<Pinged, _>(move |event| {
            first.lock().unwrap().push(("first", event.sequence));
            Ok(())
        })
        .subscribe::<Pinged, _>(move |event| {
            second.lock().unwrap().push(("second", event.sequence));
            Ok(())
        });

        let handled = bus.publish(&Pinged::new(9)).unwrap();

        assert_eq!(handled, 2);
        assert_eq!(*calls.lock().unwrap(), vec![("first", 9), ("second", 9)]);
    }

    #[test]
    fn test_only_matching_handlers_run() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = InProcessEventBus::new();

        let counter = calls.clone();
        bus.subscribe::<Ponged, _>(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        assert_eq!(bus.publish(&Pinged::new(1)).unwrap(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(bus.handler_count("test.Ponged"), 1);
    }

    #[test]
    fn test_first_failure_stops_dispatch() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = InProcessEventBus::new();

        let after = calls.clone();
        bus.subscribe::<Pinged, _>(|_| Err(anyhow::anyhow!("mailer unavailable")))
            .subscribe::<Pinged, _>(move |_| {
                *after.lock().unwrap() += 1;
                Ok(())
            });

        let result = bus.publish(&Pinged::new(1));

        assert!(matches!(result, Err(DispatchError::HandlerFailed { index: 0, .. })));
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
