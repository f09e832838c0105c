use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, MatchesReadyEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub matches_ready_producer: Vec<EventProducer<MatchesReadyEvent>>,
}

impl EventProducers {
    /// Fans the event out to every registered subscriber.
    pub async fn publish_matches_ready(&self, event: MatchesReadyEvent) {
        for producer in &self.matches_ready_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_matches_ready: Option<EventHandler<MatchesReadyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_matches_ready = hooks.on_matches_ready.map(|f| EventHandler::new(buffer_size, f));
        Self { on_matches_ready }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_matches_ready {
            result.matches_ready_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_matches_ready {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_matches_ready: Option<Handler<MatchesReadyEvent>>,
}

impl EventHooks {
    pub fn on_matches_ready<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MatchesReadyEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_matches_ready = Some(Arc::new(f));
        self
    }
}
