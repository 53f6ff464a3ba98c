use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CycleCompletedEvent, DepositLinkedEvent, EventHandler, EventProducer, Handler, OrphanedClaimEvent};

/// The publishing ends handed to the matcher. An empty set of producers publishes nothing.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub deposit_linked_producer: Vec<EventProducer<DepositLinkedEvent>>,
    pub orphaned_claim_producer: Vec<EventProducer<OrphanedClaimEvent>>,
    pub cycle_completed_producer: Vec<EventProducer<CycleCompletedEvent>>,
}

pub struct EventHandlers {
    pub on_deposit_linked: Option<EventHandler<DepositLinkedEvent>>,
    pub on_orphaned_claim: Option<EventHandler<OrphanedClaimEvent>>,
    pub on_cycle_completed: Option<EventHandler<CycleCompletedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_deposit_linked = hooks.on_deposit_linked.map(|f| EventHandler::new(buffer_size, f));
        let on_orphaned_claim = hooks.on_orphaned_claim.map(|f| EventHandler::new(buffer_size, f));
        let on_cycle_completed = hooks.on_cycle_completed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_deposit_linked, on_orphaned_claim, on_cycle_completed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_deposit_linked {
            result.deposit_linked_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_orphaned_claim {
            result.orphaned_claim_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_cycle_completed {
            result.cycle_completed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured handler. Each task ends once every producer for its event type has been dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_deposit_linked {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_orphaned_claim {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_cycle_completed {
            tokio::spawn(handler.start_handler());
        }
    }
}

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_deposit_linked: Option<Handler<DepositLinkedEvent>>,
    pub on_orphaned_claim: Option<Handler<OrphanedClaimEvent>>,
    pub on_cycle_completed: Option<Handler<CycleCompletedEvent>>,
}

impl EventHooks {
    pub fn on_deposit_linked<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DepositLinkedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_deposit_linked = Some(Arc::new(f));
        self
    }

    pub fn on_orphaned_claim<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrphanedClaimEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_orphaned_claim = Some(Arc::new(f));
        self
    }

    pub fn on_cycle_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CycleCompletedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_cycle_completed = Some(Arc::new(f));
        self
    }
}
