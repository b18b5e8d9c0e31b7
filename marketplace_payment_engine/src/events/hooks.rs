use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    SellerOnboardedEvent,
    TransferCreatedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub seller_onboarded_producer: Vec<EventProducer<SellerOnboardedEvent>>,
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub transfer_created_producer: Vec<EventProducer<TransferCreatedEvent>>,
}

impl EventProducers {
    /// Merges the producers of `other` into this set, so that several integrations can listen to the same events.
    pub fn extend(&mut self, other: EventProducers) {
        self.seller_onboarded_producer.extend(other.seller_onboarded_producer);
        self.order_created_producer.extend(other.order_created_producer);
        self.transfer_created_producer.extend(other.transfer_created_producer);
    }
}

pub struct EventHandlers {
    pub on_seller_onboarded: Option<EventHandler<SellerOnboardedEvent>>,
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_transfer_created: Option<EventHandler<TransferCreatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_seller_onboarded = hooks.on_seller_onboarded.map(|f| EventHandler::new(buffer_size, f));
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_transfer_created = hooks.on_transfer_created.map(|f| EventHandler::new(buffer_size, f));
        Self { on_seller_onboarded, on_order_created, on_transfer_created }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_seller_onboarded {
            result.seller_onboarded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transfer_created {
            result.transfer_created_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_seller_onboarded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transfer_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_seller_onboarded: Option<Handler<SellerOnboardedEvent>>,
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_transfer_created: Option<Handler<TransferCreatedEvent>>,
}

impl EventHooks {
    pub fn on_seller_onboarded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SellerOnboardedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_seller_onboarded = Some(Arc::new(f));
        self
    }

    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_transfer_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransferCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_transfer_created = Some(Arc::new(f));
        self
    }
}
