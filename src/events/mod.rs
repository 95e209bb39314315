use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle for publishing domain events onto the in-process channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event without failing the surrounding request.
    /// Event delivery is best-effort; a full channel degrades to a warning.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events emitted by the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),

    // Production events
    ProductionCompleted {
        production_id: Uuid,
        composite_item_id: Uuid,
        branch_id: Uuid,
        batch_count: i32,
    },

    // Vendor events
    VendorCreated(Uuid),
    VendorUpdated(Uuid),
    VendorDeleted(Uuid),

    // Purchase order events
    PurchaseOrderCreated(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PurchaseOrderReceived {
        purchase_order_id: Uuid,
        branch_id: Uuid,
        fully_received: bool,
    },

    // Transfer events
    TransferCreated(Uuid),
    TransferReceived(Uuid),
    TransferCancelled(Uuid),

    // Stock events
    StockAdjusted {
        item_id: Uuid,
        branch_id: Uuid,
        quantity_before: rust_decimal::Decimal,
        quantity_after: rust_decimal::Decimal,
        transaction_type: String,
    },
    StockLimitsUpdated {
        item_id: Uuid,
        branch_id: Uuid,
    },

    // Inventory count events
    InventoryCountCreated(Uuid),
    InventoryCountCompleted {
        count_id: Uuid,
        adjusted_lines: usize,
    },
    InventoryCountCancelled(Uuid),

    // User events
    UserCreated(Uuid),
    UserUpdated(Uuid),
    UserDeleted(Uuid),
    UserPasswordReset(Uuid),
}

impl Event {
    /// Short name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ItemCreated(_) => "item_created",
            Event::ItemUpdated(_) => "item_updated",
            Event::ItemDeleted(_) => "item_deleted",
            Event::ProductionCompleted { .. } => "production_completed",
            Event::VendorCreated(_) => "vendor_created",
            Event::VendorUpdated(_) => "vendor_updated",
            Event::VendorDeleted(_) => "vendor_deleted",
            Event::PurchaseOrderCreated(_) => "purchase_order_created",
            Event::PurchaseOrderStatusChanged { .. } => "purchase_order_status_changed",
            Event::PurchaseOrderReceived { .. } => "purchase_order_received",
            Event::TransferCreated(_) => "transfer_created",
            Event::TransferReceived(_) => "transfer_received",
            Event::TransferCancelled(_) => "transfer_cancelled",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::StockLimitsUpdated { .. } => "stock_limits_updated",
            Event::InventoryCountCreated(_) => "inventory_count_created",
            Event::InventoryCountCompleted { .. } => "inventory_count_completed",
            Event::InventoryCountCancelled(_) => "inventory_count_cancelled",
            Event::UserCreated(_) => "user_created",
            Event::UserUpdated(_) => "user_updated",
            Event::UserDeleted(_) => "user_deleted",
            Event::UserPasswordReset(_) => "user_password_reset",
        }
    }
}

/// Drains the event channel. Spawned once at startup; runs until every
/// sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        crate::metrics::EVENTS_PROCESSED
            .with_label_values(&[event.name()])
            .inc();
        debug!(event = event.name(), payload = ?event, "Processed domain event");
    }
    info!("Event processor stopped: all senders dropped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_is_best_effort_when_channel_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out to the caller
        sender.publish(Event::ItemCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::TransferCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");
        let received = rx.recv().await.expect("event expected");
        assert_eq!(received.name(), "transfer_created");
    }
}
