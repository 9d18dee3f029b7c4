use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    CourierAssigned,
    CourierReassigned,
    Accepted,
    Declined,
    StatusChanged,
    Cancelled,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub kind: OrderEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(order_id: Uuid, kind: OrderEventKind) -> Self {
        Self {
            order_id,
            kind,
            courier_email: None,
            status: None,
            at: Utc::now(),
        }
    }

    pub fn with_courier(mut self, email: impl Into<String>) -> Self {
        self.courier_email = Some(email.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}
