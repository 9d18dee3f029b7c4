use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::Courier;

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_ACCEPTED: &str = "Accepted";
pub const STATUS_DECLINED: &str = "Declined";

/// Order status as stored. Admins may write any text, so unknown values are
/// kept verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Declined,
    Custom(String),
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            STATUS_PENDING => OrderStatus::Pending,
            STATUS_ACCEPTED => OrderStatus::Accepted,
            STATUS_DECLINED => OrderStatus::Declined,
            _ => OrderStatus::Custom(raw),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => STATUS_PENDING.to_string(),
            OrderStatus::Accepted => STATUS_ACCEPTED.to_string(),
            OrderStatus::Declined => STATUS_DECLINED.to_string(),
            OrderStatus::Custom(raw) => raw,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => f.write_str(STATUS_PENDING),
            OrderStatus::Accepted => f.write_str(STATUS_ACCEPTED),
            OrderStatus::Declined => f.write_str(STATUS_DECLINED),
            OrderStatus::Custom(raw) => f.write_str(raw),
        }
    }
}

/// Courier identity copied onto an order. Either the whole block is present
/// or none of it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierAssignment {
    pub courier_id: Uuid,
    pub courier_email: String,
    pub courier_phone: String,
    pub courier_name: String,
}

impl From<&Courier> for CourierAssignment {
    fn from(courier: &Courier) -> Self {
        Self {
            courier_id: courier.id,
            courier_email: courier.email.clone(),
            courier_phone: courier.phone.clone(),
            courier_name: courier.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Unassigned,
    Assigned,
    Accepted,
    Declined,
    AdminOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub pickup_location: String,
    pub drop_off_location: String,
    pub package_details: String,
    pub delivery_time: String,
    pub status: OrderStatus,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub courier: Option<CourierAssignment>,
    #[serde(default)]
    pub reassigned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryOrder {
    pub fn new(user_id: Uuid, draft: OrderDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pickup_location: draft.pickup_location,
            drop_off_location: draft.drop_off_location,
            package_details: draft.package_details,
            delivery_time: draft.delivery_time,
            status: OrderStatus::Pending,
            user_id,
            courier: None,
            reassigned: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn courier_email(&self) -> Option<&str> {
        self.courier
            .as_ref()
            .map(|assignment| assignment.courier_email.as_str())
            .filter(|email| !email.is_empty())
    }

    pub fn is_assigned(&self) -> bool {
        self.courier_email().is_some()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        match &self.status {
            OrderStatus::Accepted => LifecycleState::Accepted,
            OrderStatus::Declined => LifecycleState::Declined,
            OrderStatus::Custom(_) => LifecycleState::AdminOverride,
            OrderStatus::Pending if self.is_assigned() => LifecycleState::Assigned,
            OrderStatus::Pending => LifecycleState::Unassigned,
        }
    }
}

/// Client-supplied order fields. Owner, status and courier fields are never
/// taken from the request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDraft {
    pub pickup_location: String,
    pub drop_off_location: String,
    pub package_details: String,
    pub delivery_time: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft {
            pickup_location: "Depot 4".to_string(),
            drop_off_location: "Harbour St 12".to_string(),
            package_details: "2 boxes".to_string(),
            delivery_time: "18:00".to_string(),
        }
    }

    #[test]
    fn unassigned_order_omits_courier_fields() {
        let order = DeliveryOrder::new(Uuid::new_v4(), draft());
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["status"], "Pending");
        assert_eq!(value["reassigned"], false);
        assert!(value.get("courierEmail").is_none());
        assert!(value.get("courierId").is_none());
        assert_eq!(value["userId"], order.user_id.to_string());
    }

    #[test]
    fn assigned_order_flattens_courier_fields() {
        let mut order = DeliveryOrder::new(Uuid::new_v4(), draft());
        let courier_id = Uuid::new_v4();
        order.courier = Some(CourierAssignment {
            courier_id,
            courier_email: "c@x.com".to_string(),
            courier_phone: "555".to_string(),
            courier_name: "Cara".to_string(),
        });

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["courierEmail"], "c@x.com");
        assert_eq!(value["courierId"], courier_id.to_string());
        assert_eq!(order.lifecycle_state(), LifecycleState::Assigned);
    }

    #[test]
    fn status_keeps_free_text() {
        let status: OrderStatus = serde_json::from_value(json!("Out for delivery")).unwrap();
        assert_eq!(status, OrderStatus::Custom("Out for delivery".to_string()));

        let accepted: OrderStatus = serde_json::from_value(json!("Accepted")).unwrap();
        assert_eq!(accepted, OrderStatus::Accepted);
    }

    #[test]
    fn lifecycle_state_follows_status() {
        let mut order = DeliveryOrder::new(Uuid::new_v4(), draft());
        assert_eq!(order.lifecycle_state(), LifecycleState::Unassigned);

        order.status = OrderStatus::Declined;
        assert_eq!(order.lifecycle_state(), LifecycleState::Declined);

        order.status = OrderStatus::Custom("Lost".to_string());
        assert_eq!(order.lifecycle_state(), LifecycleState::AdminOverride);
    }
}
