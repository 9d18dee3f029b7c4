//! Order lifecycle state machine.
//!
//! Every transition resolves the referenced courier and order, runs the
//! authorization check, then applies a single conditional write. The
//! precondition (already assigned, not yet assigned, already accepted) is
//! evaluated by the repository in the same step as the write, so two
//! concurrent assigns cannot both succeed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{bounded, parse_user_id};
use crate::error::AppError;
use crate::models::courier::Courier;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::order::{CourierAssignment, DeliveryOrder, OrderDraft, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::security::authorization::{Action, Actor, Authorizer};
use crate::store::{ConditionalUpdate, IdentityStore, OrderRepository};

#[derive(Clone)]
pub struct OrderLifecycle {
    orders: Arc<dyn OrderRepository>,
    identities: Arc<dyn IdentityStore>,
    authorizer: Arc<dyn Authorizer>,
    events_tx: broadcast::Sender<OrderEvent>,
    metrics: Metrics,
    store_timeout: Duration,
}

impl OrderLifecycle {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        identities: Arc<dyn IdentityStore>,
        authorizer: Arc<dyn Authorizer>,
        events_tx: broadcast::Sender<OrderEvent>,
        metrics: Metrics,
        store_timeout: Duration,
    ) -> Self {
        Self {
            orders,
            identities,
            authorizer,
            events_tx,
            metrics,
            store_timeout,
        }
    }

    /// Creates an order owned by the caller named in the identity header.
    pub async fn create(
        &self,
        user_id_header: Option<&str>,
        draft: OrderDraft,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.create_inner(user_id_header, draft).await;
        self.metrics.observe("create", started, &result);
        result
    }

    async fn create_inner(
        &self,
        user_id_header: Option<&str>,
        draft: OrderDraft,
    ) -> Result<DeliveryOrder, AppError> {
        let user_id = parse_user_id(user_id_header)?;
        let order = DeliveryOrder::new(user_id, draft);

        bounded(self.store_timeout, self.orders.insert(order.clone())).await?;

        info!(order_id = %order.id, user_id = %user_id, "order created");
        self.publish(OrderEvent::new(order.id, OrderEventKind::Created));
        Ok(order)
    }

    pub async fn get(&self, order_id: Uuid) -> Result<DeliveryOrder, AppError> {
        self.load_order(order_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<DeliveryOrder>, AppError> {
        bounded(self.store_timeout, self.orders.list_all()).await
    }

    /// Orders whose assignment points at the courier with this email.
    pub async fn orders_for_courier(&self, email: &str) -> Result<Vec<DeliveryOrder>, AppError> {
        if email.is_empty() {
            return Err(AppError::Validation(
                "Courier email is required".to_string(),
            ));
        }

        let courier = self.load_courier(email).await?;
        bounded(self.store_timeout, self.orders.list_by_courier(courier.id)).await
    }

    /// First-time assignment. Fails with `Conflict` once a courier is set.
    pub async fn assign_courier(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.assign_inner(actor, order_id, courier_email).await;
        self.metrics.observe("assign", started, &result);
        result
    }

    async fn assign_inner(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let courier = self.load_courier(courier_email).await?;
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, Action::Assign, &order)?;

        let update = bounded(
            self.store_timeout,
            self.orders
                .assign_if_unassigned(order_id, CourierAssignment::from(&courier)),
        )
        .await?;

        let order = match update {
            ConditionalUpdate::Applied(order) => order,
            ConditionalUpdate::Missing => return Err(order_not_found(order_id)),
            ConditionalUpdate::Rejected(current) => {
                warn!(
                    order_id = %order_id,
                    assigned_to = current.courier_email().unwrap_or_default(),
                    "assign rejected: order already has a courier"
                );
                return Err(AppError::Conflict(
                    "Order is already assigned to a courier".to_string(),
                ));
            }
        };

        info!(order_id = %order_id, courier_email = %courier.email, "courier assigned");
        self.publish(
            OrderEvent::new(order_id, OrderEventKind::CourierAssigned).with_courier(&courier.email),
        );
        Ok(order)
    }

    /// Replaces an existing assignment. Fails with `Conflict` when the order
    /// was never assigned.
    pub async fn reassign_courier(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.reassign_inner(actor, order_id, courier_email).await;
        self.metrics.observe("reassign", started, &result);
        result
    }

    async fn reassign_inner(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let courier = self.load_courier(courier_email).await?;
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, Action::Reassign, &order)?;

        let update = bounded(
            self.store_timeout,
            self.orders
                .reassign_if_assigned(order_id, CourierAssignment::from(&courier)),
        )
        .await?;

        let order = match update {
            ConditionalUpdate::Applied(order) => order,
            ConditionalUpdate::Missing => return Err(order_not_found(order_id)),
            ConditionalUpdate::Rejected(_) => {
                warn!(order_id = %order_id, "reassign rejected: order has no courier yet");
                return Err(AppError::Conflict(
                    "Order has not been assigned to a courier yet".to_string(),
                ));
            }
        };

        info!(order_id = %order_id, courier_email = %courier.email, "courier reassigned");
        self.publish(
            OrderEvent::new(order_id, OrderEventKind::CourierReassigned)
                .with_courier(&courier.email),
        );
        Ok(order)
    }

    /// Courier takes the order. Any courier may accept under the permissive
    /// policy; a second accept is a `Conflict`.
    pub async fn accept(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.accept_inner(actor, order_id, courier_email).await;
        self.metrics.observe("accept", started, &result);
        result
    }

    async fn accept_inner(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let courier = self.load_courier(courier_email).await?;
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, Action::Accept, &order)?;

        let update = bounded(
            self.store_timeout,
            self.orders
                .accept_if_not_accepted(order_id, CourierAssignment::from(&courier)),
        )
        .await?;

        let order = match update {
            ConditionalUpdate::Applied(order) => order,
            ConditionalUpdate::Missing => return Err(order_not_found(order_id)),
            ConditionalUpdate::Rejected(_) => {
                warn!(order_id = %order_id, courier_email = %courier.email, "order already accepted");
                return Err(AppError::Conflict("Order is already accepted".to_string()));
            }
        };

        info!(order_id = %order_id, courier_email = %courier.email, "order accepted");
        self.publish(OrderEvent::new(order_id, OrderEventKind::Accepted).with_courier(&courier.email));
        Ok(order)
    }

    /// Marks the order declined regardless of its current status.
    pub async fn decline(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.decline_inner(actor, order_id, courier_email).await;
        self.metrics.observe("decline", started, &result);
        result
    }

    async fn decline_inner(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_email: &str,
    ) -> Result<DeliveryOrder, AppError> {
        let courier = self.load_courier(courier_email).await?;
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, Action::Decline, &order)?;

        let order = bounded(
            self.store_timeout,
            self.orders.set_status(order_id, OrderStatus::Declined),
        )
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

        info!(order_id = %order_id, courier_email = %courier.email, "order declined");
        self.publish(OrderEvent::new(order_id, OrderEventKind::Declined).with_courier(&courier.email));
        Ok(order)
    }

    /// Admin escape hatch: writes any status text over any prior status.
    pub async fn set_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        status: String,
    ) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self.set_status_inner(actor, order_id, status).await;
        self.metrics.observe("set_status", started, &result);
        result
    }

    async fn set_status_inner(
        &self,
        actor: &Actor,
        order_id: Uuid,
        status: String,
    ) -> Result<DeliveryOrder, AppError> {
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, Action::SetStatus, &order)?;

        let status = OrderStatus::from(status);
        let order = bounded(
            self.store_timeout,
            self.orders.set_status(order_id, status.clone()),
        )
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

        info!(order_id = %order_id, status = %status, "order status updated");
        self.publish(
            OrderEvent::new(order_id, OrderEventKind::StatusChanged).with_status(status.to_string()),
        );
        Ok(order)
    }

    /// User-initiated removal.
    pub async fn cancel(&self, actor: &Actor, order_id: Uuid) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self
            .remove(actor, order_id, Action::Cancel, OrderEventKind::Cancelled)
            .await;
        self.metrics.observe("cancel", started, &result);
        result
    }

    /// Admin removal. Same semantics as `cancel` behind a separate capability.
    pub async fn delete(&self, actor: &Actor, order_id: Uuid) -> Result<DeliveryOrder, AppError> {
        let started = Instant::now();
        let result = self
            .remove(actor, order_id, Action::Delete, OrderEventKind::Deleted)
            .await;
        self.metrics.observe("delete", started, &result);
        result
    }

    async fn remove(
        &self,
        actor: &Actor,
        order_id: Uuid,
        action: Action,
        kind: OrderEventKind,
    ) -> Result<DeliveryOrder, AppError> {
        let order = self.load_order(order_id).await?;
        self.authorizer.authorize(actor, action, &order)?;

        let removed = bounded(self.store_timeout, self.orders.delete(order_id))
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        info!(order_id = %order_id, action = %action, "order removed");
        self.publish(OrderEvent::new(order_id, kind));
        Ok(removed)
    }

    async fn load_order(&self, order_id: Uuid) -> Result<DeliveryOrder, AppError> {
        bounded(self.store_timeout, self.orders.get(order_id))
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    async fn load_courier(&self, email: &str) -> Result<Courier, AppError> {
        bounded(self.store_timeout, self.identities.find_courier_by_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("Courier not found".to_string()))
    }

    fn publish(&self, event: OrderEvent) {
        // No subscribers is the normal case.
        let _ = self.events_tx.send(event);
    }
}

fn order_not_found(order_id: Uuid) -> AppError {
    AppError::NotFound(format!("Order {order_id} not found"))
}
