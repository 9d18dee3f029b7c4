use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::models::order::{CourierAssignment, DeliveryOrder, OrderStatus};
use crate::models::user::User;
use crate::store::{ConditionalUpdate, IdentityStore, OrderRepository, StoreError};

/// In-process backend. Conditional updates hold the entry's shard lock for
/// the whole check-and-write.
#[derive(Default)]
pub struct MemoryStore {
    orders: DashMap<Uuid, DeliveryOrder>,
    users: DashMap<Uuid, User>,
    user_emails: DashMap<String, Uuid>,
    couriers: DashMap<Uuid, Courier>,
    courier_emails: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_if<P, M>(&self, id: Uuid, precondition: P, mutate: M) -> ConditionalUpdate
    where
        P: FnOnce(&DeliveryOrder) -> bool,
        M: FnOnce(&mut DeliveryOrder),
    {
        let Some(mut order) = self.orders.get_mut(&id) else {
            return ConditionalUpdate::Missing;
        };

        if !precondition(order.value()) {
            return ConditionalUpdate::Rejected(order.value().clone());
        }

        mutate(order.value_mut());
        order.updated_at = Utc::now();
        ConditionalUpdate::Applied(order.value().clone())
    }

    fn collect_orders<F>(&self, filter: F) -> Vec<DeliveryOrder>
    where
        F: Fn(&DeliveryOrder) -> bool,
    {
        let mut orders: Vec<DeliveryOrder> = self
            .orders
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: DeliveryOrder) -> Result<(), StoreError> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("order {}", order.id))),
            Entry::Vacant(slot) => {
                slot.insert(order);
                Ok(())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DeliveryOrder>, StoreError> {
        Ok(self.collect_orders(|order| order.user_id == user_id))
    }

    async fn list_by_courier(&self, courier_id: Uuid) -> Result<Vec<DeliveryOrder>, StoreError> {
        Ok(self.collect_orders(|order| {
            order
                .courier
                .as_ref()
                .is_some_and(|assignment| assignment.courier_id == courier_id)
        }))
    }

    async fn list_all(&self) -> Result<Vec<DeliveryOrder>, StoreError> {
        Ok(self.collect_orders(|_| true))
    }

    async fn assign_if_unassigned(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError> {
        Ok(self.update_if(
            id,
            |order| !order.is_assigned(),
            |order| {
                order.courier = Some(assignment);
                order.reassigned = false;
            },
        ))
    }

    async fn reassign_if_assigned(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError> {
        Ok(self.update_if(
            id,
            |order| order.is_assigned(),
            |order| {
                order.courier = Some(assignment);
                order.reassigned = true;
            },
        ))
    }

    async fn accept_if_not_accepted(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError> {
        Ok(self.update_if(
            id,
            |order| order.status != OrderStatus::Accepted,
            |order| {
                order.courier = Some(assignment);
                order.status = OrderStatus::Accepted;
            },
        ))
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<DeliveryOrder>, StoreError> {
        match self.update_if(id, |_| true, |order| order.status = status) {
            ConditionalUpdate::Applied(order) => Ok(Some(order)),
            ConditionalUpdate::Missing | ConditionalUpdate::Rejected(_) => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError> {
        Ok(self.orders.remove(&id).map(|(_, order)| order))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.orders.len())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        match self.user_emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("user".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Ok(())
            }
        }
    }

    async fn insert_courier(&self, courier: Courier) -> Result<(), StoreError> {
        match self.courier_emails.entry(courier.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("courier".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(courier.id);
                self.couriers.insert(courier.id, courier);
                Ok(())
            }
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.user_emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find_user_by_id(id).await
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_user_by_email(email)
            .await?
            .filter(|user| user.is_admin()))
    }

    async fn find_courier_by_email(&self, email: &str) -> Result<Option<Courier>, StoreError> {
        let Some(id) = self.courier_emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.couriers.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.users.len())
    }

    async fn courier_count(&self) -> Result<usize, StoreError> {
        Ok(self.couriers.len())
    }
}
