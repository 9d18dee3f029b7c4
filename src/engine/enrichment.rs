use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::engine::{bounded, parse_user_id};
use crate::error::AppError;
use crate::models::courier::Courier;
use crate::models::order::DeliveryOrder;
use crate::store::{IdentityStore, OrderRepository};

/// Response-shaped order carrying display fields. Never written back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedOrder {
    #[serde(flatten)]
    pub order: DeliveryOrder,
    pub user_name: String,
}

#[derive(Clone)]
pub struct OrderEnricher {
    orders: Arc<dyn OrderRepository>,
    identities: Arc<dyn IdentityStore>,
    store_timeout: Duration,
}

impl OrderEnricher {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        identities: Arc<dyn IdentityStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            orders,
            identities,
            store_timeout,
        }
    }

    /// Orders owned by the caller in the identity header, each stamped with
    /// the owner's name and, where assigned, the courier's current contact.
    pub async fn orders_for_user(
        &self,
        user_id_header: Option<&str>,
    ) -> Result<Vec<EnrichedOrder>, AppError> {
        let user_id = parse_user_id(user_id_header)?;
        let orders = bounded(self.store_timeout, self.orders.list_by_user(user_id)).await?;

        let owner = bounded(self.store_timeout, self.identities.find_user_by_id(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.enrich(owner.name, orders).await
    }

    /// Stamps `user_name` on every order and refreshes courier name/phone
    /// from the courier record. A courier that cannot be resolved leaves the
    /// stored fields untouched.
    pub async fn enrich(
        &self,
        user_name: String,
        orders: Vec<DeliveryOrder>,
    ) -> Result<Vec<EnrichedOrder>, AppError> {
        let mut couriers: HashMap<String, Option<Courier>> = HashMap::new();
        let mut enriched = Vec::with_capacity(orders.len());

        for mut order in orders {
            if let Some(email) = order.courier_email().map(str::to_string) {
                if !couriers.contains_key(&email) {
                    let found = self.lookup_courier(&email).await;
                    couriers.insert(email.clone(), found);
                }

                if let (Some(Some(courier)), Some(assignment)) =
                    (couriers.get(&email), order.courier.as_mut())
                {
                    assignment.courier_name = courier.name.clone();
                    assignment.courier_phone = courier.phone.clone();
                }
            }

            enriched.push(EnrichedOrder {
                order,
                user_name: user_name.clone(),
            });
        }

        Ok(enriched)
    }

    async fn lookup_courier(&self, email: &str) -> Option<Courier> {
        match bounded(self.store_timeout, self.identities.find_courier_by_email(email)).await {
            Ok(found) => found,
            Err(err) => {
                warn!(courier_email = email, error = %err, "courier lookup failed; skipping enrichment");
                None
            }
        }
    }
}
