use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub vehicle_type: String,
    pub plate_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierRegistration {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub plate_number: String,
}

impl Courier {
    pub fn register(payload: CourierRegistration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            password: payload.password,
            vehicle_type: payload.vehicle_type,
            plate_number: payload.plate_number,
            created_at: Utc::now(),
        }
    }
}
