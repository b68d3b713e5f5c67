use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::{pharmacy::Pharmacy, WithId};

pub const PERMANENT_SERVICE: &str = "Ouvert 24h/24 et 7j/7";
pub const ROTATING_SERVICE: &str = "De garde (Période limitée)";

/// Everything the detail overlay of a pharmacy shows.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyDetail {
    pub id: Id<Pharmacy>,
    pub name: String,
    pub neighborhood: String,
    pub city: Option<String>,
    pub region: String,
    pub on_duty: bool,
    pub is_24h: bool,
    pub service_type: &'static str,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub phone: String,
    pub phone_numbers: Vec<String>,
    pub call_uri: Option<String>,
    pub group_name: Option<String>,
    pub hours: Option<String>,
    pub services: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PharmacyDetail {
    pub fn new(pharmacy: &WithId<Pharmacy>, today: NaiveDate) -> Self {
        let content = &pharmacy.content;
        Self {
            id: pharmacy.id.clone(),
            name: content.name.clone(),
            neighborhood: content.neighborhood.clone(),
            city: content.city.clone(),
            region: content.region.clone(),
            on_duty: content.on_duty(today),
            is_24h: content.is_24h,
            service_type: if content.is_24h {
                PERMANENT_SERVICE
            } else {
                ROTATING_SERVICE
            },
            start_date: content.start_date,
            end_date: content.end_date,
            phone: content.phone.clone(),
            phone_numbers: content
                .phone_numbers()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            call_uri: content.call_uri(),
            group_name: content.group_name.clone(),
            hours: content.hours.clone(),
            services: content.services.clone(),
            latitude: content.latitude,
            longitude: content.longitude,
        }
    }
}
