use std::{error, fmt};

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    id::HasId,
    serde::{checkbox, date, empty_as_none},
    text::non_blank,
};

use crate::ExampleData;

/// Separator between several numbers stored in one phone field.
pub const PHONE_SEPARATOR: char = '/';

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pharmacy {
    pub name: String,

    #[serde(default)]
    pub neighborhood: String,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    #[schemars(with = "Option<String>")]
    pub city: Option<String>,

    pub region: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub is_24h: bool,

    #[serde(default, deserialize_with = "date::deserialize_option")]
    #[schemars(with = "Option<NaiveDate>")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "date::deserialize_option")]
    #[schemars(with = "Option<NaiveDate>")]
    pub end_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    #[schemars(with = "Option<String>")]
    pub group_name: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    #[schemars(with = "Option<String>")]
    pub hours: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

impl HasId for Pharmacy {
    type IdType = String;
}

impl Pharmacy {
    /// A pharmacy is on duty when it is permanently open or when `today` lies
    /// within its duty period. A missing bound leaves that side of the period
    /// open, a record without any bound is never on duty by rotation.
    pub fn on_duty(&self, today: NaiveDate) -> bool {
        if self.is_24h {
            return true;
        }
        match (self.start_date, self.end_date) {
            (None, None) => false,
            (start, end) => {
                start.map_or(true, |start| start <= today)
                    && end.map_or(true, |end| today <= end)
            }
        }
    }

    /// All numbers of the phone field, trimmed, without empty segments.
    pub fn phone_numbers(&self) -> Vec<&str> {
        self.phone
            .split(PHONE_SEPARATOR)
            .map(str::trim)
            .filter(|number| !number.is_empty())
            .collect()
    }

    /// `tel:` uri for the first number of the phone field.
    pub fn call_uri(&self) -> Option<String> {
        self.phone_numbers().first().map(|number| {
            let digits = number
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>();
            format!("tel:{}", digits)
        })
    }
}

impl ExampleData for Pharmacy {
    fn example_data() -> Self {
        Self {
            name: "Pharmacie de l'Étoile".to_owned(),
            neighborhood: "Avenue Steinmetz".to_owned(),
            city: Some("Cotonou".to_owned()),
            region: "Littoral".to_owned(),
            phone: "+229 21 31 22 22 / +229 97 00 00 00".to_owned(),
            is_24h: false,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 3),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            group_name: Some("Groupe A".to_owned()),
            latitude: Some(6.3667),
            longitude: Some(2.4333),
            hours: Some("24h/24 (Garde)".to_owned()),
            services: vec!["Vente de médicaments".to_owned(), "Parapharmacie".to_owned()],
        }
    }
}

/// The fields an administrator fills in to create or edit a pharmacy.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, rename = "is24h", deserialize_with = "checkbox::deserialize")]
    #[schemars(with = "bool")]
    pub is_24h: bool,
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    #[schemars(with = "Option<String>")]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "date::deserialize_option")]
    #[schemars(with = "Option<NaiveDate>")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "date::deserialize_option")]
    #[schemars(with = "Option<NaiveDate>")]
    pub end_date: Option<NaiveDate>,
}

impl PharmacyDraft {
    pub fn from_pharmacy(pharmacy: &Pharmacy) -> Self {
        Self {
            name: pharmacy.name.clone(),
            neighborhood: pharmacy.neighborhood.clone(),
            city: pharmacy.city.clone().unwrap_or_default(),
            region: pharmacy.region.clone(),
            phone: pharmacy.phone.clone(),
            is_24h: pharmacy.is_24h,
            group_name: pharmacy.group_name.clone(),
            start_date: pharmacy.start_date,
            end_date: pharmacy.end_date,
        }
    }

    /// Trims all text fields.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            neighborhood: self.neighborhood.trim().to_owned(),
            city: self.city.trim().to_owned(),
            region: self.region.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            is_24h: self.is_24h,
            group_name: non_blank(self.group_name.as_deref()),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("name", &self.name),
            ("neighborhood", &self.neighborhood),
            ("city", &self.city),
            ("region", &self.region),
            ("phone", &self.phone),
        ];
        let missing = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::InvalidDutyPeriod);
            }
        }
        Ok(())
    }

    /// Builds a new record. Attributes the form does not carry start empty.
    pub fn into_pharmacy(self) -> Pharmacy {
        let draft = self.normalized();
        Pharmacy {
            name: draft.name,
            neighborhood: draft.neighborhood,
            city: non_blank(Some(&draft.city)),
            region: draft.region,
            phone: draft.phone,
            is_24h: draft.is_24h,
            start_date: draft.start_date,
            end_date: draft.end_date,
            group_name: draft.group_name,
            latitude: None,
            longitude: None,
            hours: None,
            services: vec![],
        }
    }

    /// Applies the form fields to an existing record, keeping everything the
    /// form does not edit.
    pub fn apply_to(self, pharmacy: &mut Pharmacy) {
        let draft = self.normalized();
        pharmacy.name = draft.name;
        pharmacy.neighborhood = draft.neighborhood;
        pharmacy.city = non_blank(Some(&draft.city));
        pharmacy.region = draft.region;
        pharmacy.phone = draft.phone;
        pharmacy.is_24h = draft.is_24h;
        pharmacy.group_name = draft.group_name;
        pharmacy.start_date = draft.start_date;
        pharmacy.end_date = draft.end_date;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields(Vec<&'static str>),
    InvalidDutyPeriod,
}

impl error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingFields(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            Self::InvalidDutyPeriod => {
                write!(f, "the duty period ends before it starts")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rotating(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Pharmacy {
        Pharmacy {
            is_24h: false,
            start_date: start,
            end_date: end,
            ..Pharmacy::example_data()
        }
    }

    #[test]
    fn permanent_pharmacies_are_always_on_duty() {
        let pharmacy = Pharmacy {
            is_24h: true,
            start_date: None,
            end_date: None,
            ..Pharmacy::example_data()
        };
        assert!(pharmacy.on_duty(day(2030, 5, 1)));
    }

    #[test]
    fn rotating_pharmacies_are_on_duty_within_their_period() {
        let pharmacy = rotating(Some(day(2026, 1, 3)), Some(day(2026, 1, 10)));
        assert!(!pharmacy.on_duty(day(2026, 1, 2)));
        assert!(pharmacy.on_duty(day(2026, 1, 3)));
        assert!(pharmacy.on_duty(day(2026, 1, 10)));
        assert!(!pharmacy.on_duty(day(2026, 1, 11)));
    }

    #[test]
    fn missing_bounds() {
        assert!(!rotating(None, None).on_duty(day(2026, 1, 5)));
        assert!(rotating(Some(day(2026, 1, 3)), None).on_duty(day(2027, 1, 1)));
        assert!(rotating(None, Some(day(2026, 1, 3))).on_duty(day(2025, 1, 1)));
    }

    #[test]
    fn call_uri_uses_first_number() {
        let pharmacy = Pharmacy::example_data();
        assert_eq!(pharmacy.call_uri().as_deref(), Some("tel:+22921312222"));
        assert_eq!(pharmacy.phone_numbers().len(), 2);

        let silent = Pharmacy {
            phone: " / ".to_owned(),
            ..Pharmacy::example_data()
        };
        assert_eq!(silent.call_uri(), None);
    }

    #[test]
    fn drafts_require_all_location_and_contact_fields() {
        let draft = PharmacyDraft {
            name: "Pharmacie A".to_owned(),
            region: "Littoral".to_owned(),
            city: "   ".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingFields(vec![
                "neighborhood",
                "city",
                "phone"
            ]))
        );
    }

    #[test]
    fn drafts_reject_reversed_periods() {
        let mut draft = PharmacyDraft::from_pharmacy(&Pharmacy::example_data());
        assert_eq!(draft.validate(), Ok(()));
        draft.start_date = Some(day(2026, 2, 1));
        draft.end_date = Some(day(2026, 1, 1));
        assert_eq!(draft.validate(), Err(ValidationError::InvalidDutyPeriod));
    }

    #[test]
    fn applying_a_draft_keeps_unedited_attributes() {
        let mut pharmacy = Pharmacy::example_data();
        let draft = PharmacyDraft {
            name: " Pharmacie Ganhi ".to_owned(),
            neighborhood: "Ganhi".to_owned(),
            city: "Cotonou".to_owned(),
            region: "Littoral".to_owned(),
            phone: "+229 21 31 09 87".to_owned(),
            is_24h: true,
            ..Default::default()
        };
        draft.apply_to(&mut pharmacy);
        assert_eq!(pharmacy.name, "Pharmacie Ganhi");
        assert!(pharmacy.is_24h);
        assert_eq!(pharmacy.latitude, Some(6.3667));
        assert_eq!(pharmacy.services.len(), 2);
        assert_eq!(pharmacy.group_name, None);
    }

    #[test]
    fn fixture_records_deserialize_leniently() {
        let pharmacy: Pharmacy = serde_json::from_str(
            r#"{
                "name": "Pharmacie Camp Guézo",
                "neighborhood": "Camp Guézo",
                "city": "",
                "region": "Littoral",
                "phone": "21 31 55 55",
                "start_date": "06/01/2026",
                "end_date": "2026-01-13",
                "group_name": "Groupe 2"
            }"#,
        )
        .unwrap();
        assert_eq!(pharmacy.city, None);
        assert!(!pharmacy.is_24h);
        assert_eq!(pharmacy.start_date, Some(day(2026, 1, 6)));
        assert_eq!(pharmacy.end_date, Some(day(2026, 1, 13)));
    }
}
