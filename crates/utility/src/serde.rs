/// Lenient date handling for fixture files and html forms, where dates show
/// up either as ISO dates, as `dd/mm/yyyy` or as empty strings.
pub mod date {
    use core::fmt;

    use chrono::NaiveDate;
    use serde::{
        de::{self, Visitor},
        Deserializer,
    };

    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
    }

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = Option<NaiveDate>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a date as YYYY-MM-DD or DD/MM/YYYY")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value.trim().is_empty() {
                    return Ok(None);
                }
                parse(value)
                    .map(Some)
                    .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(value), &self))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_str(self)
            }
        }

        deserializer.deserialize_option(DateVisitor)
    }
}

/// Html checkboxes are only submitted when checked, usually with the value
/// `on`. Use together with `#[serde(default)]`.
pub mod checkbox {
    use core::fmt;

    use serde::{
        de::{self, Visitor},
        Deserializer,
    };

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CheckboxVisitor;

        impl<'de> Visitor<'de> for CheckboxVisitor {
            type Value = bool;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean or a checkbox value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<bool, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_str<E>(self, value: &str) -> Result<bool, E>
            where
                E: de::Error,
            {
                Ok(matches!(
                    value.trim().to_lowercase().as_str(),
                    "on" | "true" | "1" | "yes"
                ))
            }
        }

        deserializer.deserialize_any(CheckboxVisitor)
    }
}

/// Query parameters coming from `<select>` and `<input>` elements are sent
/// even when empty, treat those as absent.
pub mod empty_as_none {
    use serde::{Deserialize as _, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.and_then(|v| {
            let trimmed = v.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }))
    }
}
