use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// User as exposed by the API.
///
/// `username` is the stable login key. `active` and `not_locked` jointly gate
/// authentication, the backend enforces it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: Option<u64>,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    /// Only sent on login and creation, never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub last_login_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp")]
    pub last_login_date_display: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp")]
    pub join_date: Option<DateTime<Utc>>,
    pub profile_image_url: String,
    pub active: bool,
    pub not_locked: bool,
    pub role: String,
    pub authorities: Vec<String>,
}

impl User {
    /// Credentials-only user, as sent to `/user/login`.
    pub fn credentials(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: Some(password.to_owned()),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Dates arrive either as RFC 3339 strings or as epoch milliseconds
/// depending on the backend serializer settings.
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(DateTime<Utc>),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Millis(millis)) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range")),
        Some(Raw::Text(date)) => Ok(Some(date)),
        None => Ok(None),
    }
}
