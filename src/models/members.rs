use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberActivity {
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MemberFilter {
    pub active: Option<bool>,
}

/// Trims the name and rejects blank ones.
pub fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Linh Tran "), Some("Linh Tran".to_string()));
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn test_filter_from_query() {
        let filter: MemberFilter = serde_json::from_str(r#"{"active": false}"#).unwrap();

        assert_eq!(filter.active, Some(false));
        assert_eq!(MemberFilter::default().active, None);
    }
}
