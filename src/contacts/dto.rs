use serde::Deserialize;
use time::Date;

/// Request body for contact creation.
#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: Date,
    pub additional_info: Option<String>,
}

/// Partial update: absent fields keep their prior values.
#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<Date>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn update_request_tolerates_missing_fields() {
        let u: UpdateContactRequest = serde_json::from_str(r#"{"last_name":"C"}"#).unwrap();
        assert_eq!(u.last_name.as_deref(), Some("C"));
        assert!(u.first_name.is_none());
        assert!(u.birthday.is_none());
    }

    #[test]
    fn birthday_parses_iso_date() {
        let c: CreateContactRequest = serde_json::from_str(
            r#"{"first_name":"A","last_name":"B","email":"a@x.com",
                "phone":"123","birthday":"1990-12-30"}"#,
        )
        .unwrap();
        assert_eq!(c.birthday.to_string(), "1990-12-30");
    }
}
