//! Request and response bodies of the HTTP API, plus the parsing of
//! string-typed query parameters into model filters.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod categories;
pub mod courses;
pub mod enrollments;
pub mod ratings;
pub mod users;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Missing values fall back to the defaults; `limit` is capped at [`MAX_PAGE_LIMIT`].
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, String> {
        let limit = parse_param::<i64>("limit", limit)?.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = parse_param::<i64>("offset", offset)?.unwrap_or(0);

        if limit < 1 {
            return Err("Invalid value for `limit`: must be positive".to_string());
        }
        if offset < 0 {
            return Err("Invalid value for `offset`: must not be negative".to_string());
        }

        Ok(Self {
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        })
    }
}

/// Parses an optional query value; blank strings count as absent.
pub fn parse_param<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid value for `{name}`: {raw}")),
    }
}

/// Like [`parse_param`] for numeric filters, rejecting `NaN` and infinities.
pub fn parse_finite(name: &str, value: Option<&str>) -> Result<Option<f64>, String> {
    match parse_param::<f64>(name, value)? {
        Some(v) if !v.is_finite() => Err(format!("Invalid value for `{name}`: must be a finite number")),
        parsed => Ok(parsed),
    }
}

/// Keeps an explicit `null` apart from a missing field: used with
/// `#[serde(default, deserialize_with = "double_option")]`, a missing field
/// is `None` and `null` is `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pagination_defaults_and_cap() {
        assert_eq!(
            Pagination::parse(None, None),
            Ok(Pagination {
                limit: DEFAULT_PAGE_LIMIT,
                offset: 0
            })
        );
        assert_eq!(Pagination::parse(Some("500"), Some("10")).unwrap().limit, MAX_PAGE_LIMIT);
        assert!(Pagination::parse(Some("0"), None).is_err());
        assert!(Pagination::parse(None, Some("-1")).is_err());
        assert!(Pagination::parse(Some("ten"), None).is_err());
    }

    #[test]
    fn blank_params_are_absent() {
        assert_eq!(parse_param::<f64>("price", Some("  ")), Ok(None));
        assert_eq!(parse_param::<f64>("price", Some("12.5")), Ok(Some(12.5)));
        assert!(parse_param::<f64>("price", Some("cheap")).unwrap_err().contains("price"));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(parse_finite("price_gte", Some(raw)).is_err(), "{raw} accepted");
        }
        assert_eq!(parse_finite("price_lte", Some("10000")), Ok(Some(10000.0)));
        assert_eq!(parse_finite("price_lte", None), Ok(None));
    }
}
