use axum::extract::Query;
use axum::extract::rejection::QueryRejection;

use crate::query::PageRequest;
use crate::server::response::ApiError;

pub const DEFAULT_PHOTO_LIMIT: i64 = 20;
pub const MAX_PHOTO_LIMIT: i64 = 100;
pub const DEFAULT_COLLECTION_LIMIT: i64 = 12;
pub const MAX_COLLECTION_LIMIT: i64 = 50;

const MAX_USERNAME_LEN: usize = 64;
const MAX_PUBLIC_ID_LEN: usize = 100;
const MAX_SLUG_LEN: usize = 100;
const MAX_TAG_NAME_LEN: usize = 50;
const MAX_TITLE_LEN: usize = 200;
const MIN_PASSWORD_LEN: usize = 8;

/// Unwraps query parameters, turning malformed values into a JSON 400.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::bad_request(format!("Invalid query parameters: {}", e.body_text())))
}

/// Checks `page >= 1` and `1 <= limit <= max_limit`, filling in defaults.
pub fn page_request(
    page: Option<i64>,
    limit: Option<i64>,
    default_limit: i64,
    max_limit: i64,
) -> Result<PageRequest, ApiError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(default_limit);

    if page < 1 {
        return Err(ApiError::bad_request("page must be at least 1"));
    }
    if !(1..=max_limit).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {max_limit}"
        )));
    }

    Ok(PageRequest::new(page, limit))
}

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    max_len: usize,
    allow_period: bool,
) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request(format!("{entity} cannot be empty")));
    }
    if name.len() > max_len {
        return Err(ApiError::bad_request(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(ApiError::bad_request(format!(
            "{entity} can only contain {allowed}"
        )));
    }
    if name.starts_with('-') || name.starts_with('_') || name.starts_with('.') {
        return Err(ApiError::bad_request(format!(
            "{entity} cannot start with a hyphen, underscore, or period"
        )));
    }
    Ok(())
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Username", MAX_USERNAME_LEN, true)
}

/// Public ids end up inside object keys, so they share the name rules.
pub fn validate_public_id(public_id: &str) -> Result<(), ApiError> {
    validate_name(public_id, "public_id", MAX_PUBLIC_ID_LEN, false)
}

/// Slugs are lowercase letters, digits and single inner hyphens.
pub fn validate_slug(slug: &str) -> Result<(), ApiError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(ApiError::bad_request(format!(
            "slug must be between 1 and {MAX_SLUG_LEN} characters"
        )));
    }
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");
    if !valid {
        return Err(ApiError::bad_request(
            "slug can only contain lowercase letters, digits, and single hyphens",
        ));
    }
    Ok(())
}

/// Tag names may hold spaces but not commas, which separate tag filters.
pub fn validate_tag_name(name: &str) -> Result<(), ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Tag name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Tag name cannot exceed {MAX_TAG_NAME_LEN} characters"
        )));
    }
    if trimmed.contains(',') {
        return Err(ApiError::bad_request("Tag name cannot contain commas"));
    }
    Ok(())
}

pub fn validate_tag_names(names: &[String]) -> Result<(), ApiError> {
    names.iter().try_for_each(|name| validate_tag_name(name))
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("title cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_aspect_ratio(ratio: f64) -> Result<(), ApiError> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ApiError::bad_request("aspect_ratio must be a positive number"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_bounds() {
        let req = page_request(None, None, DEFAULT_PHOTO_LIMIT, MAX_PHOTO_LIMIT).unwrap();
        assert_eq!(req, PageRequest::new(1, 20));

        assert!(page_request(Some(0), None, 20, 100).is_err());
        assert!(page_request(None, Some(0), 20, 100).is_err());
        assert!(page_request(None, Some(101), 20, 100).is_err());
        assert!(page_request(Some(99), Some(100), 20, 100).is_ok());
        assert!(page_request(None, Some(51), DEFAULT_COLLECTION_LIMIT, MAX_COLLECTION_LIMIT).is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("urban-gardens-2024").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Urban").is_err());
        assert!(validate_slug("-urban").is_err());
        assert!(validate_slug("urban-").is_err());
        assert!(validate_slug("urban--gardens").is_err());
        assert!(validate_slug("urban gardens").is_err());
    }

    #[test]
    fn test_validate_tag_name() {
        assert!(validate_tag_name("green roof").is_ok());
        assert!(validate_tag_name("  ").is_err());
        assert!(validate_tag_name("a,b").is_err());
        assert!(validate_tag_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_public_id() {
        assert!(validate_public_id("p1").is_ok());
        assert!(validate_public_id("solar_farm-01").is_ok());
        assert!(validate_public_id("../p1").is_err());
        assert!(validate_public_id("p1.webp").is_err());
        assert!(validate_public_id("-p1").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("jane.doe").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_validate_aspect_ratio() {
        assert!(validate_aspect_ratio(1.5).is_ok());
        assert!(validate_aspect_ratio(0.0).is_err());
        assert!(validate_aspect_ratio(-1.0).is_err());
        assert!(validate_aspect_ratio(f64::NAN).is_err());
    }
}
