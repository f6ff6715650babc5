use std::fmt;

use chrono::{DateTime, Duration, Utc};
use inquire::validator::Validation;
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};

use crate::server::validation::{validate_password, validate_username};

struct ExpirationOption {
    label: &'static str,
    days: Option<i64>,
}

impl fmt::Display for ExpirationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// Asks how long a token should live.
/// `Ok(None)` means the prompt was cancelled; `Ok(Some(None))` means never.
pub fn pick_expiration() -> anyhow::Result<Option<Option<Duration>>> {
    let options = vec![
        ExpirationOption {
            label: "1 day",
            days: Some(1),
        },
        ExpirationOption {
            label: "30 days",
            days: Some(30),
        },
        ExpirationOption {
            label: "1 year",
            days: Some(365),
        },
        ExpirationOption {
            label: "Never",
            days: None,
        },
    ];

    let selection = Select::new("Token expiration:", options)
        .with_page_size(4)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(opt) => Ok(Some(opt.days.map(Duration::days))),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn prompt_username(default: Option<&str>) -> anyhow::Result<String> {
    let mut prompt = Text::new("Username:").with_validator(|input: &str| {
        Ok(validate_username(input)
            .map(|()| Validation::Valid)
            .unwrap_or_else(|e| Validation::Invalid(e.message.into())))
    });
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    Ok(prompt.prompt()?)
}

pub fn prompt_password() -> anyhow::Result<String> {
    let password = Password::new("Password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_custom_confirmation_message("Confirm password:")
        .with_validator(|input: &str| {
            Ok(validate_password(input)
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.message.into())))
        })
        .prompt()?;
    Ok(password)
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(*dt).num_seconds();

    if secs < 0 {
        return "in the future".to_string();
    }
    if secs < 60 {
        return "just now".to_string();
    }

    const UNITS: [(i64, &str); 5] = [
        (365 * 86_400, "year"),
        (30 * 86_400, "month"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
    ];

    for (size, name) in UNITS {
        let count = secs / size;
        if count >= 1 {
            let plural = if count == 1 { "" } else { "s" };
            return format!("{count} {name}{plural} ago");
        }
    }
    "just now".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(1))), "1 minute ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(5))), "5 hours ago");
        assert_eq!(format_relative_time(&(now - Duration::days(40))), "1 month ago");
        assert_eq!(format_relative_time(&(now - Duration::days(800))), "2 years ago");
        assert_eq!(format_relative_time(&(now + Duration::hours(1))), "in the future");
    }
}
