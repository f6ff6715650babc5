use chrono::Utc;
use inquire::Confirm;
use serde::Serialize;

use crate::auth::{TokenGenerator, issue_token};
use crate::server::validation::{validate_password, validate_username};
use crate::store::Store;

use super::init_store;
use super::prompts::{format_relative_time, pick_expiration, prompt_password, prompt_username};

#[derive(Serialize)]
struct UserOutput {
    id: i64,
    username: String,
    role: String,
    created_at: String,
}

fn validate_role(role: &str) -> anyhow::Result<()> {
    if role.is_empty() || !role.chars().all(|c| c.is_ascii_lowercase()) {
        anyhow::bail!("Role can only contain lowercase letters");
    }
    Ok(())
}

pub fn run_user_add(
    data_dir: String,
    username: Option<String>,
    password: Option<String>,
    role: String,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    validate_role(&role)?;

    let username = if let Some(name) = username {
        validate_username(&name).map_err(|e| anyhow::anyhow!(e.message))?;
        name
    } else if non_interactive {
        anyhow::bail!("--username is required in non-interactive mode");
    } else {
        prompt_username(None)?
    };

    if store.get_user_by_username(&username)?.is_some() {
        anyhow::bail!("User '{}' already exists", username);
    }

    let password = if let Some(password) = password {
        validate_password(&password).map_err(|e| anyhow::anyhow!(e.message))?;
        password
    } else if non_interactive {
        anyhow::bail!("--password is required in non-interactive mode");
    } else {
        prompt_password()?
    };

    let password_hash = TokenGenerator::new().hash(&password)?;
    let user = store.create_user(&username, &password_hash, &role)?;

    println!();
    println!("Created user \"{}\" with role \"{}\"", user.username, user.role);

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create access token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        let expires_in = if non_interactive {
            None
        } else {
            match pick_expiration()? {
                Some(exp) => exp,
                None => {
                    println!("Token creation cancelled.");
                    return Ok(());
                }
            }
        };

        let (_, raw_token) = issue_token(&store, user.id, expires_in.map(|d| Utc::now() + d))?;

        println!();
        println!("Token created: {raw_token}");
        println!("  Save this now - it cannot be retrieved later.");
    }

    println!();

    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = store.list_users()?;

    if json {
        let output: Vec<UserOutput> = users
            .into_iter()
            .map(|u| UserOutput {
                id: u.id,
                username: u.username,
                role: u.role,
                created_at: u.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!();
    for user in &users {
        println!(
            "  {:>4}  {:<24} {:<8} created {}",
            user.id,
            user.username,
            user.role,
            format_relative_time(&user.created_at)
        );
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_role() {
        assert!(validate_role("admin").is_ok());
        assert!(validate_role("editor").is_ok());
        assert!(validate_role("").is_err());
        assert!(validate_role("Admin").is_err());
        assert!(validate_role("ed1tor").is_err());
    }
}
