mod helpers;
mod middleware;
mod token;

pub use helpers::{extract_basic_credentials, issue_token, verify_credentials};
pub use middleware::{AuthError, RequireAdmin};
pub use token::{TokenGenerator, parse_token};
