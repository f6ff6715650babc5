mod commands;
mod info;
pub mod prompts;
mod user;

pub use commands::{AdminCommands, UserCommands};
pub use info::run_info;
pub use user::{run_user_add, run_user_list};

use crate::store::SqliteStore;

/// Database file name inside the data directory.
pub const DB_FILE: &str = "solarhub.db";

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'solarhub admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
