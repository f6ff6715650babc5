use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and first admin user)
    Init {
        /// Data directory for the database and stored images
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username for the first admin
        #[arg(long)]
        username: Option<String>,

        /// Password for the first admin
        #[arg(long, env = "SOLARHUB_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Skip interactive prompts (requires --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show gallery status information
    Info {
        /// Data directory for the database and stored images
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user with an optional token
    Add {
        /// Data directory for the database and stored images
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username for the new user
        #[arg(long)]
        username: Option<String>,

        /// Password for the new user
        #[arg(long, env = "SOLARHUB_USER_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Role for the new user
        #[arg(long, default_value = "admin")]
        role: String,

        /// Create a token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --username and --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List users
    List {
        /// Data directory for the database and stored images
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
