mod server;

pub use server::{ConfigOverrides, DEFAULT_LICENSE, FileConfig, ServerConfig};
