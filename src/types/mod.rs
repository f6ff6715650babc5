mod models;
pub mod tags;

pub use models::*;
pub use tags::{decode_tags, encode_tags, normalize_tags};
