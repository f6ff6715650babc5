mod local;

pub use local::{
    LocalObjectStore, StorageError, content_type_for_key, extension_for_content_type,
    is_valid_key,
};
