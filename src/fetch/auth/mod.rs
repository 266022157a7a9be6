mod api_key;

pub use api_key::{ApiKey, MTA_API_KEY_HEADER};
