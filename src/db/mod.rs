pub mod connection;

pub use connection::{Backend, ConnectionConfig, mask_url_password, open_source};
