pub mod bridge;
pub mod db;
pub mod http;
pub mod sensor;
pub mod store;
