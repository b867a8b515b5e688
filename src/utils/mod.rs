pub mod http;
pub mod logging;
pub mod session_store;
pub mod templates;
pub mod timing;
