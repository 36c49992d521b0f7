pub mod logging;
pub mod exporter;
pub mod server;
