pub mod handler;
pub mod routes;

pub use routes::gateway_routes;
