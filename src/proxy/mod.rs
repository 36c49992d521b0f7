/*
* Reverse proxy from /<subapp>/... to the application listening on its host port.
*/

pub mod error;
pub mod forward;

pub use error::ProxyError;
pub use forward::proxy_fallback;
