/*
* Gateway-owned HTTP endpoints. Everything else falls through to the proxy.
*/

pub mod admin;
pub mod gateway;
