// Start of file: /src/utils/mod.rs

/*
    * Re-exports for all utility modules like error handling,
    * response formats and JSON helpers.
*/

pub mod error_handler;
pub mod json;
pub mod response_handler;

// End of file: /src/utils/mod.rs
