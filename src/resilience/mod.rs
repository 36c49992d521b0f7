pub mod circuit_breaker;

pub use circuit_breaker::{BreakerSet, CircuitBreaker, CircuitBreakerConfig, CircuitState};
