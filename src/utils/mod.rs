//! Utility modules shared by the library and the binary

pub mod logging;

pub use logging::{init_logger, try_init_test_logger};
