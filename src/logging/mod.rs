pub mod enhanced_logger;

pub use enhanced_logger::{EnhancedLogEntry, EnhancedLogger, LogCategory};
