//! Delta Anomaly - Isolation Forest scoring for elapsed-time deltas
//!
//! Every request fits a fresh, seeded Isolation Forest on the submitted
//! deltas and reports the lowest decision score in the batch together with
//! a fixed-threshold verdict. No model outlives the request that built it.
//!
//! # Modules
//!
//! - [`anomaly`] - Isolation Forest and the delta-time scorer
//! - [`server`] - HTTP server exposing `POST /ai/isolation-forest`
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```
//! use delta_anomaly::anomaly::detect;
//!
//! let report = detect(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0]).unwrap();
//! assert!(report.is_anomaly);
//! ```

// Core error handling
pub mod error;

// Detection
pub mod anomaly;

// Services
pub mod server;
pub mod cli;

pub use error::{AnomalyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{AnomalyError, Result};
    pub use crate::anomaly::{detect, AnomalyDetector, AnomalyReport, IsolationForest};
    pub use crate::server::{create_router, run_server, ServerConfig};
}
