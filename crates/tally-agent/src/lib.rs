//! Agent building blocks for Tally.
//!
//! Turn history model, structured session events, run configuration, the tool
//! registry with schema validation, and the report-generation tool set
//! (code conversion, aggregation, markdown reports, exchange-rate quotes,
//! preference memory).

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod tools;
pub mod turn;

pub use config::*;
pub use context::*;
pub use errors::*;
pub use events::*;
pub use tools::*;
pub use turn::*;
