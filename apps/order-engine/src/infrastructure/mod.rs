//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer.
//!
//! - **Driven Adapters (Outbound)**
//!   - `venue/`: In-process paper venue publishing to the outcome feed

pub mod venue;
