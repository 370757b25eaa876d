//! Decoding of telemetry payloads into flat, human-labelled field records.
//!
//! Components:
//! - `schema`: per-type field tables.
//! - `role_naming`: combiner/master/slave display names for per-unit values.
//! - `payload`: classification of a decoded payload by message type.
//! - `field_record`: the ordered output record.
//! - `field_decoder`: table-driven decoding of one event.

pub mod field_decoder;
pub mod field_record;
pub mod payload;
pub mod role_naming;
pub mod schema;

pub use field_decoder::decode_event;
pub use field_record::FieldRecord;
pub use payload::{MessageType, TelemetryPayload};
