//! Domain models: canonical field keys, header mappings, and the
//! client → report → finding hierarchy.

pub mod field;
pub mod hierarchy;
pub mod mapping;
pub mod record;
pub mod severity;
