//! Component descriptors and analog source models.
//!
//! A [`ComponentDescriptor`] is the persisted-form construction input for one
//! schematic component: its name, its ordered pin-to-node connections, and a
//! [`ComponentKind`] tag. The kind tag is a closed registry - circuit
//! construction dispatches on it explicitly, no reflection-style resolution.

mod clock;
mod descriptor;

pub use clock::{ClockInstance, Pulse};
pub use descriptor::{ComponentDescriptor, ComponentKind, PinDescriptor, PinDirection};
