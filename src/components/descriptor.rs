//! Construction inputs consumed from the persistence layer.

use super::clock::Pulse;
use crate::routine::LogicSource;

/// Direction of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// A named digital pin. The index is unique within its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    /// Pin name; doubles as the solver node name it connects to
    pub name: String,
    /// Position within the component's input or output list
    pub index: usize,
    pub direction: PinDirection,
}

/// The closed set of component kinds the circuit builder knows how to
/// construct. Selected by this tag in persisted data.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// A programmable logic block driven by a user routine
    Logic { source: LogicSource },
    /// A byte-addressable memory block emulated through pin semantics
    Memory {
        address_bits: usize,
        cell_bits: usize,
    },
    /// A pulse voltage source driving one output node
    Clock { pulse: Pulse },
}

/// Immutable description of one schematic component.
///
/// Pin names are solver node names: two components wired together simply
/// name the same node. Ground aliases "0" and "GND" resolve to the ground
/// node.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Component name, unique within a project
    pub name: String,
    /// Ordered input pin names
    pub inputs: Vec<String>,
    /// Ordered output pin names
    pub outputs: Vec<String>,
    /// Ground reference pin name
    pub ground: String,
    /// Kind tag used by the construction registry
    pub kind: ComponentKind,
}

impl ComponentDescriptor {
    /// Describe a programmable logic component.
    pub fn logic(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        ground: impl Into<String>,
        source: LogicSource,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            ground: ground.into(),
            kind: ComponentKind::Logic { source },
        }
    }

    /// Describe a memory component.
    ///
    /// `inputs` must hold `cell_bits` data pins, `address_bits` address pins
    /// and the three control pins Write, Read, Enable, in that order;
    /// `outputs` must hold `cell_bits` data pins.
    pub fn memory(
        name: impl Into<String>,
        address_bits: usize,
        cell_bits: usize,
        inputs: Vec<String>,
        outputs: Vec<String>,
        ground: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            ground: ground.into(),
            kind: ComponentKind::Memory {
                address_bits,
                cell_bits,
            },
        }
    }

    /// Describe a clock source driving `output` relative to ground.
    pub fn clock(name: impl Into<String>, output: impl Into<String>, pulse: Pulse) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: vec![output.into()],
            ground: "0".to_string(),
            kind: ComponentKind::Clock { pulse },
        }
    }

    /// Enumerate this component's pins with per-direction indices.
    pub fn pins(&self) -> Vec<PinDescriptor> {
        let inputs = self.inputs.iter().enumerate().map(|(index, name)| PinDescriptor {
            name: name.clone(),
            index,
            direction: PinDirection::Input,
        });
        let outputs = self.outputs.iter().enumerate().map(|(index, name)| PinDescriptor {
            name: name.clone(),
            index,
            direction: PinDirection::Output,
        });
        inputs.chain(outputs).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_indices_unique_per_direction() {
        let descriptor = ComponentDescriptor::logic(
            "U1",
            vec!["a".into(), "b".into()],
            vec!["q".into()],
            "0",
            LogicSource::Inline("out[0] = in[0]".into()),
        );
        let pins = descriptor.pins();
        assert_eq!(pins.len(), 3);
        assert_eq!(pins[0].index, 0);
        assert_eq!(pins[1].index, 1);
        assert_eq!(pins[2].index, 0);
        assert_eq!(pins[2].direction, PinDirection::Output);
    }
}
