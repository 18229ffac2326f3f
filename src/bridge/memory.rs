//! Byte-store memory bridge.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::{post_event, stamp_forced_level, LogicLevels, PinStateEvent};
use crate::circuit::NodeMap;
use crate::components::ComponentDescriptor;
use crate::error::{CosimError, Result};
use crate::solver::NodalMatrix;

const MIN_CELL_BITS: usize = 1;
const MAX_CELL_BITS: usize = 8;
const MIN_ADDRESS_BITS: usize = 1;
const MAX_ADDRESS_BITS: usize = 24;

/// Bridges a byte-addressable store onto the solver through pin semantics.
///
/// Input pins, in order: `cell_bits` data-in bits (LSB first), then
/// `address_bits` address bits (LSB first), then the Write, Read and Enable
/// controls. Output pins are the `cell_bits` data-out bits.
///
/// Per iteration: Enable low drives every output low. Otherwise Read high
/// drives the addressed cell onto the outputs; Read low commits data-in to
/// the addressed cell and passes it straight through to the outputs. Not
/// reading means writing: the Write pin is part of the declared layout but
/// is never consulted, so Read and Write need no mutual-exclusion check.
#[derive(Debug)]
pub struct MemoryBridge {
    name: Arc<str>,
    levels: LogicLevels,
    data_rows: Vec<Option<usize>>,
    addr_rows: Vec<Option<usize>>,
    read_row: Option<usize>,
    enable_row: Option<usize>,
    ground_row: Option<usize>,
    output_rows: Vec<usize>,
    /// One cell per address; capacity is 2^address_bits
    cells: Vec<u8>,
    cell_mask: u8,
    events: Sender<PinStateEvent>,
}

impl MemoryBridge {
    /// Validate widths, resolve pins and allocate the store.
    pub fn new(
        descriptor: &ComponentDescriptor,
        address_bits: usize,
        cell_bits: usize,
        nodes: &NodeMap,
        events: Sender<PinStateEvent>,
    ) -> Result<Self> {
        if !(MIN_CELL_BITS..=MAX_CELL_BITS).contains(&cell_bits) {
            return Err(CosimError::InvalidBitWidth {
                component: descriptor.name.clone(),
                param: "cell_bits",
                value: cell_bits,
                min: MIN_CELL_BITS,
                max: MAX_CELL_BITS,
            });
        }
        if !(MIN_ADDRESS_BITS..=MAX_ADDRESS_BITS).contains(&address_bits) {
            return Err(CosimError::InvalidBitWidth {
                component: descriptor.name.clone(),
                param: "address_bits",
                value: address_bits,
                min: MIN_ADDRESS_BITS,
                max: MAX_ADDRESS_BITS,
            });
        }

        let expected_inputs = cell_bits + address_bits + 3;
        if descriptor.inputs.len() != expected_inputs {
            return Err(CosimError::PinCountMismatch {
                component: descriptor.name.clone(),
                direction: "input",
                expected: expected_inputs,
                got: descriptor.inputs.len(),
            });
        }
        if descriptor.outputs.len() != cell_bits {
            return Err(CosimError::PinCountMismatch {
                component: descriptor.name.clone(),
                direction: "output",
                expected: cell_bits,
                got: descriptor.outputs.len(),
            });
        }

        let resolve = |pin: &str| {
            nodes.resolve(pin).ok_or_else(|| CosimError::UnresolvedPin {
                component: descriptor.name.clone(),
                pin: pin.to_string(),
            })
        };
        let input_row = |pin: &str| -> Result<Option<usize>> { Ok(nodes.matrix_row(resolve(pin)?)) };

        let data_rows = descriptor.inputs[..cell_bits]
            .iter()
            .map(|pin| input_row(pin))
            .collect::<Result<Vec<_>>>()?;
        let addr_rows = descriptor.inputs[cell_bits..cell_bits + address_bits]
            .iter()
            .map(|pin| input_row(pin))
            .collect::<Result<Vec<_>>>()?;
        // The Write pin must resolve like every other pin, but Load never
        // reads it: Read low is the write path.
        input_row(&descriptor.inputs[cell_bits + address_bits])?;
        let read_row = input_row(&descriptor.inputs[cell_bits + address_bits + 1])?;
        let enable_row = input_row(&descriptor.inputs[cell_bits + address_bits + 2])?;
        let ground_row = input_row(&descriptor.ground)?;

        let mut output_rows = Vec::with_capacity(cell_bits);
        for pin in &descriptor.outputs {
            let node = resolve(pin)?;
            let row = nodes.matrix_row(node).ok_or_else(|| CosimError::GroundedOutput {
                component: descriptor.name.clone(),
                pin: pin.clone(),
            })?;
            output_rows.push(row);
        }

        Ok(Self {
            name: descriptor.name.as_str().into(),
            levels: LogicLevels::default(),
            data_rows,
            addr_rows,
            read_row,
            enable_row,
            ground_row,
            output_rows,
            cells: vec![0; 1usize << address_bits],
            cell_mask: if cell_bits == 8 { u8::MAX } else { (1u8 << cell_bits) - 1 },
            events,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn pin_high(&self, matrix: &NodalMatrix, row: Option<usize>) -> bool {
        matrix.voltage(row) - matrix.voltage(self.ground_row) >= self.levels.threshold
    }

    fn read_bus(&self, matrix: &NodalMatrix, rows: &[Option<usize>]) -> usize {
        rows.iter().enumerate().fold(0usize, |word, (bit, &row)| {
            if self.pin_high(matrix, row) {
                word | (1 << bit)
            } else {
                word
            }
        })
    }

    /// Evaluate the store against the current solution and stamp outputs.
    pub fn load(&mut self, matrix: &mut NodalMatrix) -> Result<()> {
        let value = if !self.pin_high(matrix, self.enable_row) {
            0u8
        } else {
            let address = self.read_bus(matrix, &self.addr_rows);
            if self.pin_high(matrix, self.read_row) {
                self.cells[address]
            } else {
                let data = self.read_bus(matrix, &self.data_rows) as u8 & self.cell_mask;
                log::debug!(
                    target: "cosim::memory",
                    "[{}] write {:#04x} at {:#x}",
                    self.name, data, address
                );
                self.cells[address] = data;
                data
            }
        };

        for (bit, &row) in self.output_rows.iter().enumerate() {
            let state = value & (1 << bit) != 0;
            stamp_forced_level(matrix, row, state, &self.levels);
            post_event(&self.events, &self.name, bit, state);
        }
        Ok(())
    }

    /// Stored value at an address, for inspection.
    pub fn peek(&self, address: usize) -> Option<u8> {
        self.cells.get(address).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FORCING_CONDUCTANCE;
    use approx::assert_relative_eq;
    use std::sync::mpsc;

    const CELL_BITS: usize = 4;
    const ADDR_BITS: usize = 4;

    // Pin layout for the 4/4 fixture: d0..d3, a0..a3, wr, rd, en inputs
    // and q0..q3 outputs, all on their own nodes.
    fn fixture() -> (MemoryBridge, NodeMap, mpsc::Receiver<PinStateEvent>) {
        let mut inputs: Vec<String> = (0..CELL_BITS).map(|i| format!("d{}", i)).collect();
        inputs.extend((0..ADDR_BITS).map(|i| format!("a{}", i)));
        inputs.extend(["wr".to_string(), "rd".to_string(), "en".to_string()]);
        let outputs: Vec<String> = (0..CELL_BITS).map(|i| format!("q{}", i)).collect();

        let descriptor =
            ComponentDescriptor::memory("MEM", ADDR_BITS, CELL_BITS, inputs.clone(), outputs.clone(), "0");

        let mut nodes = NodeMap::new();
        for pin in inputs.iter().chain(&outputs) {
            nodes.intern(pin);
        }
        let (tx, rx) = mpsc::channel();
        let bridge = MemoryBridge::new(&descriptor, ADDR_BITS, CELL_BITS, &nodes, tx).unwrap();
        (bridge, nodes, rx)
    }

    fn set_pin(matrix: &mut NodalMatrix, nodes: &NodeMap, pin: &str, high: bool) {
        let row = nodes.matrix_row(nodes.resolve(pin).unwrap()).unwrap();
        matrix.x[row] = if high { 5.0 } else { 0.0 };
    }

    fn set_bus(matrix: &mut NodalMatrix, nodes: &NodeMap, prefix: &str, value: usize) {
        for bit in 0..4 {
            set_pin(matrix, nodes, &format!("{}{}", prefix, bit), value & (1 << bit) != 0);
        }
    }

    fn stamped_value(matrix: &NodalMatrix, nodes: &NodeMap) -> usize {
        (0..CELL_BITS).fold(0usize, |word, bit| {
            let row = nodes
                .matrix_row(nodes.resolve(&format!("q{}", bit)).unwrap())
                .unwrap();
            if matrix.z[row] > 0.0 {
                word | (1 << bit)
            } else {
                word
            }
        })
    }

    #[test]
    fn test_capacity_is_two_to_address_bits() {
        let (bridge, _, _) = fixture();
        assert_eq!(bridge.cells.len(), 16);
    }

    #[test]
    fn test_invalid_widths_rejected() {
        let nodes = NodeMap::new();
        let (tx, _rx) = mpsc::channel();
        let descriptor = ComponentDescriptor::memory("MEM", 0, 4, vec![], vec![], "0");
        let err = MemoryBridge::new(&descriptor, 0, 4, &nodes, tx.clone()).unwrap_err();
        assert!(matches!(err, CosimError::InvalidBitWidth { param: "address_bits", .. }));

        let descriptor = ComponentDescriptor::memory("MEM", 4, 9, vec![], vec![], "0");
        let err = MemoryBridge::new(&descriptor, 4, 9, &nodes, tx).unwrap_err();
        assert!(matches!(err, CosimError::InvalidBitWidth { param: "cell_bits", .. }));
    }

    #[test]
    fn test_pin_count_validated() {
        let nodes = NodeMap::new();
        let (tx, _rx) = mpsc::channel();
        let descriptor = ComponentDescriptor::memory(
            "MEM",
            4,
            4,
            vec!["d0".into()],
            vec!["q0".into()],
            "0",
        );
        let err = MemoryBridge::new(&descriptor, 4, 4, &nodes, tx).unwrap_err();
        assert!(matches!(
            err,
            CosimError::PinCountMismatch { direction: "input", expected: 11, got: 1, .. }
        ));
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (mut bridge, nodes, _rx) = fixture();
        let size = nodes.node_count() - 1;
        let mut matrix = NodalMatrix::new(size);

        // Write 0b1010 at address 5; data passes through while writing.
        set_bus(&mut matrix, &nodes, "d", 0b1010);
        set_bus(&mut matrix, &nodes, "a", 5);
        set_pin(&mut matrix, &nodes, "wr", true);
        set_pin(&mut matrix, &nodes, "rd", false);
        set_pin(&mut matrix, &nodes, "en", true);
        bridge.load(&mut matrix).unwrap();
        assert_eq!(bridge.peek(5), Some(0b1010));
        assert_eq!(stamped_value(&matrix, &nodes), 0b1010);

        // Read it back.
        matrix.clear();
        set_bus(&mut matrix, &nodes, "d", 0);
        set_pin(&mut matrix, &nodes, "wr", false);
        set_pin(&mut matrix, &nodes, "rd", true);
        bridge.load(&mut matrix).unwrap();
        assert_eq!(stamped_value(&matrix, &nodes), 0b1010);
    }

    #[test]
    fn test_disable_drives_all_outputs_low() {
        let (mut bridge, nodes, rx) = fixture();
        let size = nodes.node_count() - 1;
        let mut matrix = NodalMatrix::new(size);

        set_bus(&mut matrix, &nodes, "d", 0b1111);
        set_pin(&mut matrix, &nodes, "wr", true);
        set_pin(&mut matrix, &nodes, "rd", false);
        set_pin(&mut matrix, &nodes, "en", false);
        bridge.load(&mut matrix).unwrap();

        // No write happened and every output is forced low.
        assert_eq!(bridge.peek(0), Some(0));
        assert_eq!(stamped_value(&matrix, &nodes), 0);
        for _ in 0..CELL_BITS {
            assert!(!rx.try_recv().unwrap().state);
        }
        let row = nodes.matrix_row(nodes.resolve("q0").unwrap()).unwrap();
        assert_relative_eq!(matrix.a[row * size + row], FORCING_CONDUCTANCE);
    }

    #[test]
    fn test_read_low_commits_regardless_of_write_pin() {
        // Read low is the write path even with the Write pin held low; the
        // data passes through and lands in the addressed cell.
        let (mut bridge, nodes, _rx) = fixture();
        let size = nodes.node_count() - 1;
        let mut matrix = NodalMatrix::new(size);

        set_bus(&mut matrix, &nodes, "d", 0b1010);
        set_bus(&mut matrix, &nodes, "a", 5);
        set_pin(&mut matrix, &nodes, "wr", false);
        set_pin(&mut matrix, &nodes, "rd", false);
        set_pin(&mut matrix, &nodes, "en", true);
        bridge.load(&mut matrix).unwrap();

        assert_eq!(stamped_value(&matrix, &nodes), 0b1010);
        assert_eq!(bridge.peek(5), Some(0b1010));
    }
}
