//! Node map and circuit construction.

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use super::types::{BranchId, NodeId};
use super::validate::validate_components;
use crate::bridge::{Bridge, LogicBridge, MemoryBridge, PinStateEvent};
use crate::components::{ClockInstance, ComponentDescriptor, ComponentKind};
use crate::error::{CosimError, Result};
use crate::routine::load_routine;

/// Bijection between pin names and solver node indices.
///
/// Established once while a circuit is built and immutable for the life of
/// a run. Ground is always node 0; "0" and "GND" both resolve to it.
#[derive(Debug, Default)]
pub struct NodeMap {
    map: HashMap<String, NodeId>,
    names: Vec<String>,
}

impl NodeMap {
    /// Create a node map containing only ground.
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert("0".to_string(), NodeId::GROUND);
        map.insert("GND".to_string(), NodeId::GROUND);
        Self {
            map,
            names: vec!["0".to_string()],
        }
    }

    /// Intern a pin name, allocating a node index on first sight.
    pub fn intern(&mut self, name: &str) -> NodeId {
        let normalized = if name == "GND" { "0" } else { name };
        if let Some(&node) = self.map.get(normalized) {
            return node;
        }
        let node = NodeId(self.names.len());
        self.map.insert(normalized.to_string(), node);
        self.names.push(normalized.to_string());
        node
    }

    /// Resolve a pin name to its node, if present.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        let normalized = if name == "GND" { "0" } else { name };
        self.map.get(normalized).copied()
    }

    /// Matrix row of a node's voltage variable. Ground has no row.
    pub fn matrix_row(&self, node: NodeId) -> Option<usize> {
        if node.is_ground() {
            None
        } else {
            Some(node.0 - 1)
        }
    }

    /// Total node count, ground included.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Name of a node.
    pub fn name(&self, node: NodeId) -> &str {
        &self.names[node.0]
    }
}

/// A complete circuit ready for a transient run: clock sources plus
/// digital bridges resolved onto solver nodes.
#[derive(Debug)]
pub struct Circuit {
    /// Pin-name to node-index bijection
    pub nodes: NodeMap,
    /// Number of branch current variables (clock sources)
    pub num_branches: usize,
    /// Clock sources, stamped by the solver every iteration
    pub clocks: Vec<ClockInstance>,
    /// Digital bridges, loaded in registration order every iteration
    pub bridges: Vec<Bridge>,
}

impl Circuit {
    /// Build a circuit from component descriptors.
    ///
    /// Bridges are created here, once per simulation start. Every failure
    /// path is fatal and happens before any worker thread exists.
    pub fn build(
        components: &[ComponentDescriptor],
        events: &Sender<PinStateEvent>,
    ) -> Result<Self> {
        validate_components(components)?;

        let mut nodes = NodeMap::new();
        for descriptor in components {
            for pin in descriptor.inputs.iter().chain(&descriptor.outputs) {
                nodes.intern(pin);
            }
            nodes.intern(&descriptor.ground);
        }

        // Each digital output owns exactly one solver node.
        let mut owners: HashMap<NodeId, &str> = HashMap::new();
        for descriptor in components {
            for pin in &descriptor.outputs {
                let node = nodes.resolve(pin).ok_or_else(|| CosimError::UnresolvedPin {
                    component: descriptor.name.clone(),
                    pin: pin.clone(),
                })?;
                if let Some(first) = owners.get(&node) {
                    return Err(CosimError::SharedOutputNode {
                        node: pin.clone(),
                        first: first.to_string(),
                        second: descriptor.name.clone(),
                    });
                }
                owners.insert(node, &descriptor.name);
            }
        }

        let mut num_branches = 0usize;
        let mut clocks = Vec::new();
        let mut bridges = Vec::new();

        for descriptor in components {
            match &descriptor.kind {
                ComponentKind::Logic { source } => {
                    let program = load_routine(
                        source,
                        descriptor.inputs.len(),
                        descriptor.outputs.len(),
                        &descriptor.name,
                    )?;
                    let bridge =
                        LogicBridge::new(descriptor, Box::new(program), &nodes, events.clone())?;
                    bridges.push(Bridge::Logic(bridge));
                }

                ComponentKind::Memory {
                    address_bits,
                    cell_bits,
                } => {
                    let bridge = MemoryBridge::new(
                        descriptor,
                        *address_bits,
                        *cell_bits,
                        &nodes,
                        events.clone(),
                    )?;
                    bridges.push(Bridge::Memory(bridge));
                }

                ComponentKind::Clock { pulse } => {
                    if descriptor.outputs.len() != 1 {
                        return Err(CosimError::PinCountMismatch {
                            component: descriptor.name.clone(),
                            direction: "output",
                            expected: 1,
                            got: descriptor.outputs.len(),
                        });
                    }
                    let pin = &descriptor.outputs[0];
                    let node = nodes.resolve(pin).ok_or_else(|| CosimError::UnresolvedPin {
                        component: descriptor.name.clone(),
                        pin: pin.clone(),
                    })?;
                    if node.is_ground() {
                        return Err(CosimError::GroundedOutput {
                            component: descriptor.name.clone(),
                            pin: pin.clone(),
                        });
                    }
                    let ground = nodes.resolve(&descriptor.ground).ok_or_else(|| {
                        CosimError::UnresolvedPin {
                            component: descriptor.name.clone(),
                            pin: descriptor.ground.clone(),
                        }
                    })?;
                    let branch = BranchId(num_branches);
                    num_branches += 1;
                    clocks.push(ClockInstance {
                        name: descriptor.name.clone(),
                        node,
                        ground,
                        branch,
                        pulse: pulse.clone(),
                    });
                }
            }
        }

        Ok(Circuit {
            nodes,
            num_branches,
            clocks,
            bridges,
        })
    }

    /// Dimension of the nodal solution vector.
    pub fn matrix_size(&self) -> usize {
        // Nodes (excluding ground) + branch currents
        (self.nodes.node_count() - 1) + self.num_branches
    }

    /// Matrix row of a branch current variable.
    pub fn branch_row(&self, branch: BranchId) -> usize {
        (self.nodes.node_count() - 1) + branch.0
    }
}
