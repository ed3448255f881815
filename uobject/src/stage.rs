//! How pipeline stages exchange containers.
//!
//! Graph construction and concrete stages live outside this crate; they only rely on
//! the [`Stage`] signature and on [`Handoff`] to pass containers along an edge.

use std::collections::BTreeMap;

use crate::{
    config::ContainerConfig,
    container::{Identity, Phase, UObject},
    error::{Result, UObjectError},
};

/// Containers keyed by port name, e.g. `in`, `out`, `complement`, `in0`, `in1`.
pub type Ports = BTreeMap<String, UObject>;

/// A pipeline step consuming read-phase containers and producing finalized
/// write-phase containers.
pub trait Stage {
    fn input_keys(&self) -> &[&str];

    fn output_keys(&self) -> &[&str];

    /// Runs the stage. `outputs_requested` is a subset of [`Stage::output_keys`];
    /// every returned container must have completed its write.
    fn run(&self, outputs_requested: &[&str], inputs: Ports) -> Result<Ports>;
}

/// Removes the container connected to `key`.
pub fn take_port(ports: &mut Ports, key: &str) -> Result<UObject> {
    ports
        .remove(key)
        .ok_or_else(|| UObjectError::MissingPort(key.to_string()))
}

/// A container travelling along one edge of a pipeline.
#[derive(Debug)]
pub enum Handoff {
    /// The producing instance itself, when both stages share a process.
    Live(UObject),

    /// Only the identity, when the consumer runs elsewhere.
    Published(Identity),
}

impl Handoff {
    /// Publishes the identity of a finalized container, closing nothing.
    pub fn publish(container: &UObject) -> Result<Handoff> {
        if container.phase() != Phase::Write || !container.is_finalized() {
            return Err(UObjectError::NotFinalized);
        }
        Ok(Handoff::Published(container.identity().clone()))
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Handoff::Live(container) => container.identity(),
            Handoff::Published(identity) => identity,
        }
    }

    /// A read-phase container for the consuming stage.
    pub fn into_reader(self, config: &ContainerConfig) -> Result<UObject> {
        match self {
            Handoff::Live(mut container) => {
                container.transition_to_read()?;
                Ok(container)
            }
            Handoff::Published(identity) => {
                UObject::create_with_config(Phase::Read, Some(identity), config.clone())
            }
        }
    }
}

impl From<UObject> for Handoff {
    fn from(container: UObject) -> Self {
        Handoff::Live(container)
    }
}

impl From<Identity> for Handoff {
    fn from(identity: Identity) -> Self {
        Handoff::Published(identity)
    }
}
