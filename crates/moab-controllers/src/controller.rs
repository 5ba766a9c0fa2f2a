//! The [`Controller`] capability and [`ControllerKind`], the tagged variant
//! over the fixed set of policies.

use moab_types::{Action, State};

use crate::brain::BrainController;
use crate::classic::PidBalancer;
use crate::manual::ManualController;
use crate::zero::ZeroController;

/// A policy mapping an observed [`State`] to an [`Action`].
///
/// Called once per control tick, so implementations must return within the
/// control period.  Failures are absorbed by the implementation and turned
/// into a safe action; the run loop never sees a controller error.
pub trait Controller: Send {
    /// Short name for logs, e.g. `"pid"`.
    fn name(&self) -> &str;

    fn invoke(&mut self, state: &State) -> Action;
}

/// One of the built-in controllers, or a caller-supplied one registered at
/// startup.
pub enum ControllerKind {
    Zero(ZeroController),
    Pid(PidBalancer),
    Brain(BrainController),
    Manual(ManualController),
    Custom(Box<dyn Controller>),
}

impl Controller for ControllerKind {
    fn name(&self) -> &str {
        match self {
            ControllerKind::Zero(c) => c.name(),
            ControllerKind::Pid(c) => c.name(),
            ControllerKind::Brain(c) => c.name(),
            ControllerKind::Manual(c) => c.name(),
            ControllerKind::Custom(c) => c.name(),
        }
    }

    fn invoke(&mut self, state: &State) -> Action {
        match self {
            ControllerKind::Zero(c) => c.invoke(state),
            ControllerKind::Pid(c) => c.invoke(state),
            ControllerKind::Brain(c) => c.invoke(state),
            ControllerKind::Manual(c) => c.invoke(state),
            ControllerKind::Custom(c) => c.invoke(state),
        }
    }
}

impl std::fmt::Debug for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ControllerKind").field(&self.name()).finish()
    }
}
