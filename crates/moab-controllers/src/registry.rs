//! [`ControllerRegistry`] – name → {factory, icon, text}.
//!
//! Built once at startup and never mutated afterwards.  The standard set is
//! [`ControllerRegistry::standard`]; extra controllers are added through
//! [`ControllerRegistry::builder`].
//!
//! # Example
//!
//! ```rust
//! use moab_controllers::ControllerRegistry;
//! use moab_types::{Icon, Text};
//!
//! let registry = ControllerRegistry::standard();
//! let pid = registry.resolve("pid").unwrap();
//! assert_eq!((pid.icon, pid.text), (Icon::Dot, Text::Classic));
//! assert!(registry.resolve("not-a-real-name").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use moab_types::{Icon, MoabError, Text};

use crate::brain::BrainController;
use crate::classic::PidBalancer;
use crate::config::ControllerConfig;
use crate::controller::ControllerKind;
use crate::manual::ManualController;
use crate::zero::ZeroController;

/// Constructs a controller from the superset configuration.
pub type ControllerFactory =
    Arc<dyn Fn(&ControllerConfig) -> Result<ControllerKind, MoabError> + Send + Sync>;

/// Everything the run loop needs to know about one selectable controller.
#[derive(Clone)]
pub struct ControllerDescriptor {
    pub name: String,
    pub icon: Icon,
    pub text: Text,
    pub factory: ControllerFactory,
}

impl ControllerDescriptor {
    /// Construct the controller for `config`.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error.
    pub fn build(&self, config: &ControllerConfig) -> Result<ControllerKind, MoabError> {
        (self.factory)(config)
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("name", &self.name)
            .field("icon", &self.icon)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// Immutable, ordered set of selectable controllers with unique names.
#[derive(Debug, Clone)]
pub struct ControllerRegistry {
    entries: Vec<ControllerDescriptor>,
}

impl ControllerRegistry {
    pub fn builder() -> ControllerRegistryBuilder {
        ControllerRegistryBuilder::default()
    }

    /// `pid`, `zero`, `brain` and `manual`, in that order.
    pub fn standard() -> Self {
        Self {
            entries: standard_descriptors(),
        }
    }

    /// Look up `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::UnknownController`] listing the accepted names.
    pub fn resolve(&self, name: &str) -> Result<&ControllerDescriptor, MoabError> {
        self.entries
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| MoabError::UnknownController {
                name: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn descriptor(
    name: &str,
    icon: Icon,
    text: Text,
    factory: impl Fn(&ControllerConfig) -> Result<ControllerKind, MoabError> + Send + Sync + 'static,
) -> ControllerDescriptor {
    ControllerDescriptor {
        name: name.to_string(),
        icon,
        text,
        factory: Arc::new(factory),
    }
}

fn standard_descriptors() -> Vec<ControllerDescriptor> {
    vec![
        descriptor("pid", Icon::Dot, Text::Classic, |cfg| {
            Ok(ControllerKind::Pid(PidBalancer::new(cfg.into())))
        }),
        descriptor("zero", Icon::Dot, Text::Blank, |_| {
            Ok(ControllerKind::Zero(ZeroController))
        }),
        descriptor("brain", Icon::Dot, Text::Brain, |cfg| {
            BrainController::new(cfg.into()).map(ControllerKind::Brain)
        }),
        descriptor("manual", Icon::Dot, Text::Manual, |cfg| {
            Ok(ControllerKind::Manual(ManualController::new(cfg.into())))
        }),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Startup-time builder.  Names must be unique; [`build`][Self::build]
/// rejects duplicates.
#[derive(Default)]
pub struct ControllerRegistryBuilder {
    entries: Vec<ControllerDescriptor>,
}

impl ControllerRegistryBuilder {
    /// Start from the standard set.
    pub fn with_standard(mut self) -> Self {
        self.entries.extend(standard_descriptors());
        self
    }

    /// Add a controller.
    pub fn register(
        mut self,
        name: &str,
        icon: Icon,
        text: Text,
        factory: impl Fn(&ControllerConfig) -> Result<ControllerKind, MoabError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.entries.push(descriptor(name, icon, text, factory));
        self
    }

    /// # Errors
    ///
    /// Returns [`MoabError::DuplicateController`] for the first repeated
    /// name.
    pub fn build(self) -> Result<ControllerRegistry, MoabError> {
        for (i, entry) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(MoabError::DuplicateController(entry.name.clone()));
            }
        }
        Ok(ControllerRegistry {
            entries: self.entries,
        })
    }
}
