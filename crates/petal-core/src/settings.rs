//! Application-wide container policies.

use serde::{Deserialize, Serialize};

/// What resolving a component does after its provider has stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedComponentPolicy {
    /// Resolution fails with
    /// [`ContainerError::ComponentStopped`](crate::ContainerError::ComponentStopped).
    /// The key remains listed by `keys()`.
    #[default]
    Raise,
    /// Resolution returns the stopped instance, which reports its own
    /// stopped state.
    Tombstone,
}

/// What happens after a lazily loaded component fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// The next resolution tries to load the file again.
    #[default]
    Retry,
    /// The first failure is remembered and returned for every later
    /// resolution without touching the file again.
    StrictOnce,
}

/// Container-wide settings, fixed when the application is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Post-stop resolution behaviour.
    #[serde(default)]
    pub stopped_components: StoppedComponentPolicy,
    /// Lazy load failure behaviour.
    #[serde(default)]
    pub load_failures: LoadFailurePolicy,
}

impl ContainerSettings {
    /// Sets the stopped component policy.
    pub fn stopped_components(mut self, policy: StoppedComponentPolicy) -> Self {
        self.stopped_components = policy;
        self
    }

    /// Sets the load failure policy.
    pub fn load_failures(mut self, policy: LoadFailurePolicy) -> Self {
        self.load_failures = policy;
        self
    }
}
