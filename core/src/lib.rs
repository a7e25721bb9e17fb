//! Core logic for Attune.
//!
//! Decision collapse, friction scoring, policy evaluation and device
//! orchestration. All state lives behind injectable stores partitioned by
//! user; [`Attune`] is the facade that wires them together.

pub mod clock;
pub mod collapse;
pub mod executor;
pub mod friction;
pub mod history;
pub mod policy;
pub mod random;
mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use collapse::{CollapseEngine, TritCounts, collapse_observation};
pub use executor::{DeviceAdapter, PolicyExecutor, RegistryAdapter, backoff_delay};
pub use friction::{FrictionBreakdown, FrictionModel};
pub use history::{DecisionAudit, InMemoryOrchestrationLog, OrchestrationLog};
pub use policy::PolicyEvaluator;
pub use random::{RandomSource, RngSource, SequenceSource};
pub use service::{Attune, AttuneBuilder};
pub use store::{
    DeviceRegistry, InMemoryDeviceRegistry, InMemoryPolicyStore, PolicyStore, StoreError,
};
