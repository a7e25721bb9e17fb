//! Stochastic state collapse.
//!
//! Each feature in a [`DecisionContext`] triggers one observation from the
//! engine's [`RandomSource`]. Observations are quantized into [`Trit`]s, the
//! majority trit is routed together with the entanglement flag into a
//! [`DecisionAction`].
//!
//! The observation does not depend on the feature's value: `features` only
//! sets how many trits are drawn.
//!
//! An empty feature vector draws nothing. All counts tie at zero, the
//! tie-break picks [`Trit::True`] and confidence is reported as 0.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use attune_types::{DecisionAction, DecisionContext, DecisionResult, QuatState, Trit};

use crate::random::{RandomSource, RngSource};

/// Observations below this collapse to [`Trit::False`].
pub const FALSE_CUTOFF: f64 = 0.33;
/// Observations at or above this collapse to [`Trit::Superposition`].
pub const SUPERPOSITION_CUTOFF: f64 = 0.66;

#[must_use]
pub fn collapse_observation(observation: f64) -> Trit {
    if observation < FALSE_CUTOFF {
        Trit::False
    } else if observation < SUPERPOSITION_CUTOFF {
        Trit::True
    } else {
        Trit::Superposition
    }
}

/// Per-trit tally for one decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TritCounts {
    pub false_count: usize,
    pub true_count: usize,
    pub superposition_count: usize,
}

impl TritCounts {
    pub fn record(&mut self, trit: Trit) {
        match trit {
            Trit::False => self.false_count += 1,
            Trit::True => self.true_count += 1,
            Trit::Superposition => self.superposition_count += 1,
        }
    }

    #[must_use]
    pub fn count(&self, trit: Trit) -> usize {
        match trit {
            Trit::False => self.false_count,
            Trit::True => self.true_count,
            Trit::Superposition => self.superposition_count,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.false_count + self.true_count + self.superposition_count
    }

    /// Highest count wins; ties go to the earlier entry of [`Trit::PRIORITY`].
    #[must_use]
    pub fn majority(&self) -> Trit {
        let mut best = Trit::PRIORITY[0];
        for trit in Trit::PRIORITY {
            if self.count(trit) > self.count(best) {
                best = trit;
            }
        }
        best
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(self.majority()) as f64 / total as f64
    }
}

#[must_use]
pub fn route(entangled: bool, majority: Trit) -> (DecisionAction, Option<QuatState>) {
    match (entangled, majority) {
        (true, Trit::True) => (DecisionAction::OrchestrateSync, Some(QuatState::Entanglement)),
        (false, Trit::True) => (DecisionAction::ProceedLocal, None),
        (_, Trit::False) => (DecisionAction::SkipLocal, None),
        (_, Trit::Superposition) => (DecisionAction::DeferUntilCollapse, None),
    }
}

pub struct CollapseEngine {
    source: Mutex<Box<dyn RandomSource>>,
}

impl fmt::Debug for CollapseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollapseEngine").finish_non_exhaustive()
    }
}

impl Default for CollapseEngine {
    fn default() -> Self {
        Self::new(RngSource::from_entropy())
    }
}

impl CollapseEngine {
    #[must_use]
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    #[must_use]
    pub fn from_boxed(source: Box<dyn RandomSource>) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(RngSource::seeded(seed))
    }

    /// Draws one trit per feature from the held source.
    fn observe(&self, feature_count: usize) -> TritCounts {
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        let mut counts = TritCounts::default();
        for index in 0..feature_count {
            let observation = source.next_f64();
            let trit = collapse_observation(observation);
            tracing::debug!(index, observation, trit = trit.as_str(), "Collapsed observation");
            counts.record(trit);
        }
        counts
    }

    #[must_use]
    pub fn decide(&self, context: &DecisionContext) -> DecisionResult {
        let counts = self.observe(context.features.len());
        let majority = counts.majority();
        let confidence = counts.confidence();
        let entangled = context.is_entangled();
        let (action, quat_state) = route(entangled, majority);

        let rationale = if counts.total() == 0 {
            format!(
                "No features to observe; defaulted to {} with zero confidence, routed to {}",
                majority.as_str(),
                action.as_str()
            )
        } else {
            let scope = if entangled {
                let devices = context.device_ids.as_ref().map_or(0, |ids| ids.len());
                format!("entangled across {devices} devices")
            } else {
                "local context".to_string()
            };
            format!(
                "{}/{} observations collapsed to {} in {scope}, routed to {}",
                counts.count(majority),
                counts.total(),
                majority.as_str(),
                action.as_str()
            )
        };

        tracing::info!(
            user_id = %context.user_id,
            action = action.as_str(),
            confidence,
            majority = majority.as_str(),
            entangled,
            "Decision collapsed"
        );

        DecisionResult::new(action, confidence, majority, quat_state, rationale)
    }
}
