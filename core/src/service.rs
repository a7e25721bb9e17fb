//! The `Attune` service facade.
//!
//! Wires the collapse engine, friction model, stores, evaluator and executor
//! together behind the operations callers use. Stores, randomness, the clock
//! and the device adapter are injected through [`AttuneBuilder`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use attune_types::{
    DecisionContext, DecisionRecord, DecisionResult, EmotionVector, ExecutionBudget,
    FrictionMetrics, FrictionReport, FrictionScore, OrchestrationResult, Policy, PolicyId,
    Settings, SmartDevice, UserId,
};

use crate::clock::{Clock, SystemClock};
use crate::collapse::CollapseEngine;
use crate::executor::{DeviceAdapter, PolicyExecutor, RegistryAdapter};
use crate::friction::FrictionModel;
use crate::history::{DecisionAudit, InMemoryOrchestrationLog, OrchestrationLog};
use crate::policy::PolicyEvaluator;
use crate::random::{RandomSource, RngSource};
use crate::store::{
    DeviceRegistry, InMemoryDeviceRegistry, InMemoryPolicyStore, PolicyStore, StoreError,
};

pub struct Attune<A = RegistryAdapter> {
    engine: CollapseEngine,
    friction: FrictionModel,
    evaluator: PolicyEvaluator,
    executor: PolicyExecutor<A>,
    devices: Arc<dyn DeviceRegistry>,
    policies: Arc<dyn PolicyStore>,
    history: Arc<dyn OrchestrationLog>,
    audit: DecisionAudit,
    clock: Arc<dyn Clock>,
    history_limit: usize,
    deadline: Option<Duration>,
}

impl<A> std::fmt::Debug for Attune<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attune")
            .field("history_limit", &self.history_limit)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Attune {
    #[must_use]
    pub fn builder() -> AttuneBuilder {
        AttuneBuilder::default()
    }

    /// In-memory stores, system clock, and the registry-backed adapter.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        AttuneBuilder::from_settings(settings).build()
    }
}

impl<A: DeviceAdapter> Attune<A> {
    /// Collapses `context` into a decision and records it in the audit trail.
    pub fn decide(&self, context: &DecisionContext) -> DecisionResult {
        let result = self.engine.decide(context);
        self.audit.record(DecisionRecord::from_result(
            context.user_id.clone(),
            &result,
            self.clock.now(),
        ));
        result
    }

    #[must_use]
    pub fn calculate_friction(&self, metrics: &FrictionMetrics) -> FrictionReport {
        FrictionReport {
            friction_score: self.friction.calculate(metrics),
        }
    }

    /// Upserts by `(user_id, device_id)`. A record without `last_synced_at`
    /// is stamped with the current time.
    pub fn register_device(&self, mut device: SmartDevice) {
        if device.last_synced_at.is_none() {
            device.last_synced_at = Some(self.clock.now());
        }
        self.devices.upsert(device);
    }

    #[must_use]
    pub fn get_devices(&self, user: &UserId) -> Vec<SmartDevice> {
        self.devices.list(user)
    }

    pub fn create_policy(&self, policy: Policy) -> Result<PolicyId, StoreError> {
        let id = policy.id;
        self.policies.insert(policy)?;
        Ok(id)
    }

    /// Inactive policies stay listed but are skipped by orchestration.
    pub fn deactivate_policy(&self, user: &UserId, policy: PolicyId) -> Result<(), StoreError> {
        self.policies.set_active(user, policy, false)?;
        tracing::info!(user_id = %user, policy_id = %policy, "Policy deactivated");
        Ok(())
    }

    #[must_use]
    pub fn get_policies(&self, user: &UserId) -> Vec<Policy> {
        self.policies.list(user)
    }

    /// Evaluates every active policy of `user` and executes the matches.
    ///
    /// Uses the configured orchestration deadline, if any. Only matched
    /// policies produce a result; each result is also appended to history.
    pub async fn orchestrate(
        &self,
        user: &UserId,
        emotions: &EmotionVector,
        friction: FrictionScore,
    ) -> Vec<OrchestrationResult> {
        let deadline = self
            .deadline
            .and_then(|budget| Instant::now().checked_add(budget));
        self.run_orchestration(user, emotions, friction, deadline)
            .await
    }

    /// Like [`Attune::orchestrate`], but every action still pending when
    /// `budget` elapses is recorded as timed out without being dispatched.
    /// A budget too large to represent as an instant means no deadline.
    pub async fn orchestrate_with_deadline(
        &self,
        user: &UserId,
        emotions: &EmotionVector,
        friction: FrictionScore,
        budget: Duration,
    ) -> Vec<OrchestrationResult> {
        let deadline = Instant::now().checked_add(budget);
        self.run_orchestration(user, emotions, friction, deadline)
            .await
    }

    async fn run_orchestration(
        &self,
        user: &UserId,
        emotions: &EmotionVector,
        friction: FrictionScore,
        deadline: Option<Instant>,
    ) -> Vec<OrchestrationResult> {
        let triggered_at = self.clock.now();
        let now = self.clock.local_time_of_day();
        let active = self.policies.active(user);

        let mut results = Vec::new();
        for policy in &active {
            if !self
                .evaluator
                .matches(&policy.condition, emotions, friction, &now)
            {
                continue;
            }
            tracing::debug!(user_id = %user, policy = %policy.policy_name, "Policy matched");
            let result = self
                .executor
                .execute_at(user, policy, triggered_at, deadline)
                .await;
            self.history.append(user, result.clone());
            results.push(result);
        }

        tracing::info!(
            user_id = %user,
            active = active.len(),
            matched = results.len(),
            "Orchestration complete"
        );
        results
    }

    /// The most recent orchestration results, oldest first. `None` uses the
    /// configured default limit.
    #[must_use]
    pub fn get_history(&self, user: &UserId, limit: Option<usize>) -> Vec<OrchestrationResult> {
        self.history
            .recent(user, limit.unwrap_or(self.history_limit))
    }

    #[must_use]
    pub fn decision_audit(&self, user: &UserId, limit: usize) -> Vec<DecisionRecord> {
        self.audit.recent(user, limit)
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        self.executor.adapter()
    }
}

/// Assembles an [`Attune`]. Anything not set falls back to an in-memory or
/// system default.
#[derive(Default)]
pub struct AttuneBuilder {
    seed: Option<u64>,
    random: Option<Box<dyn RandomSource>>,
    clock: Option<Arc<dyn Clock>>,
    devices: Option<Arc<dyn DeviceRegistry>>,
    policies: Option<Arc<dyn PolicyStore>>,
    history: Option<Arc<dyn OrchestrationLog>>,
    budget: ExecutionBudget,
    history_limit: Option<usize>,
    deadline: Option<Duration>,
}

impl AttuneBuilder {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            seed: settings.collapse_seed,
            budget: settings.budget,
            history_limit: Some(settings.history_limit),
            deadline: settings.orchestration_deadline,
            ..Self::default()
        }
    }

    /// Seeds the default random source. Ignored when a source is injected.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn random_source(mut self, source: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn device_registry(mut self, registry: Arc<dyn DeviceRegistry>) -> Self {
        self.devices = Some(registry);
        self
    }

    #[must_use]
    pub fn policy_store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.policies = Some(store);
        self
    }

    #[must_use]
    pub fn history(mut self, log: Arc<dyn OrchestrationLog>) -> Self {
        self.history = Some(log);
        self
    }

    #[must_use]
    pub fn budget(mut self, budget: ExecutionBudget) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builds with a [`RegistryAdapter`] over the configured device registry.
    #[must_use]
    pub fn build(mut self) -> Attune {
        let devices = self
            .devices
            .get_or_insert_with(|| Arc::new(InMemoryDeviceRegistry::new()))
            .clone();
        self.build_with_adapter(RegistryAdapter::new(devices))
    }

    #[must_use]
    pub fn build_with_adapter<A: DeviceAdapter>(self, adapter: A) -> Attune<A> {
        let engine = match (self.random, self.seed) {
            (Some(source), _) => CollapseEngine::from_boxed(source),
            (None, Some(seed)) => CollapseEngine::new(RngSource::seeded(seed)),
            (None, None) => CollapseEngine::default(),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Attune {
            engine,
            friction: FrictionModel::new(),
            evaluator: PolicyEvaluator::new(),
            executor: PolicyExecutor::new(adapter, self.budget, clock.clone()),
            devices: self
                .devices
                .unwrap_or_else(|| Arc::new(InMemoryDeviceRegistry::new())),
            policies: self
                .policies
                .unwrap_or_else(|| Arc::new(InMemoryPolicyStore::new())),
            history: self
                .history
                .unwrap_or_else(|| Arc::new(InMemoryOrchestrationLog::new())),
            audit: DecisionAudit::new(),
            clock,
            history_limit: self.history_limit.unwrap_or(Settings::DEFAULT_HISTORY_LIMIT),
            deadline: self.deadline,
        }
    }
}
