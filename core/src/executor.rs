//! Device command dispatch with per-attempt timeouts and bounded retries.
//!
//! # Retry policy
//!
//! - Every attempt runs under `tokio::time::timeout(command_timeout)`, shortened
//!   to whatever is left of the caller's deadline.
//! - `ExecutionError` and timeouts are retried up to `max_retries` times.
//! - `DeviceNotFound` is final on the first attempt.
//! - Backoff is exponential from `initial_backoff`, capped at `max_backoff`,
//!   with down-jitter of up to `jitter_factor`.
//! - Once the deadline has passed, remaining actions record `TimedOut` without
//!   being dispatched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use attune_types::{
    ActionOutcome, CommandOutcome, CommandParameters, DeviceAction, DeviceCommand, DeviceId,
    ExecutionBudget, OrchestrationResult, Policy, UserId,
};

use crate::clock::Clock;
use crate::store::DeviceRegistry;

/// Binding to whatever actually controls a device.
pub trait DeviceAdapter: Send + Sync {
    fn dispatch(
        &self,
        user: &UserId,
        device: &DeviceId,
        command: DeviceCommand,
        parameters: &CommandParameters,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CommandOutcome> + Send;
}

/// Applies commands to the last-known state held in a [`DeviceRegistry`].
///
/// No physical device is contacted. The parameters are merged into the
/// device's state bag and the command is stamped on it.
#[derive(Clone)]
pub struct RegistryAdapter {
    registry: Arc<dyn DeviceRegistry>,
}

impl RegistryAdapter {
    #[must_use]
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { registry }
    }
}

impl std::fmt::Debug for RegistryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAdapter").finish_non_exhaustive()
    }
}

impl DeviceAdapter for RegistryAdapter {
    async fn dispatch(
        &self,
        user: &UserId,
        device: &DeviceId,
        command: DeviceCommand,
        parameters: &CommandParameters,
        at: DateTime<Utc>,
    ) -> CommandOutcome {
        let found = self.registry.update(user, device, &mut |record| {
            record.apply_command(command, parameters, at);
        });
        if found {
            CommandOutcome::Success
        } else {
            CommandOutcome::DeviceNotFound
        }
    }
}

/// Delay before retry number `backoff_step + 1`.
///
/// `initial_backoff * 2^backoff_step`, capped at `max_backoff`, then multiplied
/// by a random factor in `[1 - jitter_factor, 1.0]`.
#[must_use]
pub fn backoff_delay(backoff_step: u32, budget: &ExecutionBudget) -> Duration {
    let exponent = i32::try_from(backoff_step).unwrap_or(i32::MAX);
    let base = budget.initial_backoff().as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(budget.max_backoff().as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * budget.jitter_factor();
    Duration::from_secs_f64((capped * jitter).max(0.0))
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
}

/// Runs the actions of a matched policy in order.
pub struct PolicyExecutor<A> {
    adapter: A,
    budget: ExecutionBudget,
    clock: Arc<dyn Clock>,
}

impl<A> std::fmt::Debug for PolicyExecutor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyExecutor")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl<A: DeviceAdapter> PolicyExecutor<A> {
    #[must_use]
    pub fn new(adapter: A, budget: ExecutionBudget, clock: Arc<dyn Clock>) -> Self {
        Self {
            adapter,
            budget,
            clock,
        }
    }

    #[must_use]
    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Executes every action of `policy` without a deadline.
    pub async fn execute(&self, user: &UserId, policy: &Policy) -> OrchestrationResult {
        self.execute_at(user, policy, self.clock.now(), None).await
    }

    /// Executes every action of `policy`, stamping the result with
    /// `triggered_at`. A failing action never stops the ones after it.
    pub async fn execute_at(
        &self,
        user: &UserId,
        policy: &Policy,
        triggered_at: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> OrchestrationResult {
        let mut actions = Vec::with_capacity(policy.actions.len());
        for action in &policy.actions {
            let outcome = self.run_action(user, action, deadline).await;
            if let Some(error) = outcome.error_message() {
                tracing::warn!(
                    user_id = %user,
                    policy = %policy.policy_name,
                    device_id = %action.device_id,
                    command = action.command.as_str(),
                    error = %error,
                    "Device action failed"
                );
            }
            actions.push(ActionOutcome {
                device_id: action.device_id.clone(),
                command: action.command,
                outcome,
            });
        }
        OrchestrationResult {
            policy_id: policy.id,
            policy_name: policy.policy_name.clone(),
            triggered_at,
            actions,
        }
    }

    async fn run_action(
        &self,
        user: &UserId,
        action: &DeviceAction,
        deadline: Option<Instant>,
    ) -> CommandOutcome {
        let mut attempts: u32 = 0;
        loop {
            let limit = match remaining(deadline) {
                Some(left) => self.budget.command_timeout().min(left),
                None => self.budget.command_timeout(),
            };
            if limit.is_zero() {
                return CommandOutcome::TimedOut { attempts };
            }

            attempts += 1;
            let dispatch = self.adapter.dispatch(
                user,
                &action.device_id,
                action.command,
                &action.parameters,
                self.clock.now(),
            );
            let outcome = tokio::time::timeout(limit, dispatch)
                .await
                .unwrap_or(CommandOutcome::TimedOut { attempts });

            if !outcome.is_retryable() || attempts > self.budget.max_retries() {
                return outcome;
            }

            let delay = backoff_delay(attempts - 1, &self.budget);
            if remaining(deadline).is_some_and(|left| left <= delay) {
                return outcome;
            }
            tracing::debug!(
                device_id = %action.device_id,
                retry_count = attempts,
                delay_ms = delay.as_millis(),
                "Retrying device command"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
