//! Per-user stores for devices and policies.
//!
//! Both stores are injected behind traits so a persistent or sharded backend
//! can replace the in-memory defaults. All state is partitioned by [`UserId`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use attune_types::{DeviceId, Policy, PolicyId, SmartDevice, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("policy {0} already exists")]
    DuplicatePolicy(PolicyId),
    #[error("policy {policy} not found for user {user}")]
    PolicyNotFound { user: UserId, policy: PolicyId },
}

/// Last-known state of a user's controllable devices.
pub trait DeviceRegistry: Send + Sync {
    /// Inserts or wholly replaces the record for `(device.user_id, device.device_id)`.
    fn upsert(&self, device: SmartDevice);

    fn list(&self, user: &UserId) -> Vec<SmartDevice>;

    fn get(&self, user: &UserId, device: &DeviceId) -> Option<SmartDevice>;

    /// Read-modify-write of one record, serialized against every other write
    /// to that record. Returns `false` when the device is not registered.
    fn update(
        &self,
        user: &UserId,
        device: &DeviceId,
        apply: &mut dyn FnMut(&mut SmartDevice),
    ) -> bool;
}

/// Conditional automation rules, append-only apart from the active flag.
pub trait PolicyStore: Send + Sync {
    fn insert(&self, policy: Policy) -> Result<(), StoreError>;

    /// All policies of `user` in creation order.
    fn list(&self, user: &UserId) -> Vec<Policy>;

    fn set_active(&self, user: &UserId, policy: PolicyId, active: bool) -> Result<(), StoreError>;

    fn active(&self, user: &UserId) -> Vec<Policy> {
        self.list(user)
            .into_iter()
            .filter(|policy| policy.is_active)
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Devices keyed by user, then device id. Insertion order is kept per user.
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: Mutex<HashMap<UserId, Vec<SmartDevice>>>,
}

impl InMemoryDeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceRegistry for InMemoryDeviceRegistry {
    fn upsert(&self, device: SmartDevice) {
        let mut devices = lock(&self.devices);
        let entries = devices.entry(device.user_id.clone()).or_default();
        match entries
            .iter_mut()
            .find(|existing| existing.device_id == device.device_id)
        {
            Some(existing) => {
                tracing::debug!(
                    user_id = %device.user_id,
                    device_id = %device.device_id,
                    "Replacing device record"
                );
                *existing = device;
            }
            None => {
                tracing::debug!(
                    user_id = %device.user_id,
                    device_id = %device.device_id,
                    "Registering device"
                );
                entries.push(device);
            }
        }
    }

    fn list(&self, user: &UserId) -> Vec<SmartDevice> {
        lock(&self.devices).get(user).cloned().unwrap_or_default()
    }

    fn get(&self, user: &UserId, device: &DeviceId) -> Option<SmartDevice> {
        lock(&self.devices)
            .get(user)?
            .iter()
            .find(|existing| &existing.device_id == device)
            .cloned()
    }

    fn update(
        &self,
        user: &UserId,
        device: &DeviceId,
        apply: &mut dyn FnMut(&mut SmartDevice),
    ) -> bool {
        let mut devices = lock(&self.devices);
        let Some(record) = devices
            .get_mut(user)
            .and_then(|entries| entries.iter_mut().find(|d| &d.device_id == device))
        else {
            return false;
        };
        apply(record);
        true
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: Mutex<HashMap<UserId, Vec<Policy>>>,
}

impl InMemoryPolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn insert(&self, policy: Policy) -> Result<(), StoreError> {
        let mut policies = lock(&self.policies);
        let duplicate = policies
            .values()
            .flatten()
            .any(|existing| existing.id == policy.id);
        if duplicate {
            return Err(StoreError::DuplicatePolicy(policy.id));
        }
        tracing::debug!(user_id = %policy.user_id, policy = %policy.policy_name, "Creating policy");
        policies
            .entry(policy.user_id.clone())
            .or_default()
            .push(policy);
        Ok(())
    }

    fn list(&self, user: &UserId) -> Vec<Policy> {
        lock(&self.policies).get(user).cloned().unwrap_or_default()
    }

    fn set_active(&self, user: &UserId, policy: PolicyId, active: bool) -> Result<(), StoreError> {
        let mut policies = lock(&self.policies);
        let record = policies
            .get_mut(user)
            .and_then(|entries| entries.iter_mut().find(|p| p.id == policy))
            .ok_or_else(|| StoreError::PolicyNotFound {
                user: user.clone(),
                policy,
            })?;
        record.is_active = active;
        Ok(())
    }
}
