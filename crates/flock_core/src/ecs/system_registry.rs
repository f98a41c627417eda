use crate::ecs::{EcsError, SystemDescriptor, SystemFn, SystemHandle};
use std::collections::HashMap;

/// Registered systems, kept sorted by ascending execution order. Ties keep
/// their registration order.
pub(crate) struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
    next_handle: u32,
}

pub(crate) struct RegisteredSystem {
    pub handle: SystemHandle,
    pub descriptor: SystemDescriptor,
    pub callback: Box<SystemFn>,
    pub enabled: bool,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Insert a system, or update the one already registered under the same
    /// name in place (keeping its handle).
    pub fn enable(
        &mut self,
        descriptor: SystemDescriptor,
        callback: Box<SystemFn>,
    ) -> Result<SystemHandle, EcsError> {
        if descriptor.name().is_empty() {
            return Err(EcsError::EmptySystemName);
        }

        if let Some(&handle) = self.name_lookup.get(descriptor.name()) {
            if let Some(system) = self.systems.iter_mut().find(|s| s.handle == handle) {
                tracing::debug!(name = descriptor.name(), %handle, "updated system");
                system.descriptor = descriptor;
                system.callback = callback;
                system.enabled = true;
            }
            self.sort();
            return Ok(handle);
        }

        let handle = SystemHandle::new(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(
            name = descriptor.name(),
            %handle,
            order = descriptor.execution_order(),
            max_threads = descriptor.thread_limit(),
            "enabled system"
        );

        self.name_lookup.insert(descriptor.name().to_string(), handle);
        self.systems.push(RegisteredSystem {
            handle,
            descriptor,
            callback,
            enabled: true,
        });
        self.sort();
        Ok(handle)
    }

    /// Remove a system. Returns `false` if the handle is unknown.
    pub fn disable(&mut self, handle: SystemHandle) -> bool {
        let Some(index) = self.systems.iter().position(|s| s.handle == handle) else {
            return false;
        };
        let removed = self.systems.remove(index);
        self.name_lookup.remove(removed.descriptor.name());
        tracing::debug!(name = removed.descriptor.name(), %handle, "disabled system");
        true
    }

    pub fn disable_by_name(&mut self, name: &str) -> bool {
        match self.name_lookup.get(name) {
            Some(&handle) => self.disable(handle),
            None => false,
        }
    }

    /// Pause or resume a system without forgetting it.
    pub fn set_enabled(&mut self, handle: SystemHandle, enabled: bool) -> bool {
        match self.systems.iter_mut().find(|s| s.handle == handle) {
            Some(system) => {
                system.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| &s.descriptor)
    }

    pub fn is_enabled(&self, handle: SystemHandle) -> Option<bool> {
        self.systems
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.enabled)
    }

    /// Systems in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSystem> {
        self.systems.iter()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn clear(&mut self) {
        self.systems.clear();
        self.name_lookup.clear();
    }

    fn sort(&mut self) {
        // `sort_by_key` is stable
        self.systems
            .sort_by_key(|system| system.descriptor.execution_order());
    }
}
