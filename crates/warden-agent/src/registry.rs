use std::collections::BTreeMap;

use crate::instance::Instance;

/// Bookkeeping of supervised instances, keyed by port.
///
/// A port is in `active` or `pending_removal`, never both: `retire` moves the
/// whole Instance across in one step, and the pending side keeps ownership
/// until final cleanup drains it. Pure in-memory state, touched only from the
/// supervisor's own task.
#[derive(Debug, Default)]
pub struct Registry {
    active: BTreeMap<u16, Instance>,
    pending_removal: BTreeMap<u16, Instance>,
}

impl Registry {
    pub fn is_active(&self, port: u16) -> bool {
        self.active.contains_key(&port)
    }

    pub fn is_pending_removal(&self, port: u16) -> bool {
        self.pending_removal.contains_key(&port)
    }

    pub fn active_is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.pending_removal.is_empty()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn active_ports(&self) -> Vec<u16> {
        self.active.keys().copied().collect()
    }

    /// Every port still owned by the registry, active or pending.
    pub fn remaining_ports(&self) -> Vec<u16> {
        self.active
            .keys()
            .chain(self.pending_removal.keys())
            .copied()
            .collect()
    }

    pub fn get_active_mut(&mut self, port: u16) -> Option<&mut Instance> {
        self.active.get_mut(&port)
    }

    /// Registers a freshly launched instance.
    pub fn insert(&mut self, instance: Instance) {
        let port = instance.port();
        debug_assert!(!self.pending_removal.contains_key(&port));
        self.active.insert(port, instance);
    }

    /// Atomically moves a port out of active supervision into the
    /// pending-removal set.
    pub fn retire(&mut self, port: u16) {
        if let Some(instance) = self.active.remove(&port) {
            self.pending_removal.insert(port, instance);
        }
    }

    /// Takes every pending instance for final cleanup.
    pub fn drain_pending(&mut self) -> Vec<(u16, Instance)> {
        std::mem::take(&mut self.pending_removal).into_iter().collect()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn retire_moves_port_between_containers() {
        let mut registry = Registry::default();
        let mut inst = testutil::cat_instance(25565).await;
        inst.process.kill_forced();
        registry.insert(inst);

        assert!(registry.is_active(25565));
        assert!(!registry.is_pending_removal(25565));

        registry.retire(25565);
        assert!(!registry.is_active(25565));
        assert!(registry.is_pending_removal(25565));
        assert_eq!(registry.remaining_ports(), vec![25565]);

        let drained = registry.drain_pending();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, 25565);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn retiring_one_port_leaves_the_others_active() {
        let mut registry = Registry::default();
        for port in [25570, 25571] {
            let mut inst = testutil::cat_instance(port).await;
            inst.process.kill_forced();
            registry.insert(inst);
        }

        registry.retire(25570);
        assert!(!registry.is_active(25570));
        assert!(registry.is_pending_removal(25570));
        assert!(registry.is_active(25571));
        assert!(!registry.is_pending_removal(25571));
        assert_eq!(registry.active_ports(), vec![25571]);
        assert_eq!(registry.remaining_ports(), vec![25571, 25570]);
    }

    #[tokio::test]
    async fn retire_of_unknown_port_is_a_noop() {
        let mut registry = Registry::default();
        registry.retire(1234);
        assert!(registry.is_empty());
        assert!(registry.drain_pending().is_empty());
    }
}
