use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::engine::KeyFamily;
use crate::signer::ExternalSigner;

/// Process-unique identity of one bound key object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct KeyId(u64);

impl KeyId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Associates an external signer with a key object, out of band.
///
/// One slot per algorithm family, allocated once at engine initialization.
/// Entries hold `Weak` references: the registry never owns a signer, it only
/// records the association for the lifetime of the key object. Lookups
/// during concurrent handshakes take the read side of the lock only.
pub(crate) struct KeyContextRegistry {
    rsa: RwLock<HashMap<KeyId, Weak<dyn ExternalSigner>>>,
    ec: RwLock<HashMap<KeyId, Weak<dyn ExternalSigner>>>,
}

impl KeyContextRegistry {
    pub(crate) fn new() -> Self {
        Self {
            rsa: RwLock::new(HashMap::new()),
            ec: RwLock::new(HashMap::new()),
        }
    }

    fn slot(&self, family: KeyFamily) -> &RwLock<HashMap<KeyId, Weak<dyn ExternalSigner>>> {
        match family {
            KeyFamily::Rsa => &self.rsa,
            KeyFamily::Ec => &self.ec,
        }
    }

    /// Record the association `id` -> `handle`.
    ///
    /// Must complete before the key object is visible to any handshake; the
    /// session binder attaches before the `ServerConfig` is constructed.
    pub(crate) fn attach(
        &self,
        family: KeyFamily,
        id: KeyId,
        handle: &Arc<dyn ExternalSigner>,
    ) -> bool {
        let Ok(mut slot) = self.slot(family).write() else {
            return false;
        };
        slot.insert(id, Arc::downgrade(handle));
        true
    }

    /// Resolve the signer bound to `id`, if the key is still attached and
    /// the caller still holds the signer alive.
    pub(crate) fn lookup(&self, family: KeyFamily, id: KeyId) -> Option<Arc<dyn ExternalSigner>> {
        self.slot(family).read().ok()?.get(&id)?.upgrade()
    }

    /// Drop the association for `id`. Called when the key object is dropped.
    pub(crate) fn detach(&self, family: KeyFamily, id: KeyId) {
        if let Ok(mut slot) = self.slot(family).write() {
            slot.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::signer_from_fn;

    #[test]
    fn attach_then_lookup() {
        let registry = KeyContextRegistry::new();
        let handle = signer_from_fn(|_, _| Some(0));
        let id = KeyId::next();

        assert!(registry.attach(KeyFamily::Ec, id, &handle));
        assert!(registry.lookup(KeyFamily::Ec, id).is_some());
        // same id in the other family's slot resolves nothing
        assert!(registry.lookup(KeyFamily::Rsa, id).is_none());
    }

    #[test]
    fn lookup_of_unattached_id_is_absent() {
        let registry = KeyContextRegistry::new();
        assert!(registry.lookup(KeyFamily::Rsa, KeyId::next()).is_none());
    }

    #[test]
    fn detach_removes_association() {
        let registry = KeyContextRegistry::new();
        let handle = signer_from_fn(|_, _| Some(0));
        let id = KeyId::next();

        assert!(registry.attach(KeyFamily::Rsa, id, &handle));
        registry.detach(KeyFamily::Rsa, id);
        assert!(registry.lookup(KeyFamily::Rsa, id).is_none());
    }

    #[test]
    fn registry_does_not_keep_signers_alive() {
        let registry = KeyContextRegistry::new();
        let id = KeyId::next();
        {
            let handle = signer_from_fn(|_, _| Some(0));
            assert!(registry.attach(KeyFamily::Ec, id, &handle));
        }
        // the sole owner dropped its Arc; the entry must not resolve
        assert!(registry.lookup(KeyFamily::Ec, id).is_none());
    }

    #[test]
    fn key_ids_are_unique() {
        let a = KeyId::next();
        let b = KeyId::next();
        assert_ne!(a, b);
    }
}
