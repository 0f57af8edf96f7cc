use std::sync::OnceLock;

use log::debug;
use rustls::{SignatureAlgorithm, SignatureScheme};

use crate::registry::KeyContextRegistry;
use crate::verbose;

/// The key algorithm families whose signing operation can be offloaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyFamily {
    Rsa,
    Ec,
}

impl KeyFamily {
    pub(crate) fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Rsa => SignatureAlgorithm::RSA,
            Self::Ec => SignatureAlgorithm::ECDSA,
        }
    }
}

/// Signature schemes usable with offloaded RSA keys, in preference order.
///
/// The engine serves TLS 1.3 only, so the PKCS#1 v1.5 schemes never apply.
static RSA_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::RSA_PSS_SHA256,
    SignatureScheme::RSA_PSS_SHA384,
    SignatureScheme::RSA_PSS_SHA512,
];

/// Signature schemes usable with offloaded ECDSA keys. The session binder
/// narrows this to the single scheme matching the certificate curve.
static EC_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
    SignatureScheme::ECDSA_NISTP521_SHA512,
];

/// A method table for one algorithm family.
///
/// Only the final signature computation is replaced; scheme negotiation,
/// transcript hashing and signature encoding rules stay with rustls, driven
/// by the schemes listed here.
pub(crate) struct MethodOverride {
    pub(crate) family: KeyFamily,
    pub(crate) schemes: &'static [SignatureScheme],
}

/// Process-wide registrar for the offload machinery.
///
/// Holds the key-context registry and one [`MethodOverride`] per supported
/// family, discoverable by family. Initialized lazily on first use and never
/// torn down; `OnceLock` makes concurrent first use race-free and guarantees
/// the registry slots are allocated exactly once per process.
pub(crate) struct Engine {
    pub(crate) registry: KeyContextRegistry,
    methods: [MethodOverride; 2],
}

impl Engine {
    pub(crate) fn get() -> &'static Self {
        static ENGINE: OnceLock<Engine> = OnceLock::new();
        ENGINE.get_or_init(|| {
            if verbose::enabled() {
                debug!("initializing signing offload engine");
            }
            Self::new()
        })
    }

    fn new() -> Self {
        Self {
            registry: KeyContextRegistry::new(),
            methods: [
                MethodOverride {
                    family: KeyFamily::Rsa,
                    schemes: RSA_SCHEMES,
                },
                MethodOverride {
                    family: KeyFamily::Ec,
                    schemes: EC_SCHEMES,
                },
            ],
        }
    }

    /// Enumerate the supported families.
    pub(crate) fn families(&self) -> impl Iterator<Item = KeyFamily> + '_ {
        self.methods.iter().map(|method| method.family)
    }

    /// The method table for `family`, or absent if unsupported.
    pub(crate) fn method_for(&self, family: KeyFamily) -> Option<&MethodOverride> {
        self.methods
            .iter()
            .find(|method| method.family == family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_a_singleton() {
        let a = Engine::get() as *const Engine as usize;
        let b = std::thread::spawn(|| Engine::get() as *const Engine as usize)
            .join()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn discovery_enumerates_both_families() {
        let families: Vec<_> = Engine::get().families().collect();
        assert_eq!(families, vec![KeyFamily::Rsa, KeyFamily::Ec]);
    }

    #[test]
    fn method_tables_replace_only_signing() {
        let engine = Engine::get();

        let rsa = engine.method_for(KeyFamily::Rsa).unwrap();
        assert_eq!(rsa.schemes, RSA_SCHEMES);

        let ec = engine.method_for(KeyFamily::Ec).unwrap();
        assert!(ec
            .schemes
            .contains(&SignatureScheme::ECDSA_NISTP256_SHA256));
    }
}
