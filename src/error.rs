use core::fmt;
use std::error::Error as StdError;

/// Failures reported while binding an external signer to a TLS identity.
///
/// Signing-time failures are not represented here: they surface through the
/// rustls [`Signer`] contract as handshake errors for the affected
/// connection only.
///
/// A failed bind leaves no usable `ServerConfig` behind; the caller must
/// not serve with the inputs that produced the error.
///
/// [`Signer`]: rustls::sign::Signer
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffloadError {
    /// The certificate input could not be parsed as PEM/DER.
    BadCertificate(String),

    /// The certificate's public key is neither RSA nor ECDSA over a
    /// supported curve. Carries the offending algorithm or curve OID.
    UnsupportedKeyAlgorithm(String),

    /// The engine has no method table for the key's algorithm family.
    EngineUnavailable,

    /// The signer could not be associated with the key object.
    BindingFailed,
}

impl fmt::Display for OffloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadCertificate(reason) => {
                write!(f, "cannot parse certificate: {reason}")
            }
            Self::UnsupportedKeyAlgorithm(oid) => {
                write!(f, "unsupported public key algorithm: {oid}")
            }
            Self::EngineUnavailable => f.write_str("signing offload engine unavailable"),
            Self::BindingFailed => f.write_str("cannot bind external signer to key"),
        }
    }
}

impl StdError for OffloadError {}
