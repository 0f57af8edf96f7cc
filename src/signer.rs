use core::fmt;
use std::sync::Arc;

/// An externally implemented signing capability for one private key.
///
/// Implementations typically forward to a hardware token, a remote KMS, or
/// another process holding the key. The call may block; the engine imposes
/// no timeout of its own, so bound handshake latency must come from the
/// implementation (or transport) itself.
///
/// Each signer is bound to exactly one key of one algorithm family, so the
/// applicable algorithm is implicit:
///
/// * ECDSA keys produce a DER-encoded signature over the digest matching the
///   certificate curve (SHA-256 for P-256, SHA-384 for P-384, SHA-512 for
///   P-521).
/// * RSA keys produce an RSASSA-PSS signature with salt length equal to the
///   digest length; the digest length (32, 48 or 64 bytes) identifies the
///   hash.
pub trait ExternalSigner: fmt::Debug + Send + Sync {
    /// Sign `digest`, a pre-hashed payload.
    ///
    /// The call follows a two-phase buffer-sizing convention:
    ///
    /// 1. **Size query**: `signature` is `None`. Return `Some(n)` where `n`
    ///    is the length of the signature this digest will produce. Nothing
    ///    is written.
    /// 2. **Fill**: `signature` is `Some(buf)` with `buf.len()` equal to the
    ///    length reported by the preceding query. Write the signature bytes
    ///    to the front of `buf` and return `Some(written)`.
    ///
    /// Both phases must agree: a fill call must not need more bytes than the
    /// query reported for the same digest. Return `None` to report failure
    /// in either phase; the engine fails that handshake, writes no partial
    /// output, and retries nothing.
    fn sign(&self, digest: &[u8], signature: Option<&mut [u8]>) -> Option<usize>;
}

/// Wrap a function or closure as an [`ExternalSigner`].
///
/// The closure receives the same arguments as [`ExternalSigner::sign`] and
/// must honor the same two-phase contract.
pub fn signer_from_fn<F>(sign: F) -> Arc<dyn ExternalSigner>
where
    F: Fn(&[u8], Option<&mut [u8]>) -> Option<usize> + Send + Sync + 'static,
{
    Arc::new(FnSigner(sign))
}

struct FnSigner<F>(F);

impl<F> fmt::Debug for FnSigner<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSigner")
    }
}

impl<F> ExternalSigner for FnSigner<F>
where
    F: Fn(&[u8], Option<&mut [u8]>) -> Option<usize> + Send + Sync + 'static,
{
    fn sign(&self, digest: &[u8], signature: Option<&mut [u8]>) -> Option<usize> {
        (self.0)(digest, signature)
    }
}
