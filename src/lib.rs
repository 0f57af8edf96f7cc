//! # tls-offload - external signing for rustls servers
//!
//! This crate lets a rustls server present a certificate whose private key
//! never exists in process memory in usable form. Every signature required
//! during the TLS handshake is produced by an externally supplied signer:
//! a hardware security module, a remote KMS, or an out-of-process key
//! custodian. rustls sees an ordinary [`SigningKey`]; in reality that key is
//! a stand-in that forwards each signing request to opaque, caller-provided
//! logic.
//!
//! ## Usage
//!
//! Implement [`ExternalSigner`] (or wrap a closure with [`signer_from_fn`]),
//! then bind it to the server certificate:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tls_offload::{offload_signing, signer_from_fn};
//!
//! let signer = signer_from_fn(|_digest, _out| {
//!     // forward the digest to the key custodian; see `ExternalSigner::sign`
//!     // for the two-phase buffer-sizing contract.
//!     todo!()
//! });
//!
//! let cert_pem = std::fs::read_to_string("cert.pem").unwrap();
//! let config = offload_signing(&signer, &cert_pem).unwrap();
//! let server = rustls::ServerConnection::new(Arc::new(config)).unwrap();
//! ```
//!
//! RSA and ECDSA (P-256, P-384, P-521) certificate keys are supported. The
//! returned `ServerConfig` negotiates TLS 1.3 only.
//!
//! Scheme negotiation, transcript hashing and signature encoding remain
//! rustls's responsibility; only the final signature computation is
//! delegated. The signer receives the pre-hashed payload for the negotiated
//! scheme, never the raw transcript.
//!
//! ## Lifetime of the signer
//!
//! The engine never owns the signer: it keeps a non-owning reference for as
//! long as the bound key exists. Keep at least one `Arc` to the signer alive
//! while any `ServerConfig` produced from it is serving; once the last
//! caller-held `Arc` is dropped, in-flight configs stay valid but every
//! subsequent handshake fails cleanly at the signing step.
//!
//! Setting the `TLS_OFFLOAD_LOGGING` environment variable (to any value,
//! including the empty string) traces the bind and signing sequences through
//! the [`log`] crate at debug level.
//!
//! [`SigningKey`]: rustls::sign::SigningKey

#![forbid(unsafe_code)]
#![warn(
    elided_lifetimes_in_paths,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_import_braces,
    unused_qualifications
)]

mod bind;
mod engine;
mod error;
mod key;
mod registry;
mod signer;
mod verbose;

pub use bind::{offload_signing, offloaded_key};
pub use error::OffloadError;
pub use signer::{signer_from_fn, ExternalSigner};
