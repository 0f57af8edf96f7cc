use aws_lc_rs::digest;
use log::{debug, warn};
use rustls::pki_types::{CertificateDer, SubjectPublicKeyInfoDer};
use rustls::sign::{Signer, SigningKey};
use rustls::{Error, SignatureAlgorithm, SignatureScheme};
use x509_cert::der::{Decode, Encode};
use x509_cert::spki::ObjectIdentifier;
use x509_cert::Certificate;

use crate::engine::{Engine, KeyFamily};
use crate::error::OffloadError;
use crate::registry::KeyId;
use crate::verbose;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const RSASSA_PSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// Outcome of classifying a certificate's SubjectPublicKeyInfo.
#[derive(Debug)]
pub(crate) struct ParsedSpki {
    pub(crate) family: KeyFamily,
    /// For EC keys, the single scheme matching the certificate curve.
    pub(crate) curve_scheme: Option<SignatureScheme>,
    /// Re-encoded SPKI; the only key material the engine retains.
    pub(crate) spki: Vec<u8>,
}

/// Locate the public key inside `end_entity` and classify its family.
pub(crate) fn classify_public_key(
    end_entity: &CertificateDer<'_>,
) -> Result<ParsedSpki, OffloadError> {
    let cert = Certificate::from_der(end_entity.as_ref())
        .map_err(|err| OffloadError::BadCertificate(err.to_string()))?;
    let spki = &cert.tbs_certificate.subject_public_key_info;

    let alg = spki.algorithm.oid;
    let (family, curve_scheme) = if alg == RSA_ENCRYPTION || alg == RSASSA_PSS {
        (KeyFamily::Rsa, None)
    } else if alg == EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())
            .ok_or_else(|| OffloadError::UnsupportedKeyAlgorithm(alg.to_string()))?;
        let scheme = if curve == SECP256R1 {
            SignatureScheme::ECDSA_NISTP256_SHA256
        } else if curve == SECP384R1 {
            SignatureScheme::ECDSA_NISTP384_SHA384
        } else if curve == SECP521R1 {
            SignatureScheme::ECDSA_NISTP521_SHA512
        } else {
            return Err(OffloadError::UnsupportedKeyAlgorithm(curve.to_string()));
        };
        (KeyFamily::Ec, Some(scheme))
    } else {
        return Err(OffloadError::UnsupportedKeyAlgorithm(alg.to_string()));
    };

    let spki = spki
        .to_der()
        .map_err(|err| OffloadError::BadCertificate(err.to_string()))?;

    Ok(ParsedSpki {
        family,
        curve_scheme,
        spki,
    })
}

/// A key object rustls accepts as its private key, holding public material
/// only. Private operations route through the key-context registry to the
/// external signer attached at bind time.
#[derive(Debug)]
pub(crate) struct OffloadSigningKey {
    family: KeyFamily,
    id: KeyId,
    schemes: Vec<SignatureScheme>,
    spki: Vec<u8>,
}

impl OffloadSigningKey {
    pub(crate) fn new(family: KeyFamily, schemes: Vec<SignatureScheme>, spki: Vec<u8>) -> Self {
        Self {
            family,
            id: KeyId::next(),
            schemes,
            spki,
        }
    }

    pub(crate) fn family(&self) -> KeyFamily {
        self.family
    }

    pub(crate) fn id(&self) -> KeyId {
        self.id
    }
}

impl SigningKey for OffloadSigningKey {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
        let scheme = self
            .schemes
            .iter()
            .copied()
            .find(|scheme| offered.contains(scheme))?;
        Some(Box::new(OffloadSigner {
            family: self.family,
            id: self.id,
            scheme,
        }))
    }

    fn public_key(&self) -> Option<SubjectPublicKeyInfoDer<'_>> {
        Some(SubjectPublicKeyInfoDer::from(self.spki.as_slice()))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.family.signature_algorithm()
    }
}

impl Drop for OffloadSigningKey {
    fn drop(&mut self) {
        Engine::get().registry.detach(self.family, self.id);
    }
}

/// The signing thunk: resolves the registry entry for its key, then runs
/// the two-phase call against the external signer.
#[derive(Debug)]
struct OffloadSigner {
    family: KeyFamily,
    id: KeyId,
    scheme: SignatureScheme,
}

impl Signer for OffloadSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let digest = digest_for_scheme(self.scheme, message)
            .ok_or_else(|| Error::General("no digest for negotiated scheme".into()))?;

        let Some(handle) = Engine::get().registry.lookup(self.family, self.id) else {
            warn!("no external signer bound to key; failing handshake");
            return Err(Error::General("no external signer bound to key".into()));
        };

        if verbose::enabled() {
            debug!(
                "offload sign: scheme {:?}, digest {} bytes",
                self.scheme,
                digest.as_ref().len()
            );
        }

        let required = handle
            .sign(digest.as_ref(), None)
            .ok_or_else(|| Error::General("external signer failed".into()))?;
        let mut signature = vec![0u8; required];
        let written = handle
            .sign(digest.as_ref(), Some(&mut signature))
            .ok_or_else(|| Error::General("external signer failed".into()))?;
        if written > signature.len() {
            return Err(Error::General(
                "external signer exceeded its reported signature length".into(),
            ));
        }
        signature.truncate(written);

        if verbose::enabled() {
            debug!("offload sign: produced {written} byte signature");
        }
        Ok(signature)
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}

/// Hash `message` with the digest implicit in `scheme`. The external signer
/// only ever sees this digest, never the transcript itself.
fn digest_for_scheme(scheme: SignatureScheme, message: &[u8]) -> Option<digest::Digest> {
    let alg = match scheme {
        SignatureScheme::ECDSA_NISTP256_SHA256 | SignatureScheme::RSA_PSS_SHA256 => {
            &digest::SHA256
        }
        SignatureScheme::ECDSA_NISTP384_SHA384 | SignatureScheme::RSA_PSS_SHA384 => {
            &digest::SHA384
        }
        SignatureScheme::ECDSA_NISTP521_SHA512 | SignatureScheme::RSA_PSS_SHA512 => {
            &digest::SHA512
        }
        _ => return None,
    };
    Some(digest::digest(alg, message))
}
