use std::sync::Arc;

use log::debug;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{version, ServerConfig};

use crate::engine::Engine;
use crate::error::OffloadError;
use crate::key::{classify_public_key, OffloadSigningKey};
use crate::signer::ExternalSigner;
use crate::verbose;

/// Bind `signer` to the certificate's public key.
///
/// This is the lower-level half of [`offload_signing`]: it yields the bound
/// serving identity without constructing a `ServerConfig`, for callers that
/// install it through their own [`ResolvesServerCert`] or manage several
/// identities.
///
/// `cert_pem` holds the server certificate in PEM form, end-entity first;
/// any further certificates become the rest of the presented chain. The
/// key object is built from the end-entity certificate's public key
/// encoding alone, so no private material is ever parsed or retained.
///
/// The signer is attached by non-owning reference; see the crate
/// documentation for the lifetime contract.
pub fn offloaded_key(
    signer: &Arc<dyn ExternalSigner>,
    cert_pem: &str,
) -> Result<Arc<CertifiedKey>, OffloadError> {
    let engine = Engine::get();

    if verbose::enabled() {
        debug!(
            "engine ready; offloadable families: {:?}",
            engine.families().collect::<Vec<_>>()
        );
        debug!("parsing certificate chain");
    }
    let chain = CertificateDer::pem_slice_iter(cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| OffloadError::BadCertificate(err.to_string()))?;
    let end_entity = chain
        .first()
        .ok_or_else(|| OffloadError::BadCertificate("no certificate in PEM input".into()))?;

    let parsed = classify_public_key(end_entity)?;
    let method = engine
        .method_for(parsed.family)
        .ok_or(OffloadError::EngineUnavailable)?;
    // EC keys sign with the one scheme their curve admits; RSA keys take
    // the family's whole table.
    let schemes = match parsed.curve_scheme {
        Some(scheme) => vec![scheme],
        None => method.schemes.to_vec(),
    };

    let key = OffloadSigningKey::new(parsed.family, schemes, parsed.spki);
    // Attach before the key becomes reachable from any handshake.
    if !engine.registry.attach(key.family(), key.id(), signer) {
        return Err(OffloadError::BindingFailed);
    }

    if verbose::enabled() {
        debug!("bound external signer to {:?} key", key.family());
    }
    Ok(Arc::new(CertifiedKey::new(chain, Arc::new(key))))
}

/// Configure a server identity whose signing operations are performed by
/// `signer`.
///
/// Runs the whole bind: engine initialization if needed, key construction
/// from the certificate's public key, signer attachment, and construction
/// of a [`ServerConfig`] serving `cert_pem` with a TLS 1.3 protocol floor
/// and no client authentication.
///
/// On error nothing is returned, so a failed bind cannot leave a partially
/// configured context behind. Diagnostic detail beyond the returned error
/// goes to the [`log`] facade.
pub fn offload_signing(
    signer: &Arc<dyn ExternalSigner>,
    cert_pem: &str,
) -> Result<ServerConfig, OffloadError> {
    let certified = offloaded_key(signer, cert_pem)?;
    let config = ServerConfig::builder_with_protocol_versions(&[&version::TLS13])
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(OffloadResolver(certified)));
    debug!("signing offload configured");
    Ok(config)
}

/// Serves the one bound identity to every ClientHello.
#[derive(Debug)]
struct OffloadResolver(Arc<CertifiedKey>);

impl ResolvesServerCert for OffloadResolver {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::signer_from_fn;

    fn noop_signer() -> Arc<dyn ExternalSigner> {
        signer_from_fn(|_, _| None)
    }

    #[test]
    fn empty_pem_fails() {
        let err = offloaded_key(&noop_signer(), "").unwrap_err();
        assert!(matches!(err, OffloadError::BadCertificate(_)));
    }

    #[test]
    fn malformed_pem_fails() {
        let err = offload_signing(&noop_signer(), "not a certificate").unwrap_err();
        assert!(matches!(err, OffloadError::BadCertificate(_)));
    }

    #[test]
    fn chain_is_preserved_in_order() {
        let ca_key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
        let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let ee_key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
        let ee_params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let ee_cert = ee_params.signed_by(&ee_key, &ca_cert, &ca_key).unwrap();

        let pem = format!("{}{}", ee_cert.pem(), ca_cert.pem());
        let signer = noop_signer();
        let certified = offloaded_key(&signer, &pem).unwrap();
        assert_eq!(certified.cert.len(), 2);
        assert_eq!(certified.end_entity_cert().unwrap(), ee_cert.der());
    }
}
