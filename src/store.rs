//! The chain-of-trust certificate store: the CA hierarchy learned from
//! provisioning, and the bounded cache of peer end-entity certificates
//! learned from received messages.
//!
//! Issuer references are lookup keys ([`HashedId8`]), never owning
//! pointers; a subordinate can only be accepted while its issuer is
//! already present, and the expiry sweep refuses to drop an entry that is
//! still the issuer of a live subordinate.

use std::collections::{HashMap, HashSet};

use p256::ecdsa::VerifyingKey;
use tracing::{debug, warn};

use crate::{
    crypto, revocation::RevocationIndex, Certificate, CertificateType, Decode, Error,
    GeographicRegion, HashedId10, HashedId8, IssuerIdentifier, PublicEncryptionKey, Time64,
    VerificationKeyIndicator,
};

/// Smallest encoding a certificate of this profile can have.
pub const MIN_CERT_SIZE: usize = 16;
/// Largest encoded certificate accepted into any table.
pub const MAX_CERT_SIZE: usize = 2048;

/// Limit on issuer-chain walks; chains are expected to be 2 to 4 deep.
const MAX_CHAIN_DEPTH: usize = 8;

/// The role a CA certificate plays in the hierarchy.
///
/// The certificate body does not reliably distinguish the issuing roles,
/// so the role is supplied by the provisioning context at insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaRole {
    Root,
    Intermediate,
    PseudonymCa,
    EnrollmentCa,
    RegistrationAuthority,
    CrlGenerator,
}

/// A certificate of the CA hierarchy accepted into the store.
#[derive(Debug, Clone)]
pub struct CaEntry {
    pub role: CaRole,
    pub cert: Certificate,
    pub digest8: HashedId8,
    pub digest10: HashedId10,
    pub(crate) verifying_key: VerifyingKey,
    /// present for issuing roles that receive encrypted requests
    pub encryption_key: Option<PublicEncryptionKey>,
    /// lookup key of the issuer entry; `None` for a self-signed root
    pub issuer: Option<HashedId8>,
    pub valid_start: Time64,
    pub valid_end: Time64,
    /// the effective validity region: the certificate's own, or inherited
    /// from the issuer when omitted
    pub region: Option<GeographicRegion>,
}

/// An end-entity certificate learned from traffic.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    pub cert: Certificate,
    pub digest8: HashedId8,
    pub digest10: HashedId10,
    pub(crate) verifying_key: VerifyingKey,
    pub issuer: HashedId8,
    pub valid_start: Time64,
    pub valid_end: Time64,
    pub region: Option<GeographicRegion>,
    /// insertion instant, used for oldest-first eviction
    pub inserted_at: Time64,
    sequence: u64,
}

/// The CA table plus the bounded peer cache.
#[derive(Debug)]
pub struct CertificateStore {
    ca: HashMap<HashedId8, CaEntry>,
    peers: HashMap<HashedId8, PeerEntry>,
    /// fast-access slots for the roles needed on the credential-request
    /// hot path
    registration_authority: Option<HashedId8>,
    application_ca: Option<HashedId8>,
    peer_capacity: usize,
    peer_sequence: u64,
}

impl CertificateStore {
    #[must_use]
    pub fn new(peer_capacity: usize) -> Self {
        Self {
            ca: HashMap::new(),
            peers: HashMap::new(),
            registration_authority: None,
            application_ca: None,
            peer_capacity: peer_capacity.max(1),
            peer_sequence: 0,
        }
    }

    /// Decodes, chain-validates and inserts a CA certificate.
    ///
    /// The issuer must already be present (dependency order), the validity
    /// interval must be a subset of the issuer's, and the certificate's
    /// own chain signature (or implicit key reconstruction) must check out
    /// against the issuer key. A failed insertion leaves the store
    /// unchanged.
    pub fn add_ca_certificate(&mut self, role: CaRole, bytes: &[u8]) -> Result<HashedId8, Error> {
        let cert = decode_bounded(bytes)?;
        let digest8 = crypto::hashed_id8(bytes);
        if let Some(existing) = self.ca.get(&digest8) {
            if existing.cert.raw() == bytes {
                debug!(digest = ?digest8, "certificate already present");
                return Err(Error::AlreadyPresent);
            }
            warn!(digest = ?digest8, "digest collision on CA insertion");
            return Err(Error::InvalidParameter("certificate digest collision"));
        }

        let entry = match cert.issuer {
            IssuerIdentifier::RsSelf(_) => {
                if role != CaRole::Root {
                    return Err(Error::InvalidParameter(
                        "self-signed certificate in a non-root role",
                    ));
                }
                let verifying_key = explicit_key(&cert)?;
                let signature = cert.signature.as_ref().ok_or(Error::ChainSignatureInvalid)?;
                crypto::verify_signed(&verifying_key, cert.to_be_signed.raw(), None, signature)
                    .map_err(|_| Error::ChainSignatureInvalid)?;
                CaEntry {
                    role,
                    digest8,
                    digest10: crypto::hashed_id10(bytes),
                    verifying_key,
                    encryption_key: cert.to_be_signed.encryption_key,
                    issuer: None,
                    valid_start: cert.to_be_signed.validity_period.start_micros(),
                    valid_end: cert.to_be_signed.validity_period.end_micros(),
                    region: cert.to_be_signed.region.clone(),
                    cert,
                }
            }
            IssuerIdentifier::Sha256AndDigest(issuer_digest) => {
                if role == CaRole::Root {
                    return Err(Error::InvalidParameter("root certificate must be self-signed"));
                }
                let issuer = self.ca.get(&issuer_digest).ok_or(Error::NoIssuerCert)?;
                validate_subordinate(&cert, &issuer.cert, &issuer.verifying_key)?;
                let verifying_key = subordinate_key(&cert, &issuer.cert, &issuer.verifying_key)?;
                CaEntry {
                    role,
                    digest8,
                    digest10: crypto::hashed_id10(bytes),
                    verifying_key,
                    encryption_key: cert.to_be_signed.encryption_key,
                    issuer: Some(issuer_digest),
                    valid_start: cert.to_be_signed.validity_period.start_micros(),
                    valid_end: cert.to_be_signed.validity_period.end_micros(),
                    region: cert
                        .to_be_signed
                        .region
                        .clone()
                        .or_else(|| issuer.region.clone()),
                    cert,
                }
            }
        };

        match role {
            CaRole::RegistrationAuthority => self.registration_authority = Some(digest8),
            CaRole::PseudonymCa => self.application_ca = Some(digest8),
            _ => {}
        }
        debug!(?role, digest = ?digest8, "CA certificate inserted");
        self.ca.insert(digest8, entry);
        Ok(digest8)
    }

    /// Pure lookup by the eight-byte digest; used on every signature
    /// verification.
    #[must_use]
    pub fn find_by_digest8(&self, digest: &HashedId8) -> Option<&CaEntry> {
        self.ca.get(digest)
    }

    /// The registration authority, if provisioned.
    #[must_use]
    pub fn registration_authority(&self) -> Option<&CaEntry> {
        self.registration_authority
            .as_ref()
            .and_then(|digest| self.ca.get(digest))
    }

    /// The pseudonym/application CA, if provisioned.
    #[must_use]
    pub fn application_ca(&self) -> Option<&CaEntry> {
        self.application_ca
            .as_ref()
            .and_then(|digest| self.ca.get(digest))
    }

    /// Explicitly unloads a CA certificate.
    pub fn remove_ca_certificate(&mut self, digest: &HashedId8) -> Result<(), Error> {
        if self.ca.remove(digest).is_none() {
            return Err(Error::InvalidParameter("certificate not in table"));
        }
        if self.registration_authority == Some(*digest) {
            self.registration_authority = None;
        }
        if self.application_ca == Some(*digest) {
            self.application_ca = None;
        }
        Ok(())
    }

    #[must_use]
    pub fn ca_count(&self) -> usize {
        self.ca.len()
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Validates a peer certificate for acceptance without mutating the
    /// cache, so that the caller can verify the message signature first
    /// and only then commit.
    ///
    /// Revocation gates acceptance here: a revoked certificate is refused
    /// even if its chain signature is mathematically valid.
    pub fn prepare_peer(
        &self,
        cert: &Certificate,
        now: Time64,
        revocation: &RevocationIndex,
    ) -> Result<PeerEntry, Error> {
        let bytes = cert.raw();
        if bytes.len() < MIN_CERT_SIZE || bytes.len() > MAX_CERT_SIZE {
            return Err(Error::CertSizeOutOfBounds(bytes.len()));
        }
        if cert.version != 3 {
            return Err(Error::InvalidParameter("protocol version"));
        }
        if revocation.is_revoked(cert) {
            return Err(Error::Revoked);
        }
        let IssuerIdentifier::Sha256AndDigest(issuer_digest) = cert.issuer else {
            return Err(Error::InvalidParameter("self-signed end-entity certificate"));
        };
        let issuer = self.ca.get(&issuer_digest).ok_or(Error::NoIssuerCert)?;
        if revocation.is_revoked_digest(&issuer.digest10) {
            return Err(Error::Revoked);
        }
        validate_subordinate(cert, &issuer.cert, &issuer.verifying_key)?;
        if !cert.to_be_signed.validity_period.contains(now) {
            return Err(Error::Expired);
        }
        let verifying_key = subordinate_key(cert, &issuer.cert, &issuer.verifying_key)?;
        Ok(PeerEntry {
            digest8: crypto::hashed_id8(bytes),
            digest10: crypto::hashed_id10(bytes),
            verifying_key,
            issuer: issuer_digest,
            valid_start: cert.to_be_signed.validity_period.start_micros(),
            valid_end: cert.to_be_signed.validity_period.end_micros(),
            region: cert
                .to_be_signed
                .region
                .clone()
                .or_else(|| issuer.region.clone()),
            inserted_at: now,
            sequence: 0,
            cert: cert.clone(),
        })
    }

    /// Commits a prepared peer entry, evicting the oldest entry when the
    /// cache is at capacity.
    pub fn commit_peer(&mut self, mut entry: PeerEntry) {
        if !self.peers.contains_key(&entry.digest8) && self.peers.len() >= self.peer_capacity {
            if let Some(oldest) = self
                .peers
                .values()
                .min_by_key(|peer| (peer.inserted_at, peer.sequence))
                .map(|peer| peer.digest8)
            {
                debug!(digest = ?oldest, "evicting oldest peer certificate");
                self.peers.remove(&oldest);
            }
        }
        entry.sequence = self.peer_sequence;
        self.peer_sequence += 1;
        self.peers.insert(entry.digest8, entry);
    }

    #[must_use]
    pub fn find_peer(&self, digest: &HashedId8) -> Option<&PeerEntry> {
        self.peers.get(digest)
    }

    pub(crate) fn remove_peer(&mut self, digest: &HashedId8) {
        self.peers.remove(digest);
    }

    /// Whether every certificate in the issuance chain starting at
    /// `issuer` is present and valid at `now`.
    #[must_use]
    pub fn chain_valid_at(&self, issuer: &HashedId8, now: Time64) -> bool {
        let mut current = *issuer;
        for _ in 0..MAX_CHAIN_DEPTH {
            let Some(entry) = self.ca.get(&current) else {
                return false;
            };
            if now < entry.valid_start || now >= entry.valid_end {
                return false;
            }
            match entry.issuer {
                Some(next) => current = next,
                None => return true,
            }
        }
        false
    }

    /// Removes entries whose validity end precedes `now`.
    ///
    /// A CA entry that is still referenced as issuer by a live entry (CA,
    /// peer, or one of `external_refs`, the credential table) is retained
    /// even when expired, and retried on the next sweep; back-references
    /// can therefore never dangle. Returns the number of removed entries.
    pub fn sweep_expired(&mut self, now: Time64, external_refs: &HashSet<HashedId8>) -> usize {
        let before = self.ca.len() + self.peers.len();
        self.peers.retain(|_, peer| peer.valid_end > now);

        loop {
            let mut referenced: HashSet<HashedId8> = external_refs.clone();
            referenced.extend(self.peers.values().map(|peer| peer.issuer));
            referenced.extend(self.ca.values().filter_map(|entry| entry.issuer));

            let removable: Vec<HashedId8> = self
                .ca
                .values()
                .filter(|entry| entry.valid_end <= now && !referenced.contains(&entry.digest8))
                .map(|entry| entry.digest8)
                .collect();
            if removable.is_empty() {
                break;
            }
            for digest in removable {
                self.ca.remove(&digest);
                if self.registration_authority == Some(digest) {
                    self.registration_authority = None;
                }
                if self.application_ca == Some(digest) {
                    self.application_ca = None;
                }
            }
        }

        let removed = before - (self.ca.len() + self.peers.len());
        if removed > 0 {
            debug!(removed, "expiry sweep");
        }
        removed
    }
}

fn decode_bounded(bytes: &[u8]) -> Result<Certificate, Error> {
    if bytes.len() < MIN_CERT_SIZE || bytes.len() > MAX_CERT_SIZE {
        return Err(Error::CertSizeOutOfBounds(bytes.len()));
    }
    let decoded = Certificate::decode(bytes)?;
    if decoded.bytes_consumed != bytes.len() {
        return Err(Error::Decode("trailing bytes after certificate".into()));
    }
    if decoded.decoded.version != 3 {
        return Err(Error::InvalidParameter("protocol version"));
    }
    Ok(decoded.decoded)
}

/// The nested-validity invariant and the chain signature of a subordinate
/// against its issuer.
pub(crate) fn validate_subordinate(
    cert: &Certificate,
    issuer_cert: &Certificate,
    issuer_key: &VerifyingKey,
) -> Result<(), Error> {
    if !issuer_cert
        .to_be_signed
        .validity_period
        .encloses(&cert.to_be_signed.validity_period)
    {
        return Err(Error::ValidityNotEnclosed);
    }
    match cert.r_type {
        CertificateType::Explicit => {
            let signature = cert.signature.as_ref().ok_or(Error::ChainSignatureInvalid)?;
            crypto::verify_signed(
                issuer_key,
                cert.to_be_signed.raw(),
                Some(issuer_cert.raw()),
                signature,
            )
            .map_err(|_| Error::ChainSignatureInvalid)
        }
        // an implicit certificate carries no signature; its authenticity
        // is established by the key reconstruction in `subordinate_key`
        CertificateType::Implicit => {
            if cert.signature.is_some() {
                return Err(Error::InvalidParameter("implicit certificate with signature"));
            }
            Ok(())
        }
    }
}

/// The verification key of a subordinate certificate: carried directly by
/// an explicit certificate, reconstructed for an implicit one.
pub(crate) fn subordinate_key(
    cert: &Certificate,
    issuer_cert: &Certificate,
    issuer_key: &VerifyingKey,
) -> Result<VerifyingKey, Error> {
    match (cert.r_type, &cert.to_be_signed.verify_key_indicator) {
        (CertificateType::Explicit, VerificationKeyIndicator::VerificationKey(key)) => {
            crypto::verifying_key(key)
        }
        (CertificateType::Implicit, VerificationKeyIndicator::ReconstructionValue(point)) => {
            crypto::reconstruct_public(
                cert.to_be_signed.raw(),
                issuer_cert.raw(),
                point,
                issuer_key,
            )
        }
        _ => Err(Error::InvalidParameter(
            "key indicator does not match certificate type",
        )),
    }
}

fn explicit_key(cert: &Certificate) -> Result<VerifyingKey, Error> {
    match (cert.r_type, &cert.to_be_signed.verify_key_indicator) {
        (CertificateType::Explicit, VerificationKeyIndicator::VerificationKey(key)) => {
            crypto::verifying_key(key)
        }
        _ => Err(Error::Unsupported("implicit self-signed certificate")),
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::issue;
    use super::*;
    use crate::{time32_to_micros, Duration};

    fn chain() -> (CertificateStore, super::testutil::TestCa, super::testutil::TestCa) {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let inter = issue("ica", Some(&root), 1_000, Duration::Years(10), None, &[]);
        let mut store = CertificateStore::new(8);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();
        store
            .add_ca_certificate(CaRole::Intermediate, inter.cert.raw())
            .unwrap();
        (store, root, inter)
    }

    #[test]
    fn accepts_chain_in_dependency_order() {
        let (store, root, inter) = chain();
        assert_eq!(store.ca_count(), 2);
        assert_eq!(
            store.find_by_digest8(&inter.digest8).unwrap().issuer,
            Some(root.digest8)
        );
    }

    #[test]
    fn missing_issuer_is_rejected() {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let orphan = issue("ica", Some(&root), 1_000, Duration::Years(10), None, &[]);
        let mut store = CertificateStore::new(8);
        // the root was never added
        assert_eq!(
            store.add_ca_certificate(CaRole::Intermediate, orphan.cert.raw()),
            Err(Error::NoIssuerCert)
        );
        assert_eq!(store.ca_count(), 0);
    }

    #[test]
    fn validity_must_nest() {
        let root = issue("root", None, 1_000, Duration::Years(1), None, &[]);
        // starts before the issuer
        let early = issue("ica", Some(&root), 0, Duration::Years(1), None, &[]);
        // outlives the issuer
        let late = issue("ica", Some(&root), 1_000, Duration::Years(5), None, &[]);
        let mut store = CertificateStore::new(8);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();
        for bad in [early, late] {
            assert_eq!(
                store.add_ca_certificate(CaRole::Intermediate, bad.cert.raw()),
                Err(Error::ValidityNotEnclosed)
            );
        }
        assert_eq!(store.ca_count(), 1);
    }

    #[test]
    fn duplicate_insertion_is_distinct_and_idempotent() {
        let (mut store, root, _) = chain();
        assert_eq!(
            store.add_ca_certificate(CaRole::Root, root.cert.raw()),
            Err(Error::AlreadyPresent)
        );
        assert_eq!(
            store.add_ca_certificate(CaRole::Root, root.cert.raw()),
            Err(Error::AlreadyPresent)
        );
        assert_eq!(store.ca_count(), 2);
    }

    #[test]
    fn forged_chain_signature_is_rejected() {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let mallory = issue("root2", None, 0, Duration::Years(20), None, &[]);
        // signed by mallory but claiming root as issuer
        let mut forged = issue("ica", Some(&mallory), 0, Duration::Years(1), None, &[]).cert;
        forged.issuer = IssuerIdentifier::Sha256AndDigest(root.digest8);
        forged.finalize().unwrap();

        let mut store = CertificateStore::new(8);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();
        assert_eq!(
            store.add_ca_certificate(CaRole::Intermediate, forged.raw()),
            Err(Error::ChainSignatureInvalid)
        );
    }

    #[test]
    fn singleton_slots_track_roles() {
        let (mut store, _, inter) = chain();
        let ra = issue("ra", Some(&inter), 2_000, Duration::Years(2), None, &[]);
        let pca = issue("pca", Some(&inter), 2_000, Duration::Years(2), None, &[]);
        store
            .add_ca_certificate(CaRole::RegistrationAuthority, ra.cert.raw())
            .unwrap();
        store
            .add_ca_certificate(CaRole::PseudonymCa, pca.cert.raw())
            .unwrap();
        assert_eq!(store.registration_authority().unwrap().digest8, ra.digest8);
        assert_eq!(store.application_ca().unwrap().digest8, pca.digest8);
        store.remove_ca_certificate(&ra.digest8).unwrap();
        assert!(store.registration_authority().is_none());
    }

    #[test]
    fn sweep_keeps_referenced_issuers() {
        let root = issue("root", None, 0, Duration::Years(1), None, &[]);
        let inter = issue("ica", Some(&root), 0, Duration::Years(1), None, &[]);
        let mut store = CertificateStore::new(8);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();
        store
            .add_ca_certificate(CaRole::Intermediate, inter.cert.raw())
            .unwrap();

        // both are expired, but the intermediate is still referenced by an
        // external credential: only nothing-referencing entries may go
        let after_expiry = time32_to_micros(40_000_000);
        let refs: HashSet<HashedId8> = [inter.digest8].into_iter().collect();
        store.sweep_expired(after_expiry, &refs);
        assert!(store.find_by_digest8(&inter.digest8).is_some());
        assert!(store.find_by_digest8(&root.digest8).is_some());

        // with the reference gone both fall in one sweep
        store.sweep_expired(after_expiry, &HashSet::new());
        assert_eq!(store.ca_count(), 0);
    }

    #[test]
    fn peer_cache_evicts_oldest() {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let mut store = CertificateStore::new(2);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();

        let revocation = RevocationIndex::new();
        let mut digests = Vec::new();
        for index in 0..3u64 {
            let ee = super::testutil::issue_end_entity(
                &root,
                crate::Psid(32),
                1_000,
                Duration::Years(1),
            );
            let entry = store
                .prepare_peer(&ee.cert, time32_to_micros(1_000) + index, &revocation)
                .unwrap();
            digests.push(entry.digest8);
            store.commit_peer(entry);
        }

        assert_eq!(store.peer_count(), 2);
        // the first inserted entry was evicted
        assert!(store.find_peer(&digests[0]).is_none());
        assert!(store.find_peer(&digests[1]).is_some());
        assert!(store.find_peer(&digests[2]).is_some());
    }

    #[test]
    fn chain_validity_walk() {
        let (store, root, inter) = chain();
        let inside = time32_to_micros(2_000);
        assert!(store.chain_valid_at(&inter.digest8, inside));
        assert!(store.chain_valid_at(&root.digest8, inside));
        let outside = time32_to_micros(2_000_000_000);
        assert!(!store.chain_valid_at(&inter.digest8, outside));
    }
}
