//! The security entity: the single synchronization boundary around the
//! trust-store aggregate, the bounded verification work queue with its
//! fixed worker pool, and the function-level API surface consumed by
//! applications.
//!
//! `verify_spdu` is non-blocking: arguments are validated synchronously,
//! the work item is enqueued, and the verdict is delivered later on the
//! outcome channel. A full queue fails fast with
//! [`Error::WorkQueueFull`]; signature verification is CPU-bound and must
//! not be allowed to stall the caller's receive loop. ECDSA runs outside
//! the store lock, on data already copied out, so it never blocks
//! concurrent store mutation. Verdicts for independently queued messages
//! may be delivered out of submission order.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use p256::ecdsa::VerifyingKey;
use tracing::debug;

use crate::{
    crypto, sign, validate, CaEntry, CaRole, CertificateStore, CmhStore, CredentialKind,
    CrlContents, Decode, Error, GeographicRegion, HashedId8, IValue, Ieee1609Dot2Content,
    Ieee1609Dot2Data, PeerEntry, ProfileRegistry, Psid, RejectReason, RevocationIndex,
    RotatingSlot, SecurityProfile, SignRequest, SignedData, SignerIdentifier, Time32, Time64,
    TwoDLocation, Verdict,
};

/// Start-up parameters of the engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityConfig {
    /// verification worker threads
    pub workers: usize,
    /// bound of the verification request queue
    pub queue_depth: usize,
    /// maximum number of cached peer certificates
    pub peer_cache_capacity: usize,
    /// the receiver's own position, for distance relevance checks
    pub position: Option<TwoDLocation>,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_depth: 64,
            peer_cache_capacity: 256,
            position: None,
        }
    }
}

#[cfg(feature = "json")]
impl EntityConfig {
    /// Reads a configuration document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// The result of one asynchronous verification request.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    /// the id returned by [`SecurityEntity::verify_spdu`]
    pub request_id: u64,
    pub verdict: Verdict,
}

/// The trust-store aggregate: one shared resource, one lock.
struct TrustState {
    store: CertificateStore,
    cmh: CmhStore,
    revocation: RevocationIndex,
    profiles: ProfileRegistry,
    position: Option<TwoDLocation>,
}

struct WorkItem {
    request_id: u64,
    spdu: Vec<u8>,
    now: Time64,
}

/// The engine handle. Dropping it disconnects the queue and joins the
/// workers; enqueued requests are still processed.
pub struct SecurityEntity {
    state: Arc<Mutex<TrustState>>,
    queue: Option<SyncSender<WorkItem>>,
    workers: Vec<JoinHandle<()>>,
    next_request_id: AtomicU64,
}

impl SecurityEntity {
    /// Initializes the engine and returns it together with the channel on
    /// which verification outcomes are delivered.
    #[must_use]
    pub fn start(config: EntityConfig) -> (Self, Receiver<VerifyOutcome>) {
        let state = Arc::new(Mutex::new(TrustState {
            store: CertificateStore::new(config.peer_cache_capacity),
            cmh: CmhStore::new(),
            revocation: RevocationIndex::new(),
            profiles: ProfileRegistry::new(),
            position: config.position,
        }));
        let (queue, work_rx) = mpsc::sync_channel(config.queue_depth.max(1));
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let work_rx = Arc::new(Mutex::new(work_rx));

        let workers = (0..config.workers.max(1))
            .map(|index| {
                let state = Arc::clone(&state);
                let work_rx = Arc::clone(&work_rx);
                let outcome_tx = outcome_tx.clone();
                thread::Builder::new()
                    .name(format!("dot2se-worker-{index}"))
                    .spawn(move || worker_loop(&state, &work_rx, &outcome_tx))
                    .expect("spawning a verification worker")
            })
            .collect();

        (
            Self {
                state,
                queue: Some(queue),
                workers,
                next_request_id: AtomicU64::new(1),
            },
            outcome_rx,
        )
    }

    fn lock(&self) -> MutexGuard<'_, TrustState> {
        self.state.lock().expect("trust state lock")
    }

    /// Submits an SPDU for asynchronous verification at reference time
    /// `now` and returns the request id under which the verdict will be
    /// delivered.
    pub fn verify_spdu(&self, spdu: Vec<u8>, now: Time64) -> Result<u64, Error> {
        if spdu.is_empty() {
            return Err(Error::InvalidParameter("empty SPDU"));
        }
        let queue = self.queue.as_ref().ok_or(Error::EngineStopped)?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        match queue.try_send(WorkItem {
            request_id,
            spdu,
            now,
        }) {
            Ok(()) => Ok(request_id),
            Err(TrySendError::Full(_)) => Err(Error::WorkQueueFull),
            Err(TrySendError::Disconnected(_)) => Err(Error::EngineStopped),
        }
    }

    /// Constructs a signed (or unsecured) SPDU synchronously.
    pub fn sign_spdu(&self, request: &SignRequest) -> Result<Vec<u8>, Error> {
        if request.unsecured {
            return sign::build_unsecured(&request.payload);
        }
        let mut state = self.lock();
        let profile = state
            .profiles
            .snapshot(request.psid)
            .ok_or(Error::NoSecProfile)?;
        let entry = state
            .cmh
            .select_for_signing(request.kind, request.psid, request.at)
            .ok_or(Error::NoAvailableCmh)?;
        sign::construct_signed(request, &profile, entry)
    }

    pub fn add_ca_certificate(&self, role: CaRole, bytes: &[u8]) -> Result<HashedId8, Error> {
        self.lock().store.add_ca_certificate(role, bytes)
    }

    pub fn add_ca_certificate_file(
        &self,
        role: CaRole,
        path: impl AsRef<Path>,
    ) -> Result<HashedId8, Error> {
        let bytes = std::fs::read(path).map_err(|e| Error::Io(e.to_string()))?;
        self.add_ca_certificate(role, &bytes)
    }

    pub fn remove_ca_certificate(&self, digest: &HashedId8) -> Result<(), Error> {
        self.lock().store.remove_ca_certificate(digest)
    }

    #[must_use]
    pub fn find_ca(&self, digest: &HashedId8) -> Option<CaEntry> {
        self.lock().store.find_by_digest8(digest).cloned()
    }

    #[must_use]
    pub fn find_peer(&self, digest: &HashedId8) -> Option<PeerEntry> {
        self.lock().store.find_peer(digest).cloned()
    }

    pub fn load_cmh(&self, kind: CredentialKind, bytes: &[u8]) -> Result<HashedId8, Error> {
        let mut state = self.lock();
        let TrustState { store, cmh, .. } = &mut *state;
        cmh.load_sequential(kind, bytes, store)
    }

    pub fn load_cmh_file(
        &self,
        kind: CredentialKind,
        path: impl AsRef<Path>,
    ) -> Result<HashedId8, Error> {
        let bytes = std::fs::read(path).map_err(|e| Error::Io(e.to_string()))?;
        self.load_cmh(kind, &bytes)
    }

    pub fn load_rotating_cmh(
        &self,
        kind: CredentialKind,
        i_period: IValue,
        j_max: u8,
        expansion_key: &[u8; 16],
        slots: &[RotatingSlot],
    ) -> Result<(), Error> {
        let mut state = self.lock();
        let TrustState { store, cmh, .. } = &mut *state;
        cmh.load_rotating_set(kind, i_period, j_max, expansion_key, slots, store)
    }

    pub fn remove_cmh(&self, digest: &HashedId8) -> Result<(), Error> {
        self.lock().cmh.remove(digest)
    }

    pub fn register_profile(&self, profile: SecurityProfile) {
        self.lock().profiles.register(profile);
    }

    /// Applies decoded CRL contents at reference time `now`.
    pub fn apply_crl(&self, now: Time32, contents: &CrlContents) -> Result<(), Error> {
        self.lock().revocation.apply_crl_contents(now, contents)
    }

    /// Removes expired certificates, credentials and revocation state.
    pub fn sweep_expired(&self, now: Time64) {
        let mut state = self.lock();
        let TrustState {
            store,
            cmh,
            revocation,
            ..
        } = &mut *state;
        cmh.sweep_expired(now);
        store.sweep_expired(now, &cmh.issuer_refs());
        revocation.sweep_expired((now / 1_000_000).min(u64::from(u32::MAX)) as Time32);
    }

    pub fn set_position(&self, position: TwoDLocation) {
        self.lock().position = Some(position);
    }
}

impl Drop for SecurityEntity {
    fn drop(&mut self) {
        // disconnecting the queue lets the workers drain and exit
        self.queue.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    state: &Mutex<TrustState>,
    work_rx: &Mutex<Receiver<WorkItem>>,
    outcome_tx: &Sender<VerifyOutcome>,
) {
    loop {
        let item = match work_rx.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };
        let Ok(item) = item else { break };
        let verdict = run_pipeline(state, &item);
        debug!(request_id = item.request_id, accepted = verdict.is_accepted(), "verdict");
        // a send failure means the outcome receiver is gone; keep
        // draining so enqueued callers are not stuck behind a full queue
        let _ = outcome_tx.send(VerifyOutcome {
            request_id: item.request_id,
            verdict,
        });
    }
}

/// What the pipeline needs to know about the resolved signer, copied out
/// of the store so that ECDSA runs without the lock.
struct ResolvedSigner {
    verifying_key: VerifyingKey,
    cert_raw: Bytes,
    validity: (Time64, Time64),
    region: Option<GeographicRegion>,
    issuer: HashedId8,
    /// a peer entry validated but not yet committed; committed only after
    /// the signature has verified
    pending: Option<PeerEntry>,
}

/// One verification pass, terminal states Accepted / Rejected(reason).
fn run_pipeline(state: &Mutex<TrustState>, item: &WorkItem) -> Verdict {
    // decode, outside the lock
    let decoded = match Ieee1609Dot2Data::decode(&item.spdu) {
        Ok(decoded) => decoded.decoded,
        Err(error) => return Verdict::Rejected(RejectReason::DecodeFailed(error)),
    };
    if decoded.protocol_version != 3 {
        return Verdict::Rejected(RejectReason::InvalidProtocolVersion);
    }
    let signed = match decoded.content {
        Ieee1609Dot2Content::UnsecuredData(payload) => {
            return Verdict::Accepted {
                psid: None,
                payload: Some(payload),
                generation_time: None,
            }
        }
        Ieee1609Dot2Content::SignedData(signed) => signed,
    };
    let header = &signed.tbs_data.header_info;
    let psid = header.psid;

    // structural consistency that needs no signer: never pay the
    // signature cost for it
    if let (Some(generation), Some(expiry)) = (header.generation_time, header.expiry_time) {
        if expiry < generation {
            return Verdict::Rejected(RejectReason::ExpiryBeforeGenerationTime);
        }
    }

    // resolve profile and signer under the lock; copy out what the
    // signature check needs
    let (profile, own_position, signer) = {
        let mut state = state.lock().expect("trust state lock");
        let Some(profile) = state.profiles.snapshot(psid) else {
            return Verdict::Rejected(RejectReason::NoSecProfile);
        };
        if !profile.rx.verify {
            return accept(&signed);
        }
        let own_position = state.position;
        let signer = match resolve_signer(&mut state, &signed, item.now) {
            Ok(signer) => signer,
            Err(reason) => return Verdict::Rejected(reason),
        };
        (profile, own_position, signer)
    };

    // consistency against the signer certificate, before the signature
    if let Err(reason) = validate::check_consistency(
        header,
        signer.validity,
        signer.region.as_ref(),
        profile.rx.check_generation_location,
    ) {
        return Verdict::Rejected(reason);
    }

    // the cryptographic check, outside the lock, on copied data
    if crypto::verify_signed(
        &signer.verifying_key,
        signed.tbs_data.raw(),
        Some(&signer.cert_raw),
        &signed.signature,
    )
    .is_err()
    {
        // side-effect free: the pending peer entry is dropped, nothing
        // was cached
        return Verdict::Rejected(RejectReason::SignatureVerificationFailed);
    }

    // store-free relevance checks
    if let Err(reason) = validate::check_relevance(header, &profile.rx, item.now, own_position) {
        return Verdict::Rejected(reason);
    }

    // relevance checks that touch the store, then the commit
    {
        let mut state = state.lock().expect("trust state lock");
        if profile.rx.check_chain_expiry {
            let (valid_start, valid_end) = signer.validity;
            if item.now < valid_start
                || item.now >= valid_end
                || !state.store.chain_valid_at(&signer.issuer, item.now)
            {
                return Verdict::Rejected(RejectReason::SignerChainExpired);
            }
        }
        if profile.rx.check_replay {
            if let Some(generation) = header.generation_time {
                let replayed = state.profiles.check_replay(
                    psid,
                    generation,
                    crypto::signature_digest(&signed.signature),
                    profile.rx.validity_period,
                    item.now,
                );
                if replayed {
                    return Verdict::Rejected(RejectReason::ReplayedSpdu);
                }
            }
        }
        if let Some(entry) = signer.pending {
            state.store.commit_peer(entry);
        }
    }

    accept(&signed)
}

fn accept(signed: &SignedData) -> Verdict {
    let payload = signed
        .tbs_data
        .payload
        .data
        .as_deref()
        .and_then(Ieee1609Dot2Data::data_payload)
        .map(Bytes::copy_from_slice);
    Verdict::Accepted {
        psid: Some(signed.tbs_data.header_info.psid),
        payload,
        generation_time: signed.tbs_data.header_info.generation_time,
    }
}

fn resolve_signer(
    state: &mut TrustState,
    signed: &SignedData,
    now: Time64,
) -> Result<ResolvedSigner, RejectReason> {
    match &signed.signer {
        SignerIdentifier::RsSelf => Err(RejectReason::UnsupportedSigner),
        SignerIdentifier::Digest(digest) => {
            let Some(peer) = state.store.find_peer(digest) else {
                return Err(RejectReason::NoSignerCertInTable);
            };
            // the certificate may have been revoked after it was learned
            if state.revocation.is_revoked(&peer.cert) {
                state.store.remove_peer(digest);
                return Err(RejectReason::RevokedSigner);
            }
            let peer = state.store.find_peer(digest).expect("present above");
            Ok(ResolvedSigner {
                verifying_key: peer.verifying_key,
                cert_raw: Bytes::copy_from_slice(peer.cert.raw()),
                validity: (peer.valid_start, peer.valid_end),
                region: peer.region.clone(),
                issuer: peer.issuer,
                pending: None,
            })
        }
        SignerIdentifier::Certificate(certificates) => {
            let Some(cert) = certificates.first() else {
                return Err(RejectReason::NoSignerCertInTable);
            };
            let digest = crypto::hashed_id8(cert.raw());
            if let Some(peer) = state.store.find_peer(&digest) {
                if state.revocation.is_revoked(&peer.cert) {
                    state.store.remove_peer(&digest);
                    return Err(RejectReason::RevokedSigner);
                }
                return Ok(ResolvedSigner {
                    verifying_key: peer.verifying_key,
                    cert_raw: Bytes::copy_from_slice(peer.cert.raw()),
                    validity: (peer.valid_start, peer.valid_end),
                    region: peer.region.clone(),
                    issuer: peer.issuer,
                    pending: None,
                });
            }
            // validate for acceptance now, commit only after the
            // signature has verified
            let entry = state
                .store
                .prepare_peer(cert, now, &state.revocation)
                .map_err(|error| match error {
                    Error::Revoked => RejectReason::RevokedSigner,
                    Error::NoIssuerCert => RejectReason::NoIssuerCert,
                    _ => RejectReason::InvalidSignerChain,
                })?;
            Ok(ResolvedSigner {
                verifying_key: entry.verifying_key,
                cert_raw: Bytes::copy_from_slice(entry.cert.raw()),
                validity: (entry.valid_start, entry.valid_end),
                region: entry.region.clone(),
                issuer: entry.issuer,
                pending: Some(entry),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmh::testutil::{record_bytes, RecordSpec};
    use crate::store::testutil::{issue, issue_end_entity, TestCa};
    use crate::{
        time32_to_micros, CrlEntries, Duration, HashBasedRevocationInfo, HashedId3,
        SignerIdentifierPreference,
    };
    use std::time::Duration as StdDuration;

    const PSID: Psid = Psid(135);
    /// a reference instant comfortably inside all test validity windows
    const T0: Time32 = 200_000_000;

    struct Fixture {
        entity: SecurityEntity,
        outcomes: Receiver<VerifyOutcome>,
        ee_digest: HashedId8,
    }

    /// Initializes the engine, adds the five-member chain
    /// root -> intermediate -> pseudonym CA, with enrollment CA and
    /// registration authority as siblings of the intermediate, loads one
    /// sequential credential under the pseudonym CA, and registers a
    /// profile for PSID 135.
    fn fixture(mut adjust: impl FnMut(&mut SecurityProfile)) -> Fixture {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let inter = issue("ica", Some(&root), 1_000, Duration::Years(15), None, &[]);
        let pca = issue("pca", Some(&inter), 2_000, Duration::Years(10), None, &[]);
        let eca = issue("eca", Some(&inter), 2_000, Duration::Years(10), None, &[]);
        let ra = issue("ra", Some(&inter), 2_000, Duration::Years(10), None, &[]);

        let (entity, outcomes) = SecurityEntity::start(EntityConfig::default());
        for (role, ca) in [
            (CaRole::Root, &root),
            (CaRole::Intermediate, &inter),
            (CaRole::PseudonymCa, &pca),
            (CaRole::EnrollmentCa, &eca),
            (CaRole::RegistrationAuthority, &ra),
        ] {
            entity.add_ca_certificate(role, ca.cert.raw()).unwrap();
        }

        let ee_digest = load_credential(&entity, &pca);

        let mut profile = SecurityProfile::new(PSID);
        adjust(&mut profile);
        entity.register_profile(profile);

        Fixture {
            entity,
            outcomes,
            ee_digest,
        }
    }

    fn load_credential(entity: &SecurityEntity, pca: &TestCa) -> HashedId8 {
        let ee = issue_end_entity(pca, PSID, 10_000, Duration::Years(9));
        let record = record_bytes(&RecordSpec {
            issuer_digest: pca.digest8,
            cert: &ee.cert,
            private_key: ee.key.to_bytes().into(),
            valid_start: 10_000,
            valid_end: 10_000 + 9 * 365 * 86_400,
            psids: &[135],
        });
        entity
            .load_cmh(CredentialKind::Application, &record)
            .unwrap()
    }

    fn verdict_of(fixture: &Fixture, request_id: u64) -> Verdict {
        loop {
            let outcome = fixture
                .outcomes
                .recv_timeout(StdDuration::from_secs(1))
                .expect("a verdict within one second");
            if outcome.request_id == request_id {
                return outcome.verdict;
            }
        }
    }

    #[test]
    fn signed_round_trip_is_accepted() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let payload = b"basic safety message".to_vec();

        let bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                payload.clone(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();

        let id = fixture.entity.verify_spdu(bytes, at + 50_000).unwrap();
        let verdict = verdict_of(&fixture, id);
        let Verdict::Accepted {
            psid,
            payload: delivered,
            generation_time,
        } = verdict
        else {
            panic!("rejected: {verdict:?}");
        };
        assert_eq!(psid, Some(PSID));
        assert_eq!(delivered.as_deref(), Some(&payload[..]));
        assert_eq!(generation_time, Some(at));
    }

    #[test]
    fn digest_signer_requires_a_learned_certificate() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);

        let mut request =
            SignRequest::new(PSID, b"one".to_vec(), CredentialKind::Application, at);
        request.signer = SignerIdentifierPreference::Digest;
        let digest_only = fixture.entity.sign_spdu(&request).unwrap();

        // nothing has been learned yet
        let id = fixture
            .entity
            .verify_spdu(digest_only, at + 1_000)
            .unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::NoSignerCertInTable)
        );

        // a message embedding the certificate teaches the cache
        let with_cert = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"two".to_vec(),
                CredentialKind::Application,
                at + 2_000,
            ))
            .unwrap();
        let id = fixture.entity.verify_spdu(with_cert, at + 3_000).unwrap();
        assert!(verdict_of(&fixture, id).is_accepted());
        assert!(fixture.entity.find_peer(&fixture.ee_digest).is_some());

        // the retry with a digest-only signer now resolves
        let mut request =
            SignRequest::new(PSID, b"three".to_vec(), CredentialKind::Application, at + 4_000);
        request.signer = SignerIdentifierPreference::Digest;
        let digest_only = fixture.entity.sign_spdu(&request).unwrap();
        let id = fixture
            .entity
            .verify_spdu(digest_only, at + 5_000)
            .unwrap();
        assert!(verdict_of(&fixture, id).is_accepted());
    }

    #[test]
    fn revoked_signer_is_rejected_despite_valid_signature() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"payload".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();

        // revoke the end-entity certificate by digest
        let ee = fixture.entity.lock().cmh.find(&fixture.ee_digest).unwrap().cert.clone();
        let contents = CrlContents {
            version: 1,
            craca_id: HashedId3([0; 3]),
            crl_series: 1,
            issue_date: T0 - 100,
            next_crl: T0 + 100_000,
            entries: CrlEntries::HashBased(vec![HashBasedRevocationInfo {
                id: crypto::hashed_id10(ee.raw()),
                expiry: T0 + 100_000,
            }]),
        };
        fixture.entity.apply_crl(T0, &contents).unwrap();

        let id = fixture.entity.verify_spdu(bytes, at + 1_000).unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::RevokedSigner)
        );
        // the revoked certificate must not have been cached
        assert!(fixture.entity.find_peer(&fixture.ee_digest).is_none());
    }

    #[test]
    fn tampered_signature_fails_and_caches_nothing() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let mut bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"payload".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();
        // flip the last byte of the signature's s component
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let id = fixture.entity.verify_spdu(bytes, at + 1_000).unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::SignatureVerificationFailed)
        );
        // a bad signature must not leave the signer certificate cached
        assert!(fixture.entity.find_peer(&fixture.ee_digest).is_none());
    }

    #[test]
    fn stale_message_honors_relevance_toggles() {
        let at = time32_to_micros(T0);
        let now = at + 7_200_000_000; // two hours later

        // checks enabled: too old
        let strict = fixture(|_| {});
        let bytes = strict
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"stale".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();
        let id = strict.entity.verify_spdu(bytes.clone(), now).unwrap();
        assert_eq!(
            verdict_of(&strict, id),
            Verdict::Rejected(RejectReason::MessageTooOld)
        );

        // all relevance checks disabled: the same message is accepted
        let lenient = fixture(|profile| {
            profile.rx.check_generation_time = false;
            profile.rx.check_future_time = false;
            profile.rx.check_expiry_time = false;
            profile.rx.check_distance = false;
            profile.rx.check_replay = false;
            profile.rx.check_chain_expiry = false;
        });
        let bytes = lenient
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"stale".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();
        let id = lenient.entity.verify_spdu(bytes, now).unwrap();
        assert!(verdict_of(&lenient, id).is_accepted());
    }

    #[test]
    fn replayed_message_is_rejected() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"once".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();

        let id = fixture.entity.verify_spdu(bytes.clone(), at + 1_000).unwrap();
        assert!(verdict_of(&fixture, id).is_accepted());
        let id = fixture.entity.verify_spdu(bytes, at + 2_000).unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::ReplayedSpdu)
        );
    }

    #[test]
    fn expiry_before_generation_is_rejected_before_signature_verification() {
        // the check precedes signature verification: the rewritten header
        // below breaks the signature, yet the verdict is the specific
        // internal-consistency reason
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);

        let mut message = {
            let bytes = fixture
                .entity
                .sign_spdu(&SignRequest::new(
                    PSID,
                    b"x".to_vec(),
                    CredentialKind::Application,
                    at,
                ))
                .unwrap();
            Ieee1609Dot2Data::decode(&bytes).unwrap().decoded
        };
        // rewrite the header so that expiry precedes generation
        {
            let Ieee1609Dot2Content::SignedData(signed) = &mut message.content else {
                panic!("expected signed data");
            };
            signed.tbs_data.header_info.expiry_time = Some(at - 1);
            signed.tbs_data.raw = Bytes::new();
        }
        let bytes = crate::Encode::encode_to_vec(&message).unwrap();

        let id = fixture.entity.verify_spdu(bytes, at + 1_000).unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::ExpiryBeforeGenerationTime)
        );
    }

    #[test]
    fn unsecured_messages_pass_through() {
        let fixture = fixture(|_| {});
        let mut request = SignRequest::new(
            PSID,
            b"plain".to_vec(),
            CredentialKind::Application,
            time32_to_micros(T0),
        );
        request.unsecured = true;
        let bytes = fixture.entity.sign_spdu(&request).unwrap();
        let id = fixture
            .entity
            .verify_spdu(bytes, time32_to_micros(T0))
            .unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Accepted {
                psid: None,
                payload: Some(Bytes::from_static(b"plain")),
                generation_time: None,
            }
        );
    }

    #[test]
    fn missing_profile_is_rejected() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"p".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();
        fixture.entity.lock().profiles.remove(PSID);
        let id = fixture.entity.verify_spdu(bytes, at + 1_000).unwrap();
        assert_eq!(
            verdict_of(&fixture, id),
            Verdict::Rejected(RejectReason::NoSecProfile)
        );
    }

    #[test]
    fn sign_without_profile_or_credential_fails_specifically() {
        let (entity, _outcomes) = SecurityEntity::start(EntityConfig::default());
        let request = SignRequest::new(
            PSID,
            b"p".to_vec(),
            CredentialKind::Application,
            time32_to_micros(T0),
        );
        assert_eq!(entity.sign_spdu(&request), Err(Error::NoSecProfile));

        entity.register_profile(SecurityProfile::new(PSID));
        assert_eq!(entity.sign_spdu(&request), Err(Error::NoAvailableCmh));
    }

    #[test]
    fn full_queue_fails_fast() {
        let fixture = fixture(|_| {});
        let at = time32_to_micros(T0);
        let bytes = fixture
            .entity
            .sign_spdu(&SignRequest::new(
                PSID,
                b"q".to_vec(),
                CredentialKind::Application,
                at,
            ))
            .unwrap();

        let mut submitted = 0usize;
        let mut rejected_fast = 0usize;
        for _ in 0..500 {
            match fixture.entity.verify_spdu(bytes.clone(), at + 1_000) {
                Ok(_) => submitted += 1,
                Err(Error::WorkQueueFull) => rejected_fast += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(submitted + rejected_fast, 500);
        // every accepted submission produces exactly one verdict
        for _ in 0..submitted {
            fixture
                .outcomes
                .recv_timeout(StdDuration::from_secs(5))
                .expect("a verdict per submission");
        }
        assert!(fixture
            .outcomes
            .recv_timeout(StdDuration::from_millis(50))
            .is_err());
    }

    #[test]
    fn empty_spdu_is_rejected_synchronously() {
        let fixture = fixture(|_| {});
        assert_eq!(
            fixture.entity.verify_spdu(Vec::new(), 0),
            Err(Error::InvalidParameter("empty SPDU"))
        );
    }
}
