//! Local credential holders (CMH): the device's own signing credentials.
//!
//! Sequential holders carry one long-lived certificate and private key
//! each (enrollment and application identities, selectable by "currently
//! valid at time T"). Rotating sets carry an indexed batch of pseudonym or
//! identification certificates valid within one `i`-period, each derived
//! from a shared expansion key and a per-slot private reconstruction
//! value; the signing slot is chosen pseudo-randomly to avoid
//! linkability.

use std::collections::{HashMap, HashSet};

use nom::{
    bytes::complete::take,
    number::complete::{be_i32, be_u16, be_u32},
    IResult,
};
use p256::ecdsa::SigningKey;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::{
    crypto, store, time, Certificate, CertificateId, CertificateStore, CircularRegion, Decode,
    DecodeError, Error, GeographicRegion, HashedId3, HashedId8, IValue, IdentifiedRegion,
    LinkageValue, Psid, Time32, Time64, TwoDLocation,
};

/// Largest rotating-set batch for pseudonym credentials.
pub const J_MAX_PSEUDONYM: u8 = 32;
/// Largest rotating-set batch for identification credentials.
pub const J_MAX_IDENTIFICATION: u8 = 2;

/// The class of a local credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CredentialKind {
    /// enrollment identity, sequential
    Enrollment,
    /// long-lived application identity, sequential
    Application,
    /// rotating pseudonym set
    Pseudonym,
    /// rotating identification set
    Identification,
}

impl CredentialKind {
    /// whether this class is organized as rotating sets
    #[must_use]
    pub fn rotating(self) -> bool {
        matches!(self, CredentialKind::Pseudonym | CredentialKind::Identification)
    }

    fn max_j(self) -> Option<u8> {
        match self {
            CredentialKind::Pseudonym => Some(J_MAX_PSEUDONYM),
            CredentialKind::Identification => Some(J_MAX_IDENTIFICATION),
            CredentialKind::Enrollment | CredentialKind::Application => None,
        }
    }
}

/// The holder identifier carried in a credential record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CmhIdentifier {
    None,
    Linkage {
        i_cert: IValue,
        linkage_value: LinkageValue,
    },
    Hostname(String),
    Binary(Vec<u8>),
}

/// One locally held signing credential.
#[derive(Debug, Clone)]
pub struct CmhEntry {
    pub kind: CredentialKind,
    pub cert: Certificate,
    pub digest8: HashedId8,
    pub(crate) private_key: SigningKey,
    /// lookup key of the issuing CA entry
    pub issuer: HashedId8,
    pub valid_start: Time64,
    pub valid_end: Time64,
    /// the application areas this credential may sign for
    pub psids: Vec<Psid>,
    pub region: Option<GeographicRegion>,
    pub identifier: CmhIdentifier,
    /// slot index within a rotating set
    pub j: Option<u8>,
    /// instant the full certificate was last embedded in an outgoing
    /// message, for the inter-certificate-interval decision
    pub(crate) last_cert_tx: Option<Time64>,
}

impl CmhEntry {
    #[must_use]
    pub fn valid_at(&self, at: Time64) -> bool {
        self.valid_start <= at && at < self.valid_end
    }

    /// whether this credential may sign for `psid`
    #[must_use]
    pub fn permits(&self, psid: Psid) -> bool {
        if !self.psids.is_empty() {
            return self.psids.contains(&psid);
        }
        self.cert
            .to_be_signed
            .app_permissions
            .as_ref()
            .is_some_and(|permissions| permissions.iter().any(|entry| entry.psid == psid))
    }
}

#[derive(Debug)]
struct RotatingSet {
    i_period: IValue,
    entries: Vec<CmhEntry>,
}

/// The table of local credentials.
#[derive(Debug, Default)]
pub struct CmhStore {
    sequential: HashMap<CredentialKind, Vec<CmhEntry>>,
    rotating: HashMap<CredentialKind, Vec<RotatingSet>>,
}

/// One slot of a rotating credential batch as delivered by provisioning.
#[derive(Debug, Clone)]
pub struct RotatingSlot {
    /// the per-slot private key reconstruction value
    pub reconstruction_private: [u8; 32],
    /// the encoded slot certificate
    pub certificate: Vec<u8>,
}

impl CmhStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a fixed binary credential record, reconstructs and checks
    /// the key pair, resolves the issuer, validates the nested-validity
    /// invariant and appends the credential.
    pub fn load_sequential(
        &mut self,
        kind: CredentialKind,
        bytes: &[u8],
        ca: &CertificateStore,
    ) -> Result<HashedId8, Error> {
        if kind.rotating() {
            return Err(Error::InvalidParameter(
                "rotating credential class in sequential load",
            ));
        }
        let (rest, record) = credential_record(bytes).map_err(DecodeError::from)?;
        if !rest.is_empty() {
            return Err(Error::Decode("trailing bytes after credential record".into()));
        }

        let decoded = Certificate::decode(&record.cert_bytes)?;
        if decoded.bytes_consumed != record.cert_bytes.len() {
            return Err(Error::Decode("trailing bytes after certificate".into()));
        }
        let cert = decoded.decoded;
        let digest8 = crypto::hashed_id8(&record.cert_bytes);
        if digest8 != record.cert_digest {
            return Err(Error::Decode("certificate digest mismatch".into()));
        }
        if self.find(&digest8).is_some() {
            debug!(digest = ?digest8, "credential already present");
            return Err(Error::AlreadyPresent);
        }

        let crate::IssuerIdentifier::Sha256AndDigest(issuer_digest) = cert.issuer else {
            return Err(Error::InvalidParameter("self-signed credential certificate"));
        };
        if issuer_digest != record.issuer_digest {
            return Err(Error::Decode("issuer digest mismatch".into()));
        }
        let issuer = ca.find_by_digest8(&issuer_digest).ok_or(Error::NoIssuerCert)?;
        store::validate_subordinate(&cert, &issuer.cert, &issuer.verifying_key)?;

        let record_start = time::time32_to_micros(record.valid_start);
        let record_end = time::time32_to_micros(record.valid_end);
        let cert_period = &cert.to_be_signed.validity_period;
        if record_start < cert_period.start_micros()
            || record_end > cert_period.end_micros()
            || record_start >= record_end
        {
            return Err(Error::InvalidParameter(
                "record validity exceeds the certificate's",
            ));
        }

        let private_key = crypto::signing_key_from_bytes(&record.private_key)?;
        let public = store::subordinate_key(&cert, &issuer.cert, &issuer.verifying_key)?;
        if !crypto::private_matches_public(&private_key, &public) {
            return Err(Error::KeyReconstructionFailed);
        }

        let entry = CmhEntry {
            kind,
            digest8,
            private_key,
            issuer: issuer_digest,
            valid_start: record_start,
            valid_end: record_end,
            psids: record.psids,
            region: record
                .region
                .or_else(|| cert.to_be_signed.region.clone())
                .or_else(|| issuer.region.clone()),
            identifier: record.identifier,
            j: None,
            last_cert_tx: None,
            cert,
        };
        let list = self.sequential.entry(kind).or_default();
        list.push(entry);
        list.sort_by_key(|entry| entry.valid_start);
        debug!(?kind, digest = ?digest8, "sequential credential loaded");
        Ok(digest8)
    }

    /// Validates and loads a rotating credential batch as a unit: if any
    /// slot's reconstruction value is inconsistent with the expansion key
    /// and its certificate, nothing is loaded.
    pub fn load_rotating_set(
        &mut self,
        kind: CredentialKind,
        i_period: IValue,
        j_max: u8,
        expansion_key: &[u8; 16],
        slots: &[RotatingSlot],
        ca: &CertificateStore,
    ) -> Result<(), Error> {
        let Some(limit) = kind.max_j() else {
            return Err(Error::InvalidParameter(
                "sequential credential class in rotating load",
            ));
        };
        if j_max == 0 || j_max > limit {
            return Err(Error::JValueOutOfRange);
        }
        if slots.len() != usize::from(j_max) {
            return Err(Error::InvalidParameter("slot count does not match j_max"));
        }
        if self
            .rotating
            .get(&kind)
            .is_some_and(|sets| sets.iter().any(|set| set.i_period == i_period))
        {
            return Err(Error::AlreadyPresent);
        }

        let mut entries = Vec::with_capacity(slots.len());
        for (j, slot) in (0u8..).zip(slots) {
            let decoded = Certificate::decode(&slot.certificate)?;
            if decoded.bytes_consumed != slot.certificate.len() {
                return Err(Error::Decode("trailing bytes after certificate".into()));
            }
            let cert = decoded.decoded;
            let crate::IssuerIdentifier::Sha256AndDigest(issuer_digest) = cert.issuer else {
                return Err(Error::InvalidParameter("self-signed credential certificate"));
            };
            let issuer = ca.find_by_digest8(&issuer_digest).ok_or(Error::NoIssuerCert)?;
            store::validate_subordinate(&cert, &issuer.cert, &issuer.verifying_key)?;

            let private_key =
                crypto::rotating_slot_key(expansion_key, i_period, j, &slot.reconstruction_private)?;
            let public = store::subordinate_key(&cert, &issuer.cert, &issuer.verifying_key)?;
            if !crypto::private_matches_public(&private_key, &public) {
                return Err(Error::KeyReconstructionFailed);
            }

            let identifier = match &cert.to_be_signed.id {
                CertificateId::LinkageData(linkage) => CmhIdentifier::Linkage {
                    i_cert: linkage.i_cert,
                    linkage_value: linkage.linkage_value,
                },
                CertificateId::Name(name) => CmhIdentifier::Hostname(name.clone()),
                CertificateId::BinaryId(id) => CmhIdentifier::Binary(id.clone()),
                CertificateId::None => CmhIdentifier::None,
            };
            entries.push(CmhEntry {
                kind,
                digest8: crypto::hashed_id8(&slot.certificate),
                private_key,
                issuer: issuer_digest,
                valid_start: cert.to_be_signed.validity_period.start_micros(),
                valid_end: cert.to_be_signed.validity_period.end_micros(),
                psids: Vec::new(),
                region: cert
                    .to_be_signed
                    .region
                    .clone()
                    .or_else(|| issuer.region.clone()),
                identifier,
                j: Some(j),
                last_cert_tx: None,
                cert,
            });
        }

        debug!(?kind, i_period, slots = entries.len(), "rotating set loaded");
        self.rotating
            .entry(kind)
            .or_default()
            .push(RotatingSet { i_period, entries });
        Ok(())
    }

    /// Selects the credential to sign with at `at`: the sequential entry
    /// whose validity window contains `at`, or a pseudo-randomly chosen
    /// valid slot of the matching rotating set.
    pub fn select_for_signing(
        &mut self,
        kind: CredentialKind,
        psid: Psid,
        at: Time64,
    ) -> Option<&mut CmhEntry> {
        if !kind.rotating() {
            return self
                .sequential
                .get_mut(&kind)?
                .iter_mut()
                .find(|entry| entry.valid_at(at) && entry.permits(psid));
        }

        let i_period = time::i_period_of_micros(at);
        let sets = self.rotating.get_mut(&kind)?;
        let set = sets.iter_mut().find(|set| set.i_period == i_period)?;
        let candidates: Vec<usize> = set
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.valid_at(at) && entry.permits(psid))
            .map(|(index, _)| index)
            .collect();
        let index = *candidates.choose(&mut rand::thread_rng())?;
        set.entries.get_mut(index)
    }

    /// A read-only view of a credential by certificate digest.
    #[must_use]
    pub fn find(&self, digest: &HashedId8) -> Option<&CmhEntry> {
        self.iter().find(|entry| entry.digest8 == *digest)
    }

    /// Explicitly unloads a credential.
    pub fn remove(&mut self, digest: &HashedId8) -> Result<(), Error> {
        for list in self.sequential.values_mut() {
            let before = list.len();
            list.retain(|entry| entry.digest8 != *digest);
            if list.len() != before {
                return Ok(());
            }
        }
        for sets in self.rotating.values_mut() {
            for set in sets.iter_mut() {
                let before = set.entries.len();
                set.entries.retain(|entry| entry.digest8 != *digest);
                if set.entries.len() != before {
                    return Ok(());
                }
            }
        }
        Err(Error::InvalidParameter("credential not in table"))
    }

    /// Removes credentials whose validity end precedes `now`.
    pub fn sweep_expired(&mut self, now: Time64) -> usize {
        let before = self.count();
        for list in self.sequential.values_mut() {
            list.retain(|entry| entry.valid_end > now);
        }
        self.sequential.retain(|_, list| !list.is_empty());
        for sets in self.rotating.values_mut() {
            for set in sets.iter_mut() {
                set.entries.retain(|entry| entry.valid_end > now);
            }
            sets.retain(|set| !set.entries.is_empty());
        }
        self.rotating.retain(|_, sets| !sets.is_empty());
        before - self.count()
    }

    /// The issuer digests referenced by live credentials; the certificate
    /// store's sweep must not drop these.
    #[must_use]
    pub fn issuer_refs(&self) -> HashSet<HashedId8> {
        self.iter().map(|entry| entry.issuer).collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    fn iter(&self) -> impl Iterator<Item = &CmhEntry> {
        self.sequential
            .values()
            .flatten()
            .chain(self.rotating.values().flatten().flat_map(|set| &set.entries))
    }
}

//**************************************************************************
//                        Credential Record Format
//**************************************************************************

struct CredentialRecord {
    issuer_digest: HashedId8,
    #[allow(dead_code)]
    craca_id: HashedId3,
    #[allow(dead_code)]
    crl_series: u16,
    valid_start: Time32,
    valid_end: Time32,
    region: Option<GeographicRegion>,
    psids: Vec<Psid>,
    cert_digest: HashedId8,
    identifier: CmhIdentifier,
    private_key: [u8; 32],
    cert_bytes: Vec<u8>,
}

type In<'a> = &'a [u8];
type PResult<'a, T> = IResult<In<'a>, T, DecodeError>;

fn byte(i: In) -> PResult<u8> {
    let (i, taken) = take(1usize)(i)?;
    Ok((i, taken[0]))
}

fn array<const N: usize>(i: In) -> PResult<[u8; N]> {
    let (i, taken) = take(N)(i)?;
    Ok((i, taken.try_into().expect("slice of fixed length")))
}

fn record_region(i: In) -> PResult<Option<GeographicRegion>> {
    let (i, tag) = byte(i)?;
    match tag {
        0 => Ok((i, None)),
        1 => {
            let (i, latitude) = be_i32(i)?;
            let (i, longitude) = be_i32(i)?;
            let (i, radius) = be_u16(i)?;
            Ok((
                i,
                Some(GeographicRegion::Circular(CircularRegion {
                    center: TwoDLocation {
                        latitude,
                        longitude,
                    },
                    radius,
                })),
            ))
        }
        2 => {
            let (i, count) = byte(i)?;
            let mut countries = Vec::with_capacity(usize::from(count));
            let mut i = i;
            for _ in 0..count {
                let (rest, country) = be_u16(i)?;
                countries.push(IdentifiedRegion::CountryOnly(country));
                i = rest;
            }
            Ok((i, Some(GeographicRegion::Identified(countries))))
        }
        other => Err(nom::Err::Error(DecodeError::EnumError(format!(
            "region type {other}"
        )))),
    }
}

fn record_identifier(i: In) -> PResult<CmhIdentifier> {
    let (i, tag) = byte(i)?;
    match tag {
        0 => Ok((i, CmhIdentifier::None)),
        1 => {
            let (i, i_cert) = be_u16(i)?;
            let (i, value) = array::<9>(i)?;
            Ok((
                i,
                CmhIdentifier::Linkage {
                    i_cert,
                    linkage_value: LinkageValue(value),
                },
            ))
        }
        2 => {
            let (i, len) = byte(i)?;
            let (i, bytes) = take(usize::from(len))(i)?;
            let name = core::str::from_utf8(bytes)
                .map_err(|e| nom::Err::Error(DecodeError::StringError(e.to_string())))?;
            Ok((i, CmhIdentifier::Hostname(name.into())))
        }
        3 => {
            let (i, len) = byte(i)?;
            let (i, bytes) = take(usize::from(len))(i)?;
            Ok((i, CmhIdentifier::Binary(bytes.to_vec())))
        }
        other => Err(nom::Err::Error(DecodeError::EnumError(format!(
            "identifier type {other}"
        )))),
    }
}

/// The fixed-layout credential record: common header, individual-holder
/// record, private key material, certificate bytes. Network byte order,
/// strict lengths throughout.
fn credential_record(i: In) -> PResult<CredentialRecord> {
    let (i, issuer_digest) = array::<8>(i)?;
    let (i, craca_id) = array::<3>(i)?;
    let (i, crl_series) = be_u16(i)?;
    let (i, valid_start) = be_u32(i)?;
    let (i, valid_end) = be_u32(i)?;
    let (i, region) = record_region(i)?;
    let (i, psid_count) = byte(i)?;
    let mut psids = Vec::with_capacity(usize::from(psid_count));
    let mut i = i;
    for _ in 0..psid_count {
        let (rest, psid) = be_u32(i)?;
        psids.push(Psid(u64::from(psid)));
        i = rest;
    }
    let (i, cert_size) = be_u16(i)?;
    let (i, cert_digest) = array::<8>(i)?;
    let (i, identifier) = record_identifier(i)?;
    let (i, private_key) = array::<32>(i)?;
    let (i, cert_bytes) = take(usize::from(cert_size))(i)?;
    Ok((
        i,
        CredentialRecord {
            issuer_digest: HashedId8(issuer_digest),
            craca_id: HashedId3(craca_id),
            crl_series,
            valid_start,
            valid_end,
            region,
            psids,
            cert_digest: HashedId8(cert_digest),
            identifier,
            private_key,
            cert_bytes: cert_bytes.to_vec(),
        },
    ))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{issue, issue_end_entity};
    use crate::{CaRole, Duration};

    const PSID: Psid = Psid(135);

    fn provisioned() -> (CertificateStore, crate::store::testutil::TestCa) {
        let root = issue("root", None, 0, Duration::Years(20), None, &[]);
        let mut store = CertificateStore::new(8);
        store
            .add_ca_certificate(CaRole::Root, root.cert.raw())
            .unwrap();
        (store, root)
    }

    fn sequential_record(
        ca: &crate::store::testutil::TestCa,
    ) -> (Vec<u8>, HashedId8) {
        let ee = issue_end_entity(ca, PSID, 1_000, Duration::Years(1));
        let record = testutil::record_bytes(&testutil::RecordSpec {
            issuer_digest: ca.digest8,
            cert: &ee.cert,
            private_key: ee.key.to_bytes().into(),
            valid_start: 1_000,
            valid_end: 1_000 + 365 * 86_400,
            psids: &[135],
        });
        (record, crypto::hashed_id8(ee.cert.raw()))
    }

    #[test]
    fn loads_sequential_credential() {
        let (store, root) = provisioned();
        let (record, digest) = sequential_record(&root);
        let mut cmh = CmhStore::new();
        let loaded = cmh
            .load_sequential(CredentialKind::Application, &record, &store)
            .unwrap();
        assert_eq!(loaded, digest);
        assert_eq!(cmh.count(), 1);

        let at = time::time32_to_micros(2_000);
        let entry = cmh
            .select_for_signing(CredentialKind::Application, PSID, at)
            .unwrap();
        assert_eq!(entry.digest8, digest);
        // wrong application area finds nothing
        assert!(cmh
            .select_for_signing(CredentialKind::Application, Psid(999), at)
            .is_none());
    }

    #[test]
    fn duplicate_credential_is_distinct() {
        let (store, root) = provisioned();
        let (record, _) = sequential_record(&root);
        let mut cmh = CmhStore::new();
        cmh.load_sequential(CredentialKind::Application, &record, &store)
            .unwrap();
        assert_eq!(
            cmh.load_sequential(CredentialKind::Application, &record, &store),
            Err(Error::AlreadyPresent)
        );
        assert_eq!(cmh.count(), 1);
    }

    #[test]
    fn truncated_record_is_too_short() {
        let (store, root) = provisioned();
        let (record, _) = sequential_record(&root);
        let mut cmh = CmhStore::new();
        for cut in [4, 20, record.len() - 1] {
            assert_eq!(
                cmh.load_sequential(CredentialKind::Application, &record[..cut], &store),
                Err(Error::TooShort)
            );
        }
        assert_eq!(cmh.count(), 0);
    }

    #[test]
    fn wrong_private_key_fails_reconstruction() {
        let (store, root) = provisioned();
        let ee = issue_end_entity(&root, PSID, 1_000, Duration::Years(1));
        let wrong = crypto::generate_signing_key();
        let record = testutil::record_bytes(&testutil::RecordSpec {
            issuer_digest: root.digest8,
            cert: &ee.cert,
            private_key: wrong.to_bytes().into(),
            valid_start: 1_000,
            valid_end: 1_000 + 365 * 86_400,
            psids: &[135],
        });
        let mut cmh = CmhStore::new();
        assert_eq!(
            cmh.load_sequential(CredentialKind::Application, &record, &store),
            Err(Error::KeyReconstructionFailed)
        );
    }

    #[test]
    fn missing_issuer_fails() {
        let (_, root) = provisioned();
        let (record, _) = sequential_record(&root);
        let empty = CertificateStore::new(8);
        let mut cmh = CmhStore::new();
        assert_eq!(
            cmh.load_sequential(CredentialKind::Application, &record, &empty),
            Err(Error::NoIssuerCert)
        );
    }

    fn rotating_slots(
        pca: &crate::store::testutil::TestCa,
        i_period: IValue,
        j_max: u8,
        expansion: &[u8; 16],
    ) -> Vec<RotatingSlot> {
        let start = u32::from(i_period) * crate::I_PERIOD_SECONDS;
        (0..j_max)
            .map(|j| {
                let recon: [u8; 32] = crypto::generate_signing_key().to_bytes().into();
                let slot_key = crypto::rotating_slot_key(expansion, i_period, j, &recon).unwrap();
                let cert = crate::store::testutil::issue_with_key(
                    &slot_key,
                    pca,
                    PSID,
                    start,
                    Duration::SixtyHours(1),
                );
                RotatingSlot {
                    reconstruction_private: recon,
                    certificate: cert.raw().to_vec(),
                }
            })
            .collect()
    }

    #[test]
    fn rotating_set_loads_as_a_unit() {
        let (mut store, root) = provisioned();
        let pca = issue("pca", Some(&root), 0, Duration::Years(10), None, &[]);
        store
            .add_ca_certificate(CaRole::PseudonymCa, pca.cert.raw())
            .unwrap();
        let expansion = [3u8; 16];
        // week 400 lies inside the ten-year PCA validity
        let i_period = 400;
        let slots = rotating_slots(&pca, i_period, 4, &expansion);

        let mut cmh = CmhStore::new();
        cmh.load_rotating_set(
            CredentialKind::Pseudonym,
            i_period,
            4,
            &expansion,
            &slots,
            &store,
        )
        .unwrap();
        assert_eq!(cmh.count(), 4);

        let at = time::time32_to_micros(u32::from(i_period) * crate::I_PERIOD_SECONDS + 100);
        let entry = cmh
            .select_for_signing(CredentialKind::Pseudonym, PSID, at)
            .unwrap();
        assert!(entry.j.is_some());
    }

    #[test]
    fn rotating_set_with_bad_slot_fails_as_a_unit() {
        let (mut store, root) = provisioned();
        let pca = issue("pca", Some(&root), 0, Duration::Years(10), None, &[]);
        store
            .add_ca_certificate(CaRole::PseudonymCa, pca.cert.raw())
            .unwrap();
        let expansion = [3u8; 16];
        let mut slots = rotating_slots(&pca, 400, 4, &expansion);
        // corrupt one reconstruction value
        slots[2].reconstruction_private = [0xff; 32];

        let mut cmh = CmhStore::new();
        assert_eq!(
            cmh.load_rotating_set(
                CredentialKind::Pseudonym,
                400,
                4,
                &expansion,
                &slots,
                &store,
            ),
            Err(Error::KeyReconstructionFailed)
        );
        assert_eq!(cmh.count(), 0);
    }

    #[test]
    fn j_max_is_bounded_per_class() {
        let (store, _) = provisioned();
        let mut cmh = CmhStore::new();
        let expansion = [0u8; 16];
        assert_eq!(
            cmh.load_rotating_set(CredentialKind::Pseudonym, 1, 33, &expansion, &[], &store),
            Err(Error::JValueOutOfRange)
        );
        assert_eq!(
            cmh.load_rotating_set(
                CredentialKind::Identification,
                1,
                3,
                &expansion,
                &[],
                &store
            ),
            Err(Error::JValueOutOfRange)
        );
        assert_eq!(
            cmh.load_rotating_set(CredentialKind::Application, 1, 1, &expansion, &[], &store),
            Err(Error::InvalidParameter(
                "sequential credential class in rotating load"
            ))
        );
    }

    #[test]
    fn sweep_removes_expired_credentials() {
        let (store, root) = provisioned();
        let (record, _) = sequential_record(&root);
        let mut cmh = CmhStore::new();
        cmh.load_sequential(CredentialKind::Application, &record, &store)
            .unwrap();
        assert_eq!(cmh.sweep_expired(time::time32_to_micros(500)), 0);
        assert_eq!(
            cmh.sweep_expired(time::time32_to_micros(2_000_000_000)),
            1
        );
        assert_eq!(cmh.count(), 0);
    }
}
