//! Certificate revocation: the hash-based index of explicitly revoked
//! certificate digests, and the linkage-value index of pseudonym
//! certificates revoked through their linkage authorities' seed pairs.
//!
//! Linkage entries are scoped to a single `i`-period; when the period
//! advances the previous period's values are dropped, never retained.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{
    time, Certificate, CertificateId, CrlContents, CrlEntries, Error, HashedId10, IValue, LaId,
    LinkageGroup, LinkageSeed, LinkageValue, Time32,
};

/// One-way update of a linkage seed: `H(la_id || seed || zero pad)`
/// truncated to the seed width.
fn advance_seed(la_id: &LaId, seed: &LinkageSeed) -> LinkageSeed {
    let mut input = [0u8; 32];
    input[..2].copy_from_slice(&la_id.0);
    input[2..18].copy_from_slice(&seed.0);
    let digest = {
        let mut hasher = Sha256::new();
        hasher.update(input);
        hasher.finalize()
    };
    LinkageSeed(digest[..16].try_into().expect("slice of fixed length"))
}

fn pre_linkage_value(la_id: &LaId, seed: &LinkageSeed, j: u8) -> [u8; 9] {
    let mut hasher = Sha256::new();
    hasher.update(la_id.0);
    hasher.update(seed.0);
    hasher.update(u32::from(j).to_be_bytes());
    let digest = hasher.finalize();
    digest[..9].try_into().expect("slice of fixed length")
}

/// Derives the linkage values of one revocation group for `i_target`.
///
/// A pure function of the group fields: the two seeds are advanced from
/// `i_rev` to `i_target` by the one-way update, then one value per slot
/// index is produced by XOR of the two per-authority halves. Returns an
/// empty set when the revocation window has closed (`i_target > i_max`)
/// or cannot be reached (`i_target < i_rev`).
#[must_use]
pub fn derive_linkage_values(group: &LinkageGroup, i_target: IValue) -> Vec<LinkageValue> {
    if i_target > group.i_max || i_target < group.i_rev {
        return Vec::new();
    }
    let mut seed1 = group.linkage_seed1;
    let mut seed2 = group.linkage_seed2;
    for _ in group.i_rev..i_target {
        seed1 = advance_seed(&group.la1_id, &seed1);
        seed2 = advance_seed(&group.la2_id, &seed2);
    }
    (0..group.j_max)
        .map(|j| {
            let half1 = pre_linkage_value(&group.la1_id, &seed1, j);
            let half2 = pre_linkage_value(&group.la2_id, &seed2, j);
            let mut value = [0u8; 9];
            for (out, (a, b)) in value.iter_mut().zip(half1.iter().zip(half2.iter())) {
                *out = a ^ b;
            }
            LinkageValue(value)
        })
        .collect()
}

/// The two revocation indices consulted before a certificate is accepted
/// or trusted.
#[derive(Debug, Default)]
pub struct RevocationIndex {
    /// revoked certificate digests with their per-entry expiry
    by_digest: HashMap<HashedId10, Time32>,
    /// the `i`-period the linkage set below belongs to
    linkage_period: Option<IValue>,
    linkage: HashSet<LinkageValue>,
}

impl RevocationIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies decoded CRL contents at reference time `now`.
    ///
    /// Fails with [`Error::InvalidPeriod`] when `now` lies outside
    /// `[issue_date, next_crl]`; the entries are not inspected in that
    /// case.
    pub fn apply_crl_contents(&mut self, now: Time32, crl: &CrlContents) -> Result<(), Error> {
        if now < crl.issue_date || now > crl.next_crl {
            warn!(
                issue_date = crl.issue_date,
                next_crl = crl.next_crl,
                now,
                "CRL outside its validity window"
            );
            return Err(Error::InvalidPeriod);
        }
        match &crl.entries {
            CrlEntries::HashBased(entries) => {
                let mut inserted = 0usize;
                for entry in entries {
                    // entries already expired carry no revocation meaning
                    if entry.expiry >= now {
                        self.by_digest.insert(entry.id, entry.expiry);
                        inserted += 1;
                    }
                }
                debug!(inserted, total = entries.len(), "hash-based CRL applied");
            }
            CrlEntries::LinkageBased(groups) => {
                let i_current = time::i_period_of(now);
                self.rotate_to(i_current);
                let mut inserted = 0usize;
                for group in groups {
                    if i_current > group.i_max {
                        debug!(i_max = group.i_max, i_current, "stale linkage group ignored");
                        continue;
                    }
                    let values = derive_linkage_values(group, i_current);
                    inserted += values.len();
                    self.linkage.extend(values);
                }
                debug!(inserted, groups = groups.len(), "linkage CRL applied");
            }
        }
        Ok(())
    }

    /// Clears linkage state belonging to a period other than `i_current`.
    fn rotate_to(&mut self, i_current: IValue) {
        if self.linkage_period != Some(i_current) {
            self.linkage.clear();
            self.linkage_period = Some(i_current);
        }
    }

    /// Whether the digest appears in the hash-based index.
    #[must_use]
    pub fn is_revoked_digest(&self, digest: &HashedId10) -> bool {
        self.by_digest.contains_key(digest)
    }

    /// Whether the certificate is revoked: by its ten-byte digest, or for
    /// certificates carrying linkage data, by the (period, linkage value)
    /// pair.
    #[must_use]
    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        if self.is_revoked_digest(&crate::crypto::hashed_id10(cert.raw())) {
            return true;
        }
        if let CertificateId::LinkageData(linkage) = &cert.to_be_signed.id {
            return self.linkage_period == Some(linkage.i_cert)
                && self.linkage.contains(&linkage.linkage_value);
        }
        false
    }

    /// Drops hash entries whose own expiry has passed and linkage values
    /// of past periods.
    pub fn sweep_expired(&mut self, now: Time32) {
        self.by_digest.retain(|_, expiry| *expiry >= now);
        let i_current = time::i_period_of(now);
        if self
            .linkage_period
            .is_some_and(|period| period < i_current)
        {
            self.linkage.clear();
            self.linkage_period = None;
        }
    }

    #[must_use]
    pub fn revoked_digest_count(&self) -> usize {
        self.by_digest.len()
    }

    #[must_use]
    pub fn linkage_value_count(&self) -> usize {
        self.linkage.len()
    }
}
