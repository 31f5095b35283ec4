//! Per-application security profiles: the transmit and receive policies
//! keyed by PSID that parameterize the construction and verification
//! pipelines.
//!
//! Registration replaces a profile atomically; the pipelines work on a
//! cloned snapshot, so a profile matched by an in-flight verification
//! never changes under it.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::{Psid, Time64};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on retained replay records per profile.
const REPLAY_LIST_CAPACITY: usize = 4096;

/// The transmit policy: which optional header fields to emit and how to
/// identify the signer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxProfile {
    pub include_generation_time: bool,
    pub include_expiry_time: bool,
    pub include_generation_location: bool,
    /// lifetime granted to a message when an expiry header is emitted, in
    /// microseconds
    pub message_lifetime: u64,
    /// the application's nominal signing period, in microseconds
    pub sign_interval: u64,
    /// emit curve points in compressed form
    pub compress_points: bool,
    /// minimum interval between two transmissions of the complete signing
    /// certificate, in microseconds; a digest is sent in between
    pub cert_interval: u64,
}

impl Default for TxProfile {
    fn default() -> Self {
        Self {
            include_generation_time: true,
            include_expiry_time: false,
            include_generation_location: false,
            message_lifetime: 0,
            sign_interval: 100_000,
            compress_points: true,
            cert_interval: 450_000,
        }
    }
}

/// The receive policy: whether to verify at all, and which relevance and
/// consistency checks apply, with their tolerances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RxProfile {
    /// cryptographically verify received messages; when off the pipeline
    /// accepts after decoding
    pub verify: bool,
    /// reject messages whose generation time is older than
    /// `validity_period`
    pub check_generation_time: bool,
    /// freshness window in microseconds
    pub validity_period: u64,
    /// reject messages generated further in the future than
    /// `acceptable_future_period`
    pub check_future_time: bool,
    pub acceptable_future_period: u64,
    /// reject messages whose expiry header has passed
    pub check_expiry_time: bool,
    /// reject messages generated further away than `valid_distance`
    pub check_distance: bool,
    /// meters
    pub valid_distance: u32,
    /// reject duplicates within the freshness window
    pub check_replay: bool,
    /// check the generation location against the signer certificate's
    /// validity region
    pub check_generation_location: bool,
    /// reject when any certificate of the signer's chain is expired
    pub check_chain_expiry: bool,
}

impl Default for RxProfile {
    fn default() -> Self {
        Self {
            verify: true,
            check_generation_time: true,
            validity_period: 60_000_000,
            check_future_time: true,
            acceptable_future_period: 1_000_000,
            check_expiry_time: true,
            check_distance: false,
            valid_distance: 5_000,
            check_replay: true,
            check_generation_location: true,
            check_chain_expiry: true,
        }
    }
}

/// The security profile of one application area.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SecurityProfile {
    pub psid: Psid,
    pub tx: TxProfile,
    pub rx: RxProfile,
}

impl SecurityProfile {
    /// A profile with the default policies for `psid`.
    #[must_use]
    pub fn new(psid: Psid) -> Self {
        Self {
            psid,
            tx: TxProfile::default(),
            rx: RxProfile::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ReplayRecord {
    generation_time: Time64,
    signature_digest: [u8; 32],
}

/// The PSID-keyed profile table plus the per-profile replay state.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<Psid, SecurityProfile>,
    replay: HashMap<Psid, VecDeque<ReplayRecord>>,
}

impl ProfileRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the profile for its PSID.
    pub fn register(&mut self, profile: SecurityProfile) {
        debug!(psid = profile.psid.0, "security profile registered");
        self.profiles.insert(profile.psid, profile);
    }

    #[must_use]
    pub fn get(&self, psid: Psid) -> Option<&SecurityProfile> {
        self.profiles.get(&psid)
    }

    /// A cloned snapshot for use outside the lock.
    #[must_use]
    pub fn snapshot(&self, psid: Psid) -> Option<SecurityProfile> {
        self.profiles.get(&psid).cloned()
    }

    pub fn remove(&mut self, psid: Psid) -> Option<SecurityProfile> {
        self.replay.remove(&psid);
        self.profiles.remove(&psid)
    }

    /// Records a message in the rolling replay list of its profile and
    /// reports whether it was already present within the window.
    ///
    /// Keyed by generation time and signature digest; records older than
    /// one window are pruned first.
    pub fn check_replay(
        &mut self,
        psid: Psid,
        generation_time: Time64,
        signature_digest: [u8; 32],
        window: u64,
        now: Time64,
    ) -> bool {
        let list = self.replay.entry(psid).or_default();
        while let Some(front) = list.front() {
            if front.generation_time.saturating_add(window) < now {
                list.pop_front();
            } else {
                break;
            }
        }
        let record = ReplayRecord {
            generation_time,
            signature_digest,
        };
        if list.contains(&record) {
            return true;
        }
        if list.len() >= REPLAY_LIST_CAPACITY {
            list.pop_front();
        }
        list.push_back(record);
        false
    }
}
