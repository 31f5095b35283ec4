//! Receive-side validation: the consistency and relevance checks of the
//! verification pipeline, and its terminal verdict.
//!
//! Consistency checks establish that the message is coherent with its
//! signer certificate (times inside the validity window, location inside
//! the validity region). Relevance checks establish that the message
//! matters to this receiver now; each is independently toggled by the
//! receive profile. Everything here is pure; the engine supplies copies of
//! the store state it needs.

use bytes::Bytes;

use crate::{
    DecodeError, GeographicRegion, HeaderInfo, Psid, RxProfile, Time64, TwoDLocation,
};

/// mean earth radius in meters, for great-circle distances
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// The specific cause of a rejected SPDU.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// the wire bytes could not be decoded into a supported structure
    DecodeFailed(DecodeError),
    /// the protocol version is not 3
    InvalidProtocolVersion,
    /// no security profile is registered for the claimed PSID
    NoSecProfile,
    /// the signer is identified by digest only and no matching
    /// certificate has been learned; the caller may retry after the
    /// certificate has been seen
    NoSignerCertInTable,
    /// the message is self-signed, which no profile accepts
    UnsupportedSigner,
    /// the signer certificate appears in a revocation index
    RevokedSigner,
    /// the signer certificate's issuer is not in the store
    NoIssuerCert,
    /// the signer certificate failed chain validation
    InvalidSignerChain,
    SignatureVerificationFailed,
    /// the expiry header field precedes the generation time
    ExpiryBeforeGenerationTime,
    GenTimeNotInSignerValidPeriod,
    ExpTimeNotInSignerValidPeriod,
    /// the generation location lies outside the signer certificate's
    /// circular validity region
    LocationNotInSignerRegion,
    /// generation time older than the profile's validity period
    MessageTooOld,
    /// generation time further in the future than the profile tolerates
    MessageFromFuture,
    /// the expiry header field has passed
    MessageExpired,
    /// generated further away than the profile's valid distance
    MessageTooDistant,
    /// duplicate of a message already seen within the validity period
    ReplayedSpdu,
    /// the signer certificate or one of its issuers is expired
    SignerChainExpired,
}

/// The terminal state of one verification pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted {
        /// the PSID claimed by a signed message
        psid: Option<Psid>,
        /// the decoded payload octets, when carried in the message
        payload: Option<Bytes>,
        generation_time: Option<Time64>,
    },
    Rejected(RejectReason),
}

impl Verdict {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Consistency of the header against the signer certificate: generation
/// and expiry times inside the signer's validity window, generation
/// location inside a circular validity region. Identified regions are not
/// evaluated at this layer.
pub(crate) fn check_consistency(
    header: &HeaderInfo,
    signer_validity: (Time64, Time64),
    signer_region: Option<&GeographicRegion>,
    check_location: bool,
) -> Result<(), RejectReason> {
    let (valid_start, valid_end) = signer_validity;
    if let (Some(generation), Some(expiry)) = (header.generation_time, header.expiry_time) {
        if expiry < generation {
            return Err(RejectReason::ExpiryBeforeGenerationTime);
        }
    }
    if let Some(generation) = header.generation_time {
        if generation < valid_start || generation >= valid_end {
            return Err(RejectReason::GenTimeNotInSignerValidPeriod);
        }
    }
    if let Some(expiry) = header.expiry_time {
        if expiry < valid_start || expiry >= valid_end {
            return Err(RejectReason::ExpTimeNotInSignerValidPeriod);
        }
    }
    if check_location {
        if let (Some(location), Some(GeographicRegion::Circular(circle))) =
            (header.generation_location, signer_region)
        {
            let distance = great_circle_distance_m(&location.horizontal(), &circle.center);
            if distance > f64::from(circle.radius) {
                return Err(RejectReason::LocationNotInSignerRegion);
            }
        }
    }
    Ok(())
}

/// The profile-gated relevance checks that need no store access:
/// freshness, future tolerance, expiry, and distance from the receiver.
/// Replay and chain expiry are evaluated by the engine, which owns the
/// replay lists and the certificate tables.
pub(crate) fn check_relevance(
    header: &HeaderInfo,
    profile: &RxProfile,
    now: Time64,
    own_position: Option<TwoDLocation>,
) -> Result<(), RejectReason> {
    if let Some(generation) = header.generation_time {
        if profile.check_generation_time
            && generation.saturating_add(profile.validity_period) < now
        {
            return Err(RejectReason::MessageTooOld);
        }
        if profile.check_future_time
            && generation > now.saturating_add(profile.acceptable_future_period)
        {
            return Err(RejectReason::MessageFromFuture);
        }
    }
    if profile.check_expiry_time {
        if let Some(expiry) = header.expiry_time {
            if expiry < now {
                return Err(RejectReason::MessageExpired);
            }
        }
    }
    if profile.check_distance {
        if let (Some(location), Some(own)) = (header.generation_location, own_position) {
            let distance = great_circle_distance_m(&location.horizontal(), &own);
            if distance > f64::from(profile.valid_distance) {
                return Err(RejectReason::MessageTooDistant);
            }
        }
    }
    Ok(())
}

/// Great-circle distance between two positions given in tenth
/// microdegrees, by the haversine formula.
pub(crate) fn great_circle_distance_m(a: &TwoDLocation, b: &TwoDLocation) -> f64 {
    let lat_a = f64::from(a.latitude) * 1e-7;
    let lat_b = f64::from(b.latitude) * 1e-7;
    let lon_a = f64::from(a.longitude) * 1e-7;
    let lon_b = f64::from(b.longitude) * 1e-7;

    let phi_a = lat_a.to_radians();
    let phi_b = lat_b.to_radians();
    let d_phi = (lat_b - lat_a).to_radians();
    let d_lambda = (lon_b - lon_a).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
