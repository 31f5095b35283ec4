#![doc = include_str!("../README.md")]
#![cfg(not(doctest))]

use bytes::Bytes;

mod cmh;
mod crypto;
mod decode;
mod encode;
mod entity;
mod error;
mod profile;
mod revocation;
mod sign;
mod store;
mod time;
mod validate;

pub use cmh::{
    CmhEntry, CmhIdentifier, CmhStore, CredentialKind, RotatingSlot, J_MAX_IDENTIFICATION,
    J_MAX_PSEUDONYM,
};
pub use decode::{Decode, DecodeError, Decoded};
pub use encode::{Encode, EncodeError, Encoder};
pub use entity::{EntityConfig, SecurityEntity, VerifyOutcome};
pub use error::Error;
pub use profile::{ProfileRegistry, RxProfile, SecurityProfile, TxProfile};
pub use revocation::{derive_linkage_values, RevocationIndex};
pub use sign::{SignRequest, SignerIdentifierPreference};
pub use store::{CaEntry, CaRole, CertificateStore, PeerEntry};
pub use time::{
    i_period_of, i_period_of_micros, now_time32, now_time64, time32_from_unix, time32_to_micros,
    time64_from_unix_micros, unix_from_time32, I_PERIOD_SECONDS,
};
pub use validate::{RejectReason, Verdict};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//**************************************************************************
//                             Time Structures
//**************************************************************************

/// The number of (TAI) seconds since 00:00:00 UTC, 1 January, 2004
pub type Time32 = u32;

/// Estimate of the number of (TAI) microseconds since 00:00:00 UTC, 1 January, 2004
pub type Time64 = u64;

/// identifies a week in the rotation schedule of pseudonym and
/// identification credentials and of linkage-value revocation information
pub type IValue = u16;

/// represents the CRL series relevant to a particular Certificate
/// Revocation Authorization CA (CRACA) on which a certificate might appear
pub type CrlSeries = u16;

/// integer representation of a country or area identifier as defined by the
/// United Nations Statistics Division
pub type UnCountryId = u16;

/// WGS 84 latitude expressed in 1/10 micro degree
pub type Latitude = i32;

/// WGS 84 longitude expressed in 1/10 micro degree
pub type Longitude = i32;

/// Elevation in units of 0.1 m above the WGS 84 reference ellipsoid,
/// with an offset encoding for negative values
pub type Elevation = u16;

//**************************************************************************
//                               Atomic Types
//**************************************************************************

/// Provider Service Identifier: the application area with which the sender
/// is claiming the payload is to be associated
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Psid(pub u64);

/// Contains the low-order three bytes of a SHA-256 hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HashedId3(pub [u8; 3]);

/// Contains the low-order eight bytes of a SHA-256 hash.
///
/// This is the identifier form used to refer to certificates in signed
/// SPDUs and in issuer references; see 5.3.9.2 for the calculation of the
/// whole-certificate hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HashedId8(pub [u8; 8]);

/// Contains the low-order ten bytes of a SHA-256 hash.
///
/// This is the identifier form used on hash-based certificate revocation
/// lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HashedId10(pub [u8; 10]);

/// identifies a linkage authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LaId(pub [u8; 2]);

/// a seed input to the per-period linkage value derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LinkageSeed(pub [u8; 16]);

/// the per-period, per-slot revocation token of a pseudonym certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LinkageValue(pub [u8; 9]);

//**************************************************************************
//                          Geographic Structures
//**************************************************************************

/// A two-dimensional location used to define validity regions
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoDLocation {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

/// The location at which a signature was generated
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThreeDLocation {
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub elevation: Elevation,
}

impl ThreeDLocation {
    /// Projects the location onto the two-dimensional plane used for
    /// distance and region checks.
    #[must_use]
    pub fn horizontal(&self) -> TwoDLocation {
        TwoDLocation {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A circular validity region: all points within `radius` meters of
/// `center` by great-circle distance
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CircularRegion {
    pub center: TwoDLocation,
    /// radius in meters
    pub radius: u16,
}

/// A region identified by reference rather than geometry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IdentifiedRegion {
    CountryOnly(UnCountryId),
}

/// indicates the validity region of a certificate.
///
/// If omitted from a certificate the validity region is inherited: a
/// self-signed certificate is valid worldwide, any other certificate has
/// the same validity region as its issuer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeographicRegion {
    Circular(CircularRegion),
    Identified(Vec<IdentifiedRegion>),
}

/// The unit and count of a validity period duration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Duration {
    Microseconds(u16),
    Milliseconds(u16),
    Seconds(u16),
    Minutes(u16),
    Hours(u16),
    SixtyHours(u16),
    Years(u16),
}

/// gives the validity period of a certificate.
///
/// The start of the validity period is given by start and the end is given
/// by start + duration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidityPeriod {
    pub start: Time32,
    pub duration: Duration,
}

//**************************************************************************
//                       Key and Signature Structures
//**************************************************************************

/// A point on a 256-bit curve in one of the encodings permitted for
/// transport.
///
/// An x-only point carries no recoverable y coordinate and can therefore
/// not be used as a verification key; it appears as the r component of a
/// signature.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum EccP256CurvePoint {
    XOnly([u8; 32]),
    CompressedY0([u8; 32]),
    CompressedY1([u8; 32]),
    Uncompressed { x: [u8; 32], y: [u8; 32] },
}

impl EccP256CurvePoint {
    /// the x coordinate, regardless of encoding
    #[must_use]
    pub fn x(&self) -> &[u8; 32] {
        match self {
            EccP256CurvePoint::XOnly(x)
            | EccP256CurvePoint::CompressedY0(x)
            | EccP256CurvePoint::CompressedY1(x)
            | EccP256CurvePoint::Uncompressed { x, .. } => x,
        }
    }
}

/// The public key material used to verify signatures generated by the
/// holder of a certificate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum PublicVerificationKey {
    EcdsaNistP256(EccP256CurvePoint),
    EcdsaBrainpoolP256r1(EccP256CurvePoint),
}

/// The contents of this field depend on whether the certificate is an
/// implicit or an explicit certificate.
///
/// A verification key is included in explicit certificates; a
/// reconstruction value is included in implicit certificates and is used to
/// recover the public key as specified in SEC 4 and 5.3.2.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum VerificationKeyIndicator {
    VerificationKey(PublicVerificationKey),
    ReconstructionValue(EccP256CurvePoint),
}

/// The symmetric algorithm a certificate holder supports for encrypted
/// responses
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SymmAlgorithm {
    Aes128Ccm,
}

/// specifies the bytes of a public encryption key for a particular
/// algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BasePublicEncryptionKey {
    EciesNistP256(EccP256CurvePoint),
}

/// A public encryption key together with the symmetric algorithm to use
/// with keys wrapped to it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PublicEncryptionKey {
    pub supported_symm_alg: SymmAlgorithm,
    pub public_key: BasePublicEncryptionKey,
}

/// An ECDSA signature with the r component transported as a curve point
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EcdsaP256Signature {
    pub r_sig: EccP256CurvePoint,
    pub s_sig: [u8; 32],
}

/// A signature over a 256-bit curve.
///
/// Only `ecdsaNistP256` signatures can be verified by this crate; the
/// brainpool alternative is decoded for completeness of the wire format.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Signature {
    EcdsaNistP256Signature(EcdsaP256Signature),
    EcdsaBrainpoolP256r1Signature(EcdsaP256Signature),
}

/// identifies the hash algorithm used for the whole-certificate hash and
/// the signature input
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum HashAlgorithm {
    Sha256,
}

//**************************************************************************
//                         Certificate Structures
//**************************************************************************

/// states whether a certificate is implicit or explicit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CertificateType {
    Explicit,
    Implicit,
}

/// The group linkage value of a certificate belonging to a group of
/// certificates revocable as a unit.
///
/// Stored when present; group revocation is not evaluated by this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GroupLinkageValue {
    pub j_value: [u8; 4],
    pub value: [u8; 9],
}

/// Information that is matched against a linkage ID-based CRL to determine
/// whether the containing certificate has been revoked.
///
/// See 5.1.3.4 and 7.3 for details of use.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LinkageData {
    pub i_cert: IValue,
    pub linkage_value: LinkageValue,
    pub group_linkage_value: Option<GroupLinkageValue>,
}

/// contains information that is used to identify the certificate holder if
/// necessary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CertificateId {
    /// identifies the certificate for revocation purposes on linked
    /// certificate CRLs
    LinkageData(LinkageData),
    /// a human-readable holder identifier; contents are a matter of policy
    Name(String),
    /// an identifier that is not human-readable
    BinaryId(Vec<u8>),
    /// the certificate does not include an identifier
    None,
}

/// allows the recipient of a certificate to determine which keying
/// material to use to authenticate the certificate.
///
/// A digest refers to the issuing certificate by its `HashedId8`; `RsSelf`
/// indicates a self-signed certificate verified with the public key
/// indicated by its own `verify_key_indicator`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum IssuerIdentifier {
    Sha256AndDigest(HashedId8),
    RsSelf(HashAlgorithm),
}

/// Service specific permissions associated with one PSID entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ServiceSpecificPermissions {
    Opaque(Vec<u8>),
    BitmapSsp(Vec<u8>),
}

/// The permissions that the certificate holder has to sign application
/// data for one application area
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PsidSsp {
    pub psid: Psid,
    pub ssp: Option<ServiceSpecificPermissions>,
}

/// The certificate contents: input to the hash when generating or
/// verifying signatures for an explicit certificate, or generating or
/// verifying the public key from the reconstruction value for an implicit
/// certificate.
///
/// Certificate-issuance and certificate-request permission fields of the
/// wire format are not modeled; certificates carrying them are rejected at
/// decode time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ToBeSignedCertificate {
    pub id: CertificateId,
    /// identifies the Certificate Revocation Authorization CA (CRACA)
    /// responsible for CRLs on which this certificate might appear
    pub craca_id: HashedId3,
    pub crl_series: CrlSeries,
    pub validity_period: ValidityPeriod,
    /// if omitted, the validity region is inherited from the issuer
    pub region: Option<GeographicRegion>,
    pub assurance_level: Option<u8>,
    /// the application areas the holder may sign for.
    /// A valid instance contains any particular `Psid` in at most one entry.
    pub app_permissions: Option<Vec<PsidSsp>>,
    /// a public key for encryption for which the certificate holder holds
    /// the corresponding private key
    pub encryption_key: Option<PublicEncryptionKey>,
    pub verify_key_indicator: VerificationKeyIndicator,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) raw: Bytes,
}

impl ToBeSignedCertificate {
    /// the encoding over which the certificate signature (or the implicit
    /// key reconstruction) is computed; empty until decoded or finalized
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// An IEEE 1609.2 certificate.
///
/// The hash of the encoding of the whole certificate is known as the
/// whole-certificate hash; its truncations ([`HashedId8`], [`HashedId10`])
/// are the identifiers under which the certificate is referenced and
/// revoked. The encoding consumed at decode time is retained in `raw` for
/// this purpose.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Certificate {
    /// set to 3 in this version of the data structures
    pub version: u8,
    pub r_type: CertificateType,
    pub issuer: IssuerIdentifier,
    pub to_be_signed: ToBeSignedCertificate,
    /// present in explicit certificates: the signature, calculated by the
    /// signer identified in the issuer field, over the hash of
    /// `to_be_signed`
    pub signature: Option<Signature>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) raw: Bytes,
}

impl Certificate {
    /// the encoding of the certificate as consumed by the decoder, or as
    /// produced by [`Encode`] for a locally constructed certificate
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Re-derives the retained encodings from the current field values.
    ///
    /// Required after constructing a certificate programmatically, before
    /// it is hashed, signed or inserted into a store.
    pub fn finalize(&mut self) -> Result<(), EncodeError> {
        self.to_be_signed.raw = Bytes::from(self.to_be_signed.encode_to_vec()?);
        self.raw = Bytes::from(self.encode_to_vec()?);
        Ok(())
    }
}

//**************************************************************************
//                               Secured Data
//**************************************************************************

/// contains information that is used to establish validity by the criteria
/// of 5.2.
///
/// Peer-to-peer certificate distribution requests, missing-CRL identifiers
/// and response encryption keys of the wire format are not modeled;
/// messages carrying them are rejected at decode time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HeaderInfo {
    /// indicates the application area with which the sender is claiming
    /// the payload is to be associated
    pub psid: Psid,
    /// the time at which the structure was generated
    pub generation_time: Option<Time64>,
    /// if present, the time after which the data is no longer considered
    /// relevant. If both are present, the signed SPDU is invalid if
    /// generation_time is later than expiry_time.
    pub expiry_time: Option<Time64>,
    /// if present, the location at which the signature was generated
    pub generation_location: Option<ThreeDLocation>,
}

/// the hash of data external to the SPDU
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum HashedData {
    Sha256HashedData([u8; 32]),
}

/// contains data that is provided by the entity that invokes the security
/// services
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SignedDataPayload {
    pub data: Option<Box<Ieee1609Dot2Data>>,
    pub ext_data_hash: Option<HashedData>,
}

/// contains the data to be hashed when generating or verifying a
/// signature.
///
/// The data input to the hash operation is the COER encoding of this
/// structure; the encoding consumed at decode time is retained in `raw` so
/// that verification operates on exactly the transmitted bytes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ToBeSignedData {
    pub payload: SignedDataPayload,
    pub header_info: HeaderInfo,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) raw: Bytes,
}

impl ToBeSignedData {
    /// the encoding over which the signature is computed
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// allows the recipient to determine which keying material to use to
/// authenticate a signed SPDU
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SignerIdentifier {
    /// the `HashedId8` of a certificate the recipient is expected to have
    /// learned previously
    Digest(HashedId8),
    /// the complete certificate (chain); the first entry is the signing
    /// certificate
    Certificate(Vec<Certificate>),
    /// the SPDU is self-signed; not accepted by the verification pipeline
    RsSelf,
}

/// data signed according to this standard
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SignedData {
    pub hash_id: HashAlgorithm,
    pub tbs_data: ToBeSignedData,
    pub signer: SignerIdentifier,
    pub signature: Signature,
}

/// the content variants of an SPDU consumed by this crate.
///
/// Encrypted data and signed certificate requests are recognized on the
/// wire but rejected as unsupported.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Ieee1609Dot2Content {
    /// an OCTET STRING to be consumed outside the security services
    UnsecuredData(Bytes),
    /// content signed according to this standard
    SignedData(Box<SignedData>),
}

/// This data type is used to contain the other data types in this clause
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Ieee1609Dot2Data {
    /// the version of the protocol; 3 in this standard
    pub protocol_version: u8,
    pub content: Ieee1609Dot2Content,
}

impl Ieee1609Dot2Data {
    /// retrieves the unencrypted payload, if present
    #[must_use]
    pub fn data_payload(&self) -> Option<&[u8]> {
        match &self.content {
            Ieee1609Dot2Content::UnsecuredData(p) => Some(p),
            Ieee1609Dot2Content::SignedData(s) => s
                .tbs_data
                .payload
                .data
                .as_deref()
                .and_then(Ieee1609Dot2Data::data_payload),
        }
    }

    /// the PSID claimed in the header of a signed SPDU
    #[must_use]
    pub fn psid(&self) -> Option<Psid> {
        match &self.content {
            Ieee1609Dot2Content::SignedData(s) => Some(s.tbs_data.header_info.psid),
            Ieee1609Dot2Content::UnsecuredData(_) => None,
        }
    }
}

//**************************************************************************
//                                CRL Contents
//**************************************************************************

/// A single entry of a hash-based CRL: the revoked certificate identified
/// by digest, and the time until which the revocation is relevant
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HashBasedRevocationInfo {
    pub id: HashedId10,
    pub expiry: Time32,
}

/// One linkage-based revocation group: the seed pair published by the two
/// linkage authorities at period `i_rev`, covering `j_max` certificate
/// slots per period up to and including period `i_max`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LinkageGroup {
    pub i_rev: IValue,
    pub i_max: IValue,
    pub j_max: u8,
    pub la1_id: LaId,
    pub la2_id: LaId,
    pub linkage_seed1: LinkageSeed,
    pub linkage_seed2: LinkageSeed,
}

/// The revocation entries of a CRL.
///
/// Full and delta CRLs of the same kind carry the same entry shape and are
/// applied identically at this layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CrlEntries {
    HashBased(Vec<HashBasedRevocationInfo>),
    LinkageBased(Vec<LinkageGroup>),
}

/// The decoded contents of a CRL, as handed over by the upstream codec
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CrlContents {
    pub version: u8,
    pub craca_id: HashedId3,
    pub crl_series: CrlSeries,
    /// the time at which the CRL was issued
    pub issue_date: Time32,
    /// the time by which the next CRL of this series is expected
    pub next_crl: Time32,
    pub entries: CrlEntries,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_of_nested_signed_data() {
        let inner = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::UnsecuredData(Bytes::from_static(&[1, 2, 3])),
        };
        let outer = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::SignedData(Box::new(SignedData {
                hash_id: HashAlgorithm::Sha256,
                tbs_data: ToBeSignedData {
                    payload: SignedDataPayload {
                        data: Some(Box::new(inner)),
                        ext_data_hash: None,
                    },
                    header_info: HeaderInfo {
                        psid: Psid(32),
                        generation_time: None,
                        expiry_time: None,
                        generation_location: None,
                    },
                    raw: Bytes::new(),
                },
                signer: SignerIdentifier::RsSelf,
                signature: Signature::EcdsaNistP256Signature(EcdsaP256Signature {
                    r_sig: EccP256CurvePoint::XOnly([0; 32]),
                    s_sig: [0; 32],
                }),
            })),
        };
        assert_eq!(outer.data_payload(), Some(&[1u8, 2, 3][..]));
        assert_eq!(outer.psid(), Some(Psid(32)));
    }

    #[test]
    fn payload_of_unsecured_data() {
        let data = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::UnsecuredData(Bytes::from_static(&[9, 9])),
        };
        assert_eq!(data.data_payload(), Some(&[9u8, 9][..]));
        assert_eq!(data.psid(), None);
    }
}
