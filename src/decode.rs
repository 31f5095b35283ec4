//! COER decoding of the structures the engine consumes.
//!
//! The encoding is octet-aligned: sequences with optional fields carry a
//! one-byte presence preamble, choices carry a context tag byte, and
//! variable-size contents carry a length determinant. Extension fields of
//! extensible sequences are length-prefixed open types and are skipped;
//! extension *alternatives* of choices the engine cannot represent are
//! rejected as unsupported. Truncated input is always a hard failure.

use bytes::Bytes;
use core::fmt::Debug;
use nom::{
    bytes::complete::take,
    error::{ErrorKind, ParseError},
    number::complete::{be_i32, be_u16, be_u32, be_u64},
    IResult,
};
use thiserror::Error;

use crate::{
    BasePublicEncryptionKey, Certificate, CertificateId, CertificateType, CircularRegion,
    Duration, EccP256CurvePoint, EcdsaP256Signature, GeographicRegion, GroupLinkageValue,
    HashAlgorithm, HashedData, HashedId3, HashedId8, HeaderInfo, IdentifiedRegion,
    Ieee1609Dot2Content, Ieee1609Dot2Data, IssuerIdentifier, LinkageData, LinkageValue,
    PsidSsp, Psid, PublicEncryptionKey, PublicVerificationKey, ServiceSpecificPermissions,
    Signature, SignedData, SignedDataPayload, SignerIdentifier, SymmAlgorithm, ThreeDLocation,
    ToBeSignedCertificate, ToBeSignedData, TwoDLocation, ValidityPeriod, VerificationKeyIndicator,
};

type In<'a> = &'a [u8];
type DResult<'a, T> = IResult<In<'a>, T, DecodeError>;

/// Returns the value of a decoding attempt
#[derive(Debug, PartialEq)]
pub struct Decoded<T: Debug + PartialEq> {
    /// indicates the number of bytes that were consumed by the decoder
    pub bytes_consumed: usize,
    /// the decoded return value
    pub decoded: T,
}

/// Decoder trait for the top-level structures consumed by the engine:
/// [`Certificate`], [`Ieee1609Dot2Data`] and [`ToBeSignedData`].
/// Takes binary data as input and reports the number of bytes consumed,
/// so that a structure embedded in a larger buffer can be carved out.
pub trait Decode: Sized + Debug + PartialEq {
    fn decode(input: &[u8]) -> Result<Decoded<Self>, DecodeError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// the input ended before the structure did
    #[error("unexpected end of input")]
    TooShort,
    #[error("invalid integer: {0}")]
    IntegerError(String),
    #[error("invalid enumerated value: {0}")]
    EnumError(String),
    #[error("invalid character data: {0}")]
    StringError(String),
    #[error("parser error: {0}")]
    ParserError(String),
    /// the encoding is well-formed but uses a wire feature this engine
    /// does not implement
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl<I> ParseError<I> for DecodeError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof | ErrorKind::Complete => DecodeError::TooShort,
            other => DecodeError::ParserError(format!("{other:?}")),
        }
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<DecodeError>> for DecodeError {
    fn from(value: nom::Err<DecodeError>) -> Self {
        match value {
            nom::Err::Incomplete(_) => DecodeError::TooShort,
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
        }
    }
}

fn fail<T>(error: DecodeError) -> Result<T, nom::Err<DecodeError>> {
    Err(nom::Err::Error(error))
}

macro_rules! decode {
    ($typ:ty, $parser:path) => {
        impl Decode for $typ {
            fn decode(input: &[u8]) -> Result<Decoded<Self>, DecodeError> {
                let (remaining, decoded) = $parser(input).map_err(DecodeError::from)?;
                Ok(Decoded {
                    bytes_consumed: input.len() - remaining.len(),
                    decoded,
                })
            }
        }
    };
}

decode!(Certificate, certificate);
decode!(Ieee1609Dot2Data, ieee1609dot2_data);
decode!(ToBeSignedData, to_be_signed_data);

//**************************************************************************
//                          Encoding Primitives
//**************************************************************************

fn byte(i: In) -> DResult<u8> {
    let (i, taken) = take(1usize)(i)?;
    Ok((i, taken[0]))
}

fn array<const N: usize>(i: In) -> DResult<[u8; N]> {
    let (i, taken) = take(N)(i)?;
    Ok((i, taken.try_into().expect("slice of fixed length")))
}

/// A length determinant: short form below 128, long form above.
fn length_determinant(i: In) -> DResult<usize> {
    let (i, first) = byte(i)?;
    if first < 0x80 {
        return Ok((i, usize::from(first)));
    }
    let count = usize::from(first & 0x7f);
    if count == 0 || count > 8 {
        return fail(DecodeError::IntegerError(format!(
            "length of length {count} out of range"
        )));
    }
    let (i, bytes) = take(count)(i)?;
    let value = bytes.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
    usize::try_from(value)
        .map(|len| (i, len))
        .or_else(|_| fail(DecodeError::IntegerError("length overflows usize".into())))
}

/// A length-prefixed octet string.
fn var_octets(i: In) -> DResult<In> {
    let (i, len) = length_determinant(i)?;
    take(len)(i)
}

/// An unconstrained non-negative integer: length determinant plus
/// minimal big-endian content octets.
fn coer_uint(i: In) -> DResult<u64> {
    let (i, bytes) = var_octets(i)?;
    if bytes.is_empty() || bytes.len() > 8 {
        return fail(DecodeError::IntegerError(format!(
            "integer of {} bytes out of range",
            bytes.len()
        )));
    }
    Ok((i, bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))))
}

/// The element count of a SEQUENCE OF.
fn quantity(i: In) -> DResult<usize> {
    let (i, count) = coer_uint(i)?;
    usize::try_from(count)
        .map(|count| (i, count))
        .or_else(|_| fail(DecodeError::IntegerError("count overflows usize".into())))
}

/// A context tag introducing a choice alternative.
fn choice_tag(i: In) -> DResult<u8> {
    let (i, tag) = byte(i)?;
    if tag & 0xC0 != 0x80 {
        return fail(DecodeError::ParserError(format!(
            "expected context tag, found {tag:#04x}"
        )));
    }
    let index = tag & 0x3f;
    if index == 0x3f {
        return fail(DecodeError::Unsupported("long-form choice tag".into()));
    }
    Ok((i, index))
}

/// A length-prefixed open type, returned as its content octets.
fn open_type(i: In) -> DResult<In> {
    var_octets(i)
}

/// Skips the extension part of an extensible sequence: the presence
/// bitmap followed by one open type per present extension. Open types are
/// length-prefixed, which is what makes unknown extensions skippable.
fn skip_extensions(i: In) -> DResult<()> {
    let (i, bitmap) = var_octets(i)?;
    let [unused, bits @ ..] = bitmap else {
        return fail(DecodeError::ParserError("empty extension bitmap".into()));
    };
    if usize::from(*unused) > 7 || (bits.is_empty() && *unused != 0) {
        return fail(DecodeError::ParserError("malformed extension bitmap".into()));
    }
    let total_bits = bits.len() * 8 - usize::from(*unused);
    let present = (0..total_bits)
        .filter(|bit| bits[bit / 8] & (0x80 >> (bit % 8)) != 0)
        .count();
    let mut i = i;
    for _ in 0..present {
        let (rest, _) = open_type(i)?;
        i = rest;
    }
    Ok((i, ()))
}

//**************************************************************************
//                       Key and Signature Structures
//**************************************************************************

fn ecc_p256_curve_point(i: In) -> DResult<EccP256CurvePoint> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, x) = array::<32>(i)?;
            Ok((i, EccP256CurvePoint::XOnly(x)))
        }
        // fill: reserved for future use, carries no point
        1 => fail(DecodeError::Unsupported("fill curve point".into())),
        2 => {
            let (i, x) = array::<32>(i)?;
            Ok((i, EccP256CurvePoint::CompressedY0(x)))
        }
        3 => {
            let (i, x) = array::<32>(i)?;
            Ok((i, EccP256CurvePoint::CompressedY1(x)))
        }
        4 => {
            let (i, x) = array::<32>(i)?;
            let (i, y) = array::<32>(i)?;
            Ok((i, EccP256CurvePoint::Uncompressed { x, y }))
        }
        other => fail(DecodeError::EnumError(format!(
            "curve point alternative {other}"
        ))),
    }
}

fn public_verification_key(i: In) -> DResult<PublicVerificationKey> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, point) = ecc_p256_curve_point(i)?;
            Ok((i, PublicVerificationKey::EcdsaNistP256(point)))
        }
        1 => {
            let (i, point) = ecc_p256_curve_point(i)?;
            Ok((i, PublicVerificationKey::EcdsaBrainpoolP256r1(point)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "verification key alternative {other}"
        ))),
    }
}

fn verification_key_indicator(i: In) -> DResult<VerificationKeyIndicator> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, key) = public_verification_key(i)?;
            Ok((i, VerificationKeyIndicator::VerificationKey(key)))
        }
        1 => {
            let (i, point) = ecc_p256_curve_point(i)?;
            Ok((i, VerificationKeyIndicator::ReconstructionValue(point)))
        }
        other => fail(DecodeError::EnumError(format!(
            "verification key indicator alternative {other}"
        ))),
    }
}

fn symm_algorithm(i: In) -> DResult<SymmAlgorithm> {
    let (i, value) = byte(i)?;
    match value {
        0 => Ok((i, SymmAlgorithm::Aes128Ccm)),
        other => fail(DecodeError::EnumError(format!(
            "symmetric algorithm {other}"
        ))),
    }
}

fn public_encryption_key(i: In) -> DResult<PublicEncryptionKey> {
    let (i, supported_symm_alg) = symm_algorithm(i)?;
    let (i, tag) = choice_tag(i)?;
    let (i, public_key) = match tag {
        0 => {
            let (i, point) = ecc_p256_curve_point(i)?;
            (i, BasePublicEncryptionKey::EciesNistP256(point))
        }
        other => {
            return fail(DecodeError::Unsupported(format!(
                "encryption key alternative {other}"
            )))
        }
    };
    Ok((
        i,
        PublicEncryptionKey {
            supported_symm_alg,
            public_key,
        },
    ))
}

fn ecdsa_p256_signature(i: In) -> DResult<EcdsaP256Signature> {
    let (i, r_sig) = ecc_p256_curve_point(i)?;
    let (i, s_sig) = array::<32>(i)?;
    Ok((i, EcdsaP256Signature { r_sig, s_sig }))
}

fn signature(i: In) -> DResult<Signature> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, sig) = ecdsa_p256_signature(i)?;
            Ok((i, Signature::EcdsaNistP256Signature(sig)))
        }
        1 => {
            let (i, sig) = ecdsa_p256_signature(i)?;
            Ok((i, Signature::EcdsaBrainpoolP256r1Signature(sig)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "signature alternative {other}"
        ))),
    }
}

fn hash_algorithm(i: In) -> DResult<HashAlgorithm> {
    let (i, value) = byte(i)?;
    match value {
        0 => Ok((i, HashAlgorithm::Sha256)),
        other => fail(DecodeError::Unsupported(format!("hash algorithm {other}"))),
    }
}

//**************************************************************************
//                     Time and Geographic Structures
//**************************************************************************

fn duration(i: In) -> DResult<Duration> {
    let (i, tag) = choice_tag(i)?;
    let (i, count) = be_u16(i)?;
    let duration = match tag {
        0 => Duration::Microseconds(count),
        1 => Duration::Milliseconds(count),
        2 => Duration::Seconds(count),
        3 => Duration::Minutes(count),
        4 => Duration::Hours(count),
        5 => Duration::SixtyHours(count),
        6 => Duration::Years(count),
        other => return fail(DecodeError::EnumError(format!("duration unit {other}"))),
    };
    Ok((i, duration))
}

fn validity_period(i: In) -> DResult<ValidityPeriod> {
    let (i, start) = be_u32(i)?;
    let (i, duration) = duration(i)?;
    Ok((i, ValidityPeriod { start, duration }))
}

fn two_d_location(i: In) -> DResult<TwoDLocation> {
    let (i, latitude) = be_i32(i)?;
    let (i, longitude) = be_i32(i)?;
    Ok((i, TwoDLocation { latitude, longitude }))
}

fn three_d_location(i: In) -> DResult<ThreeDLocation> {
    let (i, latitude) = be_i32(i)?;
    let (i, longitude) = be_i32(i)?;
    let (i, elevation) = be_u16(i)?;
    Ok((
        i,
        ThreeDLocation {
            latitude,
            longitude,
            elevation,
        },
    ))
}

fn circular_region(i: In) -> DResult<CircularRegion> {
    let (i, center) = two_d_location(i)?;
    let (i, radius) = be_u16(i)?;
    Ok((i, CircularRegion { center, radius }))
}

fn identified_region(i: In) -> DResult<IdentifiedRegion> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, country) = be_u16(i)?;
            Ok((i, IdentifiedRegion::CountryOnly(country)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "identified region alternative {other}"
        ))),
    }
}

fn geographic_region(i: In) -> DResult<GeographicRegion> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, region) = circular_region(i)?;
            Ok((i, GeographicRegion::Circular(region)))
        }
        3 => {
            let (i, count) = quantity(i)?;
            let mut regions = Vec::with_capacity(count.min(64));
            let mut i = i;
            for _ in 0..count {
                let (rest, region) = identified_region(i)?;
                regions.push(region);
                i = rest;
            }
            Ok((i, GeographicRegion::Identified(regions)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "geographic region alternative {other}"
        ))),
    }
}

//**************************************************************************
//                         Certificate Structures
//**************************************************************************

fn group_linkage_value(i: In) -> DResult<GroupLinkageValue> {
    let (i, j_value) = array::<4>(i)?;
    let (i, value) = array::<9>(i)?;
    Ok((i, GroupLinkageValue { j_value, value }))
}

fn linkage_data(i: In) -> DResult<LinkageData> {
    let (i, preamble) = byte(i)?;
    let (i, i_cert) = be_u16(i)?;
    let (i, linkage_value) = array::<9>(i)?;
    let (i, group_linkage_value) = if preamble & 0x80 != 0 {
        let (i, glv) = group_linkage_value(i)?;
        (i, Some(glv))
    } else {
        (i, None)
    };
    Ok((
        i,
        LinkageData {
            i_cert,
            linkage_value: LinkageValue(linkage_value),
            group_linkage_value,
        },
    ))
}

fn certificate_id(i: In) -> DResult<CertificateId> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, data) = linkage_data(i)?;
            Ok((i, CertificateId::LinkageData(data)))
        }
        1 => {
            let (i, bytes) = var_octets(i)?;
            let name = core::str::from_utf8(bytes)
                .map_err(|e| nom::Err::Error(DecodeError::StringError(e.to_string())))?;
            Ok((i, CertificateId::Name(name.into())))
        }
        2 => {
            let (i, bytes) = var_octets(i)?;
            Ok((i, CertificateId::BinaryId(bytes.to_vec())))
        }
        3 => Ok((i, CertificateId::None)),
        other => fail(DecodeError::EnumError(format!(
            "certificate id alternative {other}"
        ))),
    }
}

fn psid(i: In) -> DResult<Psid> {
    let (i, value) = coer_uint(i)?;
    Ok((i, Psid(value)))
}

fn service_specific_permissions(i: In) -> DResult<ServiceSpecificPermissions> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, bytes) = var_octets(i)?;
            Ok((i, ServiceSpecificPermissions::Opaque(bytes.to_vec())))
        }
        // bitmapSsp: extension alternative, wrapped in an open type
        1 => {
            let (i, content) = open_type(i)?;
            let (_, bytes) = var_octets(content)?;
            Ok((i, ServiceSpecificPermissions::BitmapSsp(bytes.to_vec())))
        }
        other => fail(DecodeError::Unsupported(format!("ssp alternative {other}"))),
    }
}

fn psid_ssp(i: In) -> DResult<PsidSsp> {
    let (i, preamble) = byte(i)?;
    let (i, psid) = psid(i)?;
    let (i, ssp) = if preamble & 0x80 != 0 {
        let (i, ssp) = service_specific_permissions(i)?;
        (i, Some(ssp))
    } else {
        (i, None)
    };
    Ok((i, PsidSsp { psid, ssp }))
}

fn to_be_signed_certificate(input: In) -> DResult<ToBeSignedCertificate> {
    let i = input;
    let (i, preamble) = byte(i)?;
    // certIssuePermissions, certRequestPermissions, canRequestRollover
    if preamble & 0x0e != 0 {
        return fail(DecodeError::Unsupported(
            "certificate issue/request permissions".into(),
        ));
    }
    let (i, id) = certificate_id(i)?;
    let (i, craca_id) = array::<3>(i)?;
    let (i, crl_series) = be_u16(i)?;
    let (i, validity_period) = validity_period(i)?;
    let (i, region) = if preamble & 0x40 != 0 {
        let (i, region) = geographic_region(i)?;
        (i, Some(region))
    } else {
        (i, None)
    };
    let (i, assurance_level) = if preamble & 0x20 != 0 {
        let (i, level) = byte(i)?;
        (i, Some(level))
    } else {
        (i, None)
    };
    let (i, app_permissions) = if preamble & 0x10 != 0 {
        let (i, count) = quantity(i)?;
        let mut permissions = Vec::with_capacity(count.min(64));
        let mut i = i;
        for _ in 0..count {
            let (rest, entry) = psid_ssp(i)?;
            permissions.push(entry);
            i = rest;
        }
        (i, Some(permissions))
    } else {
        (i, None)
    };
    let (i, encryption_key) = if preamble & 0x01 != 0 {
        let (i, key) = public_encryption_key(i)?;
        (i, Some(key))
    } else {
        (i, None)
    };
    let (i, verify_key_indicator) = verification_key_indicator(i)?;
    let (i, ()) = if preamble & 0x80 != 0 {
        skip_extensions(i)?
    } else {
        (i, ())
    };
    let consumed = input.len() - i.len();
    Ok((
        i,
        ToBeSignedCertificate {
            id,
            craca_id: HashedId3(craca_id),
            crl_series,
            validity_period,
            region,
            assurance_level,
            app_permissions,
            encryption_key,
            verify_key_indicator,
            raw: Bytes::copy_from_slice(&input[..consumed]),
        },
    ))
}

fn issuer_identifier(i: In) -> DResult<IssuerIdentifier> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, digest) = array::<8>(i)?;
            Ok((i, IssuerIdentifier::Sha256AndDigest(HashedId8(digest))))
        }
        1 => {
            let (i, algorithm) = hash_algorithm(i)?;
            Ok((i, IssuerIdentifier::RsSelf(algorithm)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "issuer identifier alternative {other}"
        ))),
    }
}

fn certificate(input: In) -> DResult<Certificate> {
    let (i, preamble) = byte(input)?;
    let (i, version) = byte(i)?;
    let (i, type_value) = byte(i)?;
    let r_type = match type_value {
        0 => CertificateType::Explicit,
        1 => CertificateType::Implicit,
        other => {
            return fail(DecodeError::EnumError(format!("certificate type {other}")));
        }
    };
    let (i, issuer) = issuer_identifier(i)?;
    let (i, to_be_signed) = to_be_signed_certificate(i)?;
    let (i, signature) = if preamble & 0x80 != 0 {
        let (i, sig) = signature(i)?;
        (i, Some(sig))
    } else {
        (i, None)
    };
    let consumed = input.len() - i.len();
    Ok((
        i,
        Certificate {
            version,
            r_type,
            issuer,
            to_be_signed,
            signature,
            raw: Bytes::copy_from_slice(&input[..consumed]),
        },
    ))
}

//**************************************************************************
//                               Secured Data
//**************************************************************************

fn hashed_data(i: In) -> DResult<HashedData> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, digest) = array::<32>(i)?;
            Ok((i, HashedData::Sha256HashedData(digest)))
        }
        other => fail(DecodeError::Unsupported(format!(
            "hashed data alternative {other}"
        ))),
    }
}

fn signed_data_payload(i: In) -> DResult<SignedDataPayload> {
    let (i, preamble) = byte(i)?;
    let (i, data) = if preamble & 0x40 != 0 {
        let (i, data) = ieee1609dot2_data(i)?;
        (i, Some(Box::new(data)))
    } else {
        (i, None)
    };
    let (i, ext_data_hash) = if preamble & 0x20 != 0 {
        let (i, hash) = hashed_data(i)?;
        (i, Some(hash))
    } else {
        (i, None)
    };
    let (i, ()) = if preamble & 0x80 != 0 {
        skip_extensions(i)?
    } else {
        (i, ())
    };
    Ok((i, SignedDataPayload { data, ext_data_hash }))
}

fn header_info(i: In) -> DResult<HeaderInfo> {
    let (i, preamble) = byte(i)?;
    // p2pcdLearningRequest, missingCrlIdentifier, encryptionKey
    if preamble & 0x0e != 0 {
        return fail(DecodeError::Unsupported(
            "p2pcd/crl-request/encryption-key header fields".into(),
        ));
    }
    let (i, psid) = psid(i)?;
    let (i, generation_time) = if preamble & 0x40 != 0 {
        let (i, t) = be_u64(i)?;
        (i, Some(t))
    } else {
        (i, None)
    };
    let (i, expiry_time) = if preamble & 0x20 != 0 {
        let (i, t) = be_u64(i)?;
        (i, Some(t))
    } else {
        (i, None)
    };
    let (i, generation_location) = if preamble & 0x10 != 0 {
        let (i, location) = three_d_location(i)?;
        (i, Some(location))
    } else {
        (i, None)
    };
    let (i, ()) = if preamble & 0x80 != 0 {
        skip_extensions(i)?
    } else {
        (i, ())
    };
    Ok((
        i,
        HeaderInfo {
            psid,
            generation_time,
            expiry_time,
            generation_location,
        },
    ))
}

fn to_be_signed_data(input: In) -> DResult<ToBeSignedData> {
    let (i, payload) = signed_data_payload(input)?;
    let (i, header_info) = header_info(i)?;
    let consumed = input.len() - i.len();
    Ok((
        i,
        ToBeSignedData {
            payload,
            header_info,
            raw: Bytes::copy_from_slice(&input[..consumed]),
        },
    ))
}

fn signer_identifier(i: In) -> DResult<SignerIdentifier> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, digest) = array::<8>(i)?;
            Ok((i, SignerIdentifier::Digest(HashedId8(digest))))
        }
        1 => {
            let (i, count) = quantity(i)?;
            let mut certificates = Vec::with_capacity(count.min(8));
            let mut i = i;
            for _ in 0..count {
                let (rest, cert) = certificate(i)?;
                certificates.push(cert);
                i = rest;
            }
            Ok((i, SignerIdentifier::Certificate(certificates)))
        }
        2 => Ok((i, SignerIdentifier::RsSelf)),
        other => fail(DecodeError::EnumError(format!(
            "signer identifier alternative {other}"
        ))),
    }
}

fn signed_data(i: In) -> DResult<SignedData> {
    let (i, hash_id) = hash_algorithm(i)?;
    let (i, tbs_data) = to_be_signed_data(i)?;
    let (i, signer) = signer_identifier(i)?;
    let (i, signature) = signature(i)?;
    Ok((
        i,
        SignedData {
            hash_id,
            tbs_data,
            signer,
            signature,
        },
    ))
}

fn ieee1609dot2_content(i: In) -> DResult<Ieee1609Dot2Content> {
    let (i, tag) = choice_tag(i)?;
    match tag {
        0 => {
            let (i, bytes) = var_octets(i)?;
            Ok((
                i,
                Ieee1609Dot2Content::UnsecuredData(Bytes::copy_from_slice(bytes)),
            ))
        }
        1 => {
            let (i, signed) = signed_data(i)?;
            Ok((i, Ieee1609Dot2Content::SignedData(Box::new(signed))))
        }
        2 => fail(DecodeError::Unsupported("encrypted data".into())),
        3 | 4 => fail(DecodeError::Unsupported("signed certificate request".into())),
        other => fail(DecodeError::EnumError(format!(
            "content alternative {other}"
        ))),
    }
}

fn ieee1609dot2_data(i: In) -> DResult<Ieee1609Dot2Data> {
    let (i, protocol_version) = byte(i)?;
    let (i, content) = ieee1609dot2_content(i)?;
    Ok((
        i,
        Ieee1609Dot2Data {
            protocol_version,
            content,
        },
    ))
}
