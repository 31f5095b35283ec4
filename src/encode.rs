//! COER encoding of the structures the engine produces: certificates
//! constructed for tests and provisioning, and outgoing secured messages.
//!
//! The encoder is the exact inverse of [`crate::decode`]: presence
//! preambles, context tags and length determinants are emitted in the same
//! positions the decoder expects them. Extension fields are never emitted.

use crate::{
    BasePublicEncryptionKey, Certificate, CertificateId, CertificateType, CircularRegion,
    Duration, EccP256CurvePoint, EcdsaP256Signature, GeographicRegion, GroupLinkageValue,
    HashAlgorithm, HashedData, HeaderInfo, IdentifiedRegion, Ieee1609Dot2Content,
    Ieee1609Dot2Data, IssuerIdentifier, LinkageData, Psid, PsidSsp, PublicEncryptionKey,
    PublicVerificationKey, ServiceSpecificPermissions, Signature, SignedData, SignedDataPayload,
    SignerIdentifier, SymmAlgorithm, ThreeDLocation, ToBeSignedCertificate, ToBeSignedData,
    TwoDLocation, ValidityPeriod, VerificationKeyIndicator,
};

#[cfg(feature = "json")]
use serde::Serialize;

#[derive(Debug)]
pub enum EncodeError {
    Unsupported(String),
    Common(String),
    #[cfg(feature = "json")]
    Json(String),
}

impl EncodeError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Unsupported(message) => message,
            Self::Common(message) => message,
            #[cfg(feature = "json")]
            Self::Json(message) => message,
        }
    }
}

/// Accumulates the octets of an encoding.
#[derive(Debug, Default)]
pub struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn byte(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// A length determinant: short form below 128, long form above.
    fn length_determinant(&mut self, len: usize) {
        if len < 0x80 {
            self.byte(len as u8);
            return;
        }
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        self.byte(0x80 | (bytes.len() - skip) as u8);
        self.extend(&bytes[skip..]);
    }

    /// An unconstrained non-negative integer: length determinant plus
    /// minimal big-endian content octets.
    fn uint(&mut self, value: u64) {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count().min(7);
        self.length_determinant(bytes.len() - skip);
        self.extend(&bytes[skip..]);
    }

    /// A length-prefixed octet string.
    fn var_octets(&mut self, bytes: &[u8]) {
        self.length_determinant(bytes.len());
        self.extend(bytes);
    }
}

impl From<Encoder> for Vec<u8> {
    fn from(val: Encoder) -> Self {
        val.bytes
    }
}

impl From<Encoder> for bytes::Bytes {
    fn from(val: Encoder) -> Self {
        val.bytes.into()
    }
}

pub trait Encode {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError>;

    fn encode_to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder)?;
        Ok(encoder.into())
    }

    #[cfg(feature = "json")]
    fn encode_to_json(&self) -> Result<String, EncodeError>
    where
        Self: Sized + Serialize,
    {
        serde_json::to_string(self).map_err(|e| EncodeError::Json(format!("{e:?}")))
    }
}

impl Encode for EccP256CurvePoint {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            EccP256CurvePoint::XOnly(x) => {
                output.byte(0x80);
                output.extend(x);
            }
            EccP256CurvePoint::CompressedY0(x) => {
                output.byte(0x82);
                output.extend(x);
            }
            EccP256CurvePoint::CompressedY1(x) => {
                output.byte(0x83);
                output.extend(x);
            }
            EccP256CurvePoint::Uncompressed { x, y } => {
                output.byte(0x84);
                output.extend(x);
                output.extend(y);
            }
        }
        Ok(())
    }
}

impl Encode for PublicVerificationKey {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            PublicVerificationKey::EcdsaNistP256(point) => {
                output.byte(0x80);
                point.encode(output)
            }
            PublicVerificationKey::EcdsaBrainpoolP256r1(point) => {
                output.byte(0x81);
                point.encode(output)
            }
        }
    }
}

impl Encode for VerificationKeyIndicator {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            VerificationKeyIndicator::VerificationKey(key) => {
                output.byte(0x80);
                key.encode(output)
            }
            VerificationKeyIndicator::ReconstructionValue(point) => {
                output.byte(0x81);
                point.encode(output)
            }
        }
    }
}

impl Encode for PublicEncryptionKey {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self.supported_symm_alg {
            SymmAlgorithm::Aes128Ccm => output.byte(0),
        }
        match &self.public_key {
            BasePublicEncryptionKey::EciesNistP256(point) => {
                output.byte(0x80);
                point.encode(output)
            }
        }
    }
}

impl Encode for EcdsaP256Signature {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.r_sig.encode(output)?;
        output.extend(&self.s_sig);
        Ok(())
    }
}

impl Encode for Signature {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            Signature::EcdsaNistP256Signature(sig) => {
                output.byte(0x80);
                sig.encode(output)
            }
            Signature::EcdsaBrainpoolP256r1Signature(sig) => {
                output.byte(0x81);
                sig.encode(output)
            }
        }
    }
}

impl Encode for HashAlgorithm {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            HashAlgorithm::Sha256 => output.byte(0),
        }
        Ok(())
    }
}

impl Encode for Duration {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let (tag, count) = match *self {
            Duration::Microseconds(n) => (0x80, n),
            Duration::Milliseconds(n) => (0x81, n),
            Duration::Seconds(n) => (0x82, n),
            Duration::Minutes(n) => (0x83, n),
            Duration::Hours(n) => (0x84, n),
            Duration::SixtyHours(n) => (0x85, n),
            Duration::Years(n) => (0x86, n),
        };
        output.byte(tag);
        output.extend(&count.to_be_bytes());
        Ok(())
    }
}

impl Encode for ValidityPeriod {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.extend(&self.start.to_be_bytes());
        self.duration.encode(output)
    }
}

impl Encode for TwoDLocation {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.extend(&self.latitude.to_be_bytes());
        output.extend(&self.longitude.to_be_bytes());
        Ok(())
    }
}

impl Encode for ThreeDLocation {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.extend(&self.latitude.to_be_bytes());
        output.extend(&self.longitude.to_be_bytes());
        output.extend(&self.elevation.to_be_bytes());
        Ok(())
    }
}

impl Encode for GeographicRegion {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            GeographicRegion::Circular(CircularRegion { center, radius }) => {
                output.byte(0x80);
                center.encode(output)?;
                output.extend(&radius.to_be_bytes());
            }
            GeographicRegion::Identified(regions) => {
                output.byte(0x83);
                output.uint(regions.len() as u64);
                for region in regions {
                    match region {
                        IdentifiedRegion::CountryOnly(country) => {
                            output.byte(0x80);
                            output.extend(&country.to_be_bytes());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Encode for LinkageData {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.byte(if self.group_linkage_value.is_some() {
            0x80
        } else {
            0x00
        });
        output.extend(&self.i_cert.to_be_bytes());
        output.extend(&self.linkage_value.0);
        if let Some(GroupLinkageValue { j_value, value }) = &self.group_linkage_value {
            output.extend(j_value);
            output.extend(value);
        }
        Ok(())
    }
}

impl Encode for CertificateId {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            CertificateId::LinkageData(data) => {
                output.byte(0x80);
                data.encode(output)
            }
            CertificateId::Name(name) => {
                if name.len() > 255 {
                    return Err(EncodeError::Common(format!(
                        "hostname of {} bytes exceeds 255",
                        name.len()
                    )));
                }
                output.byte(0x81);
                output.var_octets(name.as_bytes());
                Ok(())
            }
            CertificateId::BinaryId(id) => {
                if id.is_empty() || id.len() > 64 {
                    return Err(EncodeError::Common(format!(
                        "binary id of {} bytes out of range",
                        id.len()
                    )));
                }
                output.byte(0x82);
                output.var_octets(id);
                Ok(())
            }
            CertificateId::None => {
                output.byte(0x83);
                Ok(())
            }
        }
    }
}

impl Encode for Psid {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.uint(self.0);
        Ok(())
    }
}

impl Encode for ServiceSpecificPermissions {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            ServiceSpecificPermissions::Opaque(bytes) => {
                output.byte(0x80);
                output.var_octets(bytes);
            }
            // extension alternative: wrapped in an open type
            ServiceSpecificPermissions::BitmapSsp(bitmap) => {
                output.byte(0x81);
                let mut inner = Encoder::new();
                inner.var_octets(bitmap);
                let inner: Vec<u8> = inner.into();
                output.var_octets(&inner);
            }
        }
        Ok(())
    }
}

impl Encode for PsidSsp {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.byte(if self.ssp.is_some() { 0x80 } else { 0x00 });
        self.psid.encode(output)?;
        if let Some(ssp) = &self.ssp {
            ssp.encode(output)?;
        }
        Ok(())
    }
}

impl Encode for ToBeSignedCertificate {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let mut preamble = 0u8;
        if self.region.is_some() {
            preamble |= 0x40;
        }
        if self.assurance_level.is_some() {
            preamble |= 0x20;
        }
        if self.app_permissions.is_some() {
            preamble |= 0x10;
        }
        if self.encryption_key.is_some() {
            preamble |= 0x01;
        }
        output.byte(preamble);
        self.id.encode(output)?;
        output.extend(&self.craca_id.0);
        output.extend(&self.crl_series.to_be_bytes());
        self.validity_period.encode(output)?;
        if let Some(region) = &self.region {
            region.encode(output)?;
        }
        if let Some(level) = self.assurance_level {
            output.byte(level);
        }
        if let Some(permissions) = &self.app_permissions {
            output.uint(permissions.len() as u64);
            for entry in permissions {
                entry.encode(output)?;
            }
        }
        if let Some(key) = &self.encryption_key {
            key.encode(output)?;
        }
        self.verify_key_indicator.encode(output)
    }
}

impl Encode for IssuerIdentifier {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            IssuerIdentifier::Sha256AndDigest(digest) => {
                output.byte(0x80);
                output.extend(&digest.0);
                Ok(())
            }
            IssuerIdentifier::RsSelf(algorithm) => {
                output.byte(0x81);
                algorithm.encode(output)
            }
        }
    }
}

impl Encode for Certificate {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.byte(if self.signature.is_some() { 0x80 } else { 0x00 });
        output.byte(self.version);
        output.byte(match self.r_type {
            CertificateType::Explicit => 0,
            CertificateType::Implicit => 1,
        });
        self.issuer.encode(output)?;
        self.to_be_signed.encode(output)?;
        if let Some(signature) = &self.signature {
            signature.encode(output)?;
        }
        Ok(())
    }
}

impl Encode for HashedData {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            HashedData::Sha256HashedData(digest) => {
                output.byte(0x80);
                output.extend(digest);
            }
        }
        Ok(())
    }
}

impl Encode for SignedDataPayload {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let mut preamble = 0u8;
        if self.data.is_some() {
            preamble |= 0x40;
        }
        if self.ext_data_hash.is_some() {
            preamble |= 0x20;
        }
        output.byte(preamble);
        if let Some(data) = &self.data {
            data.encode(output)?;
        }
        if let Some(hash) = &self.ext_data_hash {
            hash.encode(output)?;
        }
        Ok(())
    }
}

impl Encode for HeaderInfo {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let mut preamble = 0u8;
        if self.generation_time.is_some() {
            preamble |= 0x40;
        }
        if self.expiry_time.is_some() {
            preamble |= 0x20;
        }
        if self.generation_location.is_some() {
            preamble |= 0x10;
        }
        output.byte(preamble);
        self.psid.encode(output)?;
        if let Some(time) = self.generation_time {
            output.extend(&time.to_be_bytes());
        }
        if let Some(time) = self.expiry_time {
            output.extend(&time.to_be_bytes());
        }
        if let Some(location) = &self.generation_location {
            location.encode(output)?;
        }
        Ok(())
    }
}

impl Encode for ToBeSignedData {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.payload.encode(output)?;
        self.header_info.encode(output)
    }
}

impl Encode for SignerIdentifier {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            SignerIdentifier::Digest(digest) => {
                output.byte(0x80);
                output.extend(&digest.0);
                Ok(())
            }
            SignerIdentifier::Certificate(certificates) => {
                output.byte(0x81);
                output.uint(certificates.len() as u64);
                for cert in certificates {
                    // keep the exact received or finalized encoding: the
                    // verifier hashes these bytes as the signer input
                    if cert.raw.is_empty() {
                        cert.encode(output)?;
                    } else {
                        output.extend(&cert.raw);
                    }
                }
                Ok(())
            }
            SignerIdentifier::RsSelf => {
                output.byte(0x82);
                Ok(())
            }
        }
    }
}

impl Encode for SignedData {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.hash_id.encode(output)?;
        self.tbs_data.encode(output)?;
        self.signer.encode(output)?;
        self.signature.encode(output)
    }
}

impl Encode for Ieee1609Dot2Content {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            Ieee1609Dot2Content::UnsecuredData(bytes) => {
                output.byte(0x80);
                output.var_octets(bytes);
                Ok(())
            }
            Ieee1609Dot2Content::SignedData(signed) => {
                output.byte(0x81);
                signed.encode(output)
            }
        }
    }
}

impl Encode for Ieee1609Dot2Data {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.byte(self.protocol_version);
        self.content.encode(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decode, HashedId3, HashedId8};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_unsecured_data() {
        let data = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::UnsecuredData(Bytes::from_static(&[
                0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
            ])),
        };
        assert_eq!(
            data.encode_to_vec().unwrap(),
            vec![0x03, 0x80, 0x08, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]
        );
    }

    #[test]
    fn unconstrained_integer_forms() {
        let mut encoder = Encoder::new();
        Psid(0).encode(&mut encoder).unwrap();
        Psid(36).encode(&mut encoder).unwrap();
        Psid(0x1234).encode(&mut encoder).unwrap();
        let bytes: Vec<u8> = encoder.into();
        assert_eq!(bytes, vec![0x01, 0x00, 0x01, 0x24, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn length_determinant_long_form() {
        let mut encoder = Encoder::new();
        encoder.var_octets(&[0xaa; 200]);
        let bytes: Vec<u8> = encoder.into();
        assert_eq!(&bytes[..2], &[0x81, 200]);
        assert_eq!(bytes.len(), 202);
    }

    #[test]
    fn certificate_round_trip() {
        let mut cert = Certificate {
            version: 3,
            r_type: CertificateType::Explicit,
            issuer: IssuerIdentifier::Sha256AndDigest(HashedId8([1, 2, 3, 4, 5, 6, 7, 8])),
            to_be_signed: ToBeSignedCertificate {
                id: CertificateId::Name("device.example".into()),
                craca_id: HashedId3([0, 0, 0]),
                crl_series: 4,
                validity_period: ValidityPeriod {
                    start: 600_000_000,
                    duration: Duration::Years(2),
                },
                region: Some(GeographicRegion::Circular(CircularRegion {
                    center: TwoDLocation {
                        latitude: 535_574_568,
                        longitude: 99_765_648,
                    },
                    radius: 10_000,
                })),
                assurance_level: Some(0xc0),
                app_permissions: Some(vec![
                    PsidSsp {
                        psid: Psid(135),
                        ssp: Some(ServiceSpecificPermissions::Opaque(vec![0x01])),
                    },
                    PsidSsp {
                        psid: Psid(36),
                        ssp: Some(ServiceSpecificPermissions::BitmapSsp(vec![1, 255, 252])),
                    },
                ]),
                encryption_key: None,
                verify_key_indicator: VerificationKeyIndicator::VerificationKey(
                    PublicVerificationKey::EcdsaNistP256(EccP256CurvePoint::CompressedY1(
                        [0x42; 32],
                    )),
                ),
                raw: Bytes::new(),
            },
            signature: Some(Signature::EcdsaNistP256Signature(EcdsaP256Signature {
                r_sig: EccP256CurvePoint::XOnly([0x11; 32]),
                s_sig: [0x22; 32],
            })),
            raw: Bytes::new(),
        };
        cert.finalize().unwrap();

        let decoded = Certificate::decode(cert.raw()).unwrap();
        assert_eq!(decoded.bytes_consumed, cert.raw().len());
        assert_eq!(decoded.decoded, cert);
        assert_eq!(decoded.decoded.encode_to_vec().unwrap(), cert.raw());
    }

    #[test]
    fn signed_data_round_trip() {
        let inner = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::UnsecuredData(Bytes::from_static(b"hello its")),
        };
        let tbs = ToBeSignedData {
            payload: SignedDataPayload {
                data: Some(Box::new(inner)),
                ext_data_hash: None,
            },
            header_info: HeaderInfo {
                psid: Psid(135),
                generation_time: Some(500_000_123_456),
                expiry_time: Some(500_060_123_456),
                generation_location: Some(ThreeDLocation {
                    latitude: -100_000,
                    longitude: 200_000,
                    elevation: 30,
                }),
            },
            raw: Bytes::new(),
        };
        let message = Ieee1609Dot2Data {
            protocol_version: 3,
            content: Ieee1609Dot2Content::SignedData(Box::new(SignedData {
                hash_id: HashAlgorithm::Sha256,
                tbs_data: tbs,
                signer: SignerIdentifier::Digest(HashedId8([9; 8])),
                signature: Signature::EcdsaNistP256Signature(EcdsaP256Signature {
                    r_sig: EccP256CurvePoint::XOnly([0x33; 32]),
                    s_sig: [0x44; 32],
                }),
            })),
        };

        let bytes = message.encode_to_vec().unwrap();
        let decoded = Ieee1609Dot2Data::decode(&bytes).unwrap();
        assert_eq!(decoded.bytes_consumed, bytes.len());
        assert_eq!(decoded.decoded.data_payload(), Some(&b"hello its"[..]));

        // the retained to-be-signed slice matches a fresh encoding
        let Ieee1609Dot2Content::SignedData(signed) = &decoded.decoded.content else {
            panic!("expected signed data");
        };
        assert_eq!(
            signed.tbs_data.raw(),
            signed.tbs_data.encode_to_vec().unwrap()
        );
        assert_eq!(decoded.decoded.encode_to_vec().unwrap(), bytes);
    }
}
