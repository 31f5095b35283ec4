//! The cryptographic collaborator boundary.
//!
//! The engine calls out of this module for SHA-256 digests, ECDSA NIST
//! P-256 signing and verification over the standard's two-hash input, key
//! generation, and implicit-certificate (ECQV) key reconstruction. The
//! primitives themselves come from the RustCrypto stack; nothing in here
//! implements curve or hash arithmetic.

use ecdsa::signature::{Signer, Verifier};
use p256::{
    ecdsa::{Signature as NistP256Signature, SigningKey, VerifyingKey},
    elliptic_curve::{
        ops::Reduce,
        point::DecompressPoint,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        subtle::Choice,
        PrimeField,
    },
    AffinePoint, EncodedPoint, ProjectivePoint, Scalar, U256,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::{
    EccP256CurvePoint, EcdsaP256Signature, Error, HashedId10, HashedId3, HashedId8,
    PublicVerificationKey, Signature,
};

/// SHA-256 of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The low-order three bytes of the SHA-256 hash of `data`.
#[must_use]
pub fn hashed_id3(data: &[u8]) -> HashedId3 {
    let digest = sha256(data);
    HashedId3(digest[29..].try_into().expect("slice of fixed length"))
}

/// The low-order eight bytes of the SHA-256 hash of `data`.
#[must_use]
pub fn hashed_id8(data: &[u8]) -> HashedId8 {
    let digest = sha256(data);
    HashedId8(digest[24..].try_into().expect("slice of fixed length"))
}

/// The low-order ten bytes of the SHA-256 hash of `data`.
#[must_use]
pub fn hashed_id10(data: &[u8]) -> HashedId10 {
    let digest = sha256(data);
    HashedId10(digest[22..].try_into().expect("slice of fixed length"))
}

/// Generates a fresh P-256 signing key.
#[must_use]
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// Interprets 32 bytes as a P-256 signing key.
pub fn signing_key_from_bytes(bytes: &[u8; 32]) -> Result<SigningKey, Error> {
    SigningKey::from_bytes(&(*bytes).into()).map_err(|_| Error::InvalidParameter("private key"))
}

/// Recovers an affine point from its transported encoding.
///
/// X-only points carry no recoverable y coordinate and are refused.
pub(crate) fn affine_point(point: &EccP256CurvePoint) -> Result<AffinePoint, Error> {
    match point {
        EccP256CurvePoint::XOnly(_) => {
            Err(Error::Unsupported("x-only point is not a usable public key"))
        }
        EccP256CurvePoint::CompressedY0(x) => {
            Option::from(AffinePoint::decompress(&(*x).into(), Choice::from(0)))
                .ok_or(Error::InvalidParameter("point not on curve"))
        }
        EccP256CurvePoint::CompressedY1(x) => {
            Option::from(AffinePoint::decompress(&(*x).into(), Choice::from(1)))
                .ok_or(Error::InvalidParameter("point not on curve"))
        }
        EccP256CurvePoint::Uncompressed { x, y } => {
            let encoded = EncodedPoint::from_affine_coordinates(&(*x).into(), &(*y).into(), false);
            Option::from(AffinePoint::from_encoded_point(&encoded))
                .ok_or(Error::InvalidParameter("point not on curve"))
        }
    }
}

/// Encodes an affine point in the transport form requested.
pub(crate) fn point_from_affine(affine: &AffinePoint, compress: bool) -> EccP256CurvePoint {
    let encoded = affine.to_encoded_point(compress);
    let bytes = encoded.as_bytes();
    if compress {
        let x: [u8; 32] = bytes[1..33].try_into().expect("slice of fixed length");
        if bytes[0] == 0x02 {
            EccP256CurvePoint::CompressedY0(x)
        } else {
            EccP256CurvePoint::CompressedY1(x)
        }
    } else {
        EccP256CurvePoint::Uncompressed {
            x: bytes[1..33].try_into().expect("slice of fixed length"),
            y: bytes[33..65].try_into().expect("slice of fixed length"),
        }
    }
}

/// The public point of a signing key in transport form.
#[must_use]
pub fn public_point(key: &SigningKey, compress: bool) -> EccP256CurvePoint {
    let verifying = VerifyingKey::from(key);
    point_from_affine(verifying.as_affine(), compress)
}

/// Builds a verifying key from the key material of a certificate.
pub(crate) fn verifying_key(public: &PublicVerificationKey) -> Result<VerifyingKey, Error> {
    match public {
        PublicVerificationKey::EcdsaNistP256(point) => {
            VerifyingKey::from_affine(affine_point(point)?)
                .map_err(|_| Error::InvalidParameter("verification key"))
        }
        PublicVerificationKey::EcdsaBrainpoolP256r1(_) => {
            Err(Error::Unsupported("brainpoolP256r1 verification"))
        }
    }
}

fn wire_signature(signature: &Signature) -> Result<NistP256Signature, Error> {
    let Signature::EcdsaNistP256Signature(sig) = signature else {
        return Err(Error::Unsupported("brainpoolP256r1 signature"));
    };
    NistP256Signature::from_scalars(*sig.r_sig.x(), sig.s_sig)
        .map_err(|_| Error::InvalidParameter("signature scalars"))
}

/// The data input to the hash operation of 5.3.1: the hash of the to-be-
/// signed encoding concatenated with the hash of the signer identifier
/// input (the signer's certificate encoding, or empty for self-signed).
fn signature_input(tbs: &[u8], signer: Option<&[u8]>) -> Vec<u8> {
    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&sha256(tbs));
    input.extend_from_slice(&sha256(signer.unwrap_or(&[])));
    input
}

/// Verifies a signature over `tbs` bound to the signer identified by
/// `signer` (its whole-certificate encoding, or `None` when self-signed).
pub(crate) fn verify_signed(
    key: &VerifyingKey,
    tbs: &[u8],
    signer: Option<&[u8]>,
    signature: &Signature,
) -> Result<(), Error> {
    let sig = wire_signature(signature)?;
    key.verify(&signature_input(tbs, signer), &sig)
        .map_err(|_| Error::SignatureVerificationFailed)
}

/// Signs `tbs` bound to the signer identified by `signer`.
pub(crate) fn sign_data(key: &SigningKey, tbs: &[u8], signer: Option<&[u8]>) -> Signature {
    let sig: NistP256Signature = key.sign(&signature_input(tbs, signer));
    let bytes = sig.to_bytes();
    Signature::EcdsaNistP256Signature(EcdsaP256Signature {
        r_sig: EccP256CurvePoint::XOnly(bytes[..32].try_into().expect("slice of fixed length")),
        s_sig: bytes[32..].try_into().expect("slice of fixed length"),
    })
}

/// A digest of the signature bytes, used to key the replay list.
#[must_use]
pub fn signature_digest(signature: &Signature) -> [u8; 32] {
    let (Signature::EcdsaNistP256Signature(sig)
    | Signature::EcdsaBrainpoolP256r1Signature(sig)) = signature;
    let mut hasher = Sha256::new();
    hasher.update(sig.r_sig.x());
    hasher.update(sig.s_sig);
    hasher.finalize().into()
}

/// The ECQV hash-to-scalar of an implicit certificate: computed over the
/// to-be-signed encoding and the issuer's whole-certificate encoding.
pub(crate) fn reconstruction_scalar(tbs_encoding: &[u8], issuer_raw: &[u8]) -> Scalar {
    let digest = sha256(&signature_input(tbs_encoding, Some(issuer_raw)));
    <Scalar as Reduce<U256>>::reduce_bytes(&digest.into())
}

/// Recovers the public key of an implicit certificate:
/// `Q = e * P + Q_issuer`, with `P` the reconstruction value from the
/// certificate and `e` the certificate's hash-to-scalar.
pub(crate) fn reconstruct_public(
    tbs_encoding: &[u8],
    issuer_raw: &[u8],
    reconstruction_value: &EccP256CurvePoint,
    issuer_key: &VerifyingKey,
) -> Result<VerifyingKey, Error> {
    let e = reconstruction_scalar(tbs_encoding, issuer_raw);
    let p = ProjectivePoint::from(affine_point(reconstruction_value)?);
    let q = p * e + ProjectivePoint::from(*issuer_key.as_affine());
    VerifyingKey::from_affine(q.to_affine()).map_err(|_| Error::KeyReconstructionFailed)
}

/// Whether `private` is the signing half of `public`.
#[must_use]
pub(crate) fn private_matches_public(private: &SigningKey, public: &VerifyingKey) -> bool {
    VerifyingKey::from(private) == *public
}

/// Derives the private key of one slot of a rotating credential set:
/// `d = k(i, j) + r mod n`, with `k` expanded from the shared expansion
/// key and `r` the per-slot private reconstruction value.
pub(crate) fn rotating_slot_key(
    expansion_key: &[u8; 16],
    i_period: u16,
    j: u8,
    reconstruction_private: &[u8; 32],
) -> Result<SigningKey, Error> {
    let mut hasher = Sha256::new();
    hasher.update(expansion_key);
    hasher.update(i_period.to_be_bytes());
    hasher.update([j]);
    let expanded: [u8; 32] = hasher.finalize().into();
    let k = <Scalar as Reduce<U256>>::reduce_bytes(&expanded.into());
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&(*reconstruction_private).into());
    let d = k + r;
    SigningKey::from_bytes(&d.to_repr()).map_err(|_| Error::KeyReconstructionFailed)
}

/// The scalar behind a signing key, for issuance arithmetic.
#[cfg(test)]
pub(crate) fn key_scalar(key: &SigningKey) -> Scalar {
    Option::from(Scalar::from_repr(key.to_bytes())).expect("key bytes are a canonical scalar")
}

/// Builds a signing key from a scalar, for issuance arithmetic.
#[cfg(test)]
pub(crate) fn key_from_scalar(scalar: &Scalar) -> SigningKey {
    SigningKey::from_bytes(&scalar.to_repr()).expect("nonzero scalar")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let key = generate_signing_key();
        let verifying = VerifyingKey::from(&key);
        let tbs = b"to be signed";
        let signer = b"signer certificate";

        let signature = sign_data(&key, tbs, Some(signer));
        assert!(verify_signed(&verifying, tbs, Some(signer), &signature).is_ok());
        // binding to the signer certificate is part of the input
        assert_eq!(
            verify_signed(&verifying, tbs, None, &signature),
            Err(Error::SignatureVerificationFailed)
        );
        assert_eq!(
            verify_signed(&verifying, b"tampered", Some(signer), &signature),
            Err(Error::SignatureVerificationFailed)
        );
    }

    #[test]
    fn point_round_trip() {
        let key = generate_signing_key();
        for compress in [true, false] {
            let point = public_point(&key, compress);
            let affine = affine_point(&point).unwrap();
            assert_eq!(
                VerifyingKey::from_affine(affine).unwrap(),
                VerifyingKey::from(&key)
            );
        }
    }

    #[test]
    fn x_only_point_is_not_a_key() {
        assert!(matches!(
            affine_point(&EccP256CurvePoint::XOnly([1; 32])),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn ecqv_reconstruction_is_consistent() {
        // CA side: recon point P = (k_u + k_ca) * G,
        // device key d = e * (k_u + k_ca) + d_ca, public Q = e * P + Q_ca.
        let ca_key = generate_signing_key();
        let k_u = key_scalar(&generate_signing_key());
        let k_ca = key_scalar(&generate_signing_key());
        let p = ProjectivePoint::GENERATOR * (k_u + k_ca);
        let recon_point = point_from_affine(&p.to_affine(), true);

        let tbs = b"implicit certificate contents";
        let issuer_raw = b"issuer certificate encoding";
        let e = reconstruction_scalar(tbs, issuer_raw);
        let d = e * (k_u + k_ca) + key_scalar(&ca_key);
        let device_key = key_from_scalar(&d);

        let reconstructed =
            reconstruct_public(tbs, issuer_raw, &recon_point, &VerifyingKey::from(&ca_key))
                .unwrap();
        assert!(private_matches_public(&device_key, &reconstructed));
    }

    #[test]
    fn rotating_slot_keys_differ_per_slot() {
        let expansion = [7u8; 16];
        let recon = [9u8; 32];
        let a = rotating_slot_key(&expansion, 100, 0, &recon).unwrap();
        let b = rotating_slot_key(&expansion, 100, 1, &recon).unwrap();
        let c = rotating_slot_key(&expansion, 101, 0, &recon).unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.to_bytes(), c.to_bytes());
        // deterministic
        let again = rotating_slot_key(&expansion, 100, 0, &recon).unwrap();
        assert_eq!(a.to_bytes(), again.to_bytes());
    }
}
