//! Construction of outgoing SPDUs: header assembly per the transmit
//! profile, signing with a selected local credential, and the signed or
//! unsecured message encoding.

use bytes::Bytes;

use crate::{
    crypto, CmhEntry, CredentialKind, Encode, Error, HashAlgorithm, HeaderInfo,
    Ieee1609Dot2Content, Ieee1609Dot2Data, Psid, SecurityProfile, SignedData, SignedDataPayload,
    SignerIdentifier, ThreeDLocation, Time64, ToBeSignedData,
};

/// How the caller wants the signer identified in the outgoing message.
///
/// The certificate preference is constrained by the profile's minimum
/// inter-certificate-transmission interval: within the interval a digest
/// is sent instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerIdentifierPreference {
    Certificate,
    Digest,
}

/// Parameters of one construction call.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub psid: Psid,
    pub payload: Vec<u8>,
    /// the credential class to sign with
    pub kind: CredentialKind,
    /// the signing instant; becomes the generation time when the profile
    /// emits one
    pub at: Time64,
    pub location: Option<ThreeDLocation>,
    pub signer: SignerIdentifierPreference,
    /// produce an unsecured message; no credential or profile policy is
    /// involved beyond the profile lookup
    pub unsecured: bool,
}

impl SignRequest {
    #[must_use]
    pub fn new(psid: Psid, payload: Vec<u8>, kind: CredentialKind, at: Time64) -> Self {
        Self {
            psid,
            payload,
            kind,
            at,
            location: None,
            signer: SignerIdentifierPreference::Certificate,
            unsecured: false,
        }
    }
}

/// Encapsulates raw payload in an unsecured message.
pub(crate) fn build_unsecured(payload: &[u8]) -> Result<Vec<u8>, Error> {
    let message = Ieee1609Dot2Data {
        protocol_version: 3,
        content: Ieee1609Dot2Content::UnsecuredData(Bytes::copy_from_slice(payload)),
    };
    Ok(message.encode_to_vec()?)
}

/// Builds, signs and encodes a secured message with the selected
/// credential. Updates the credential's certificate-transmission state
/// when the full certificate is embedded.
pub(crate) fn construct_signed(
    request: &SignRequest,
    profile: &SecurityProfile,
    entry: &mut CmhEntry,
) -> Result<Vec<u8>, Error> {
    let header_info = HeaderInfo {
        psid: request.psid,
        generation_time: profile.tx.include_generation_time.then_some(request.at),
        expiry_time: profile
            .tx
            .include_expiry_time
            .then(|| request.at.saturating_add(profile.tx.message_lifetime)),
        generation_location: profile
            .tx
            .include_generation_location
            .then_some(request.location)
            .flatten(),
    };

    let inner = Ieee1609Dot2Data {
        protocol_version: 3,
        content: Ieee1609Dot2Content::UnsecuredData(Bytes::copy_from_slice(&request.payload)),
    };
    let mut tbs_data = ToBeSignedData {
        payload: SignedDataPayload {
            data: Some(Box::new(inner)),
            ext_data_hash: None,
        },
        header_info,
        raw: Bytes::new(),
    };
    tbs_data.raw = Bytes::from(tbs_data.encode_to_vec()?);

    let signer = match request.signer {
        SignerIdentifierPreference::Digest => SignerIdentifier::Digest(entry.digest8),
        SignerIdentifierPreference::Certificate => {
            let due = entry
                .last_cert_tx
                .map_or(true, |last| request.at.saturating_sub(last) >= profile.tx.cert_interval);
            if due {
                entry.last_cert_tx = Some(request.at);
                SignerIdentifier::Certificate(vec![entry.cert.clone()])
            } else {
                SignerIdentifier::Digest(entry.digest8)
            }
        }
    };

    // the signature is bound to the signer certificate even when only the
    // digest travels in the message
    let signature = crypto::sign_data(&entry.private_key, tbs_data.raw(), Some(entry.cert.raw()));

    let message = Ieee1609Dot2Data {
        protocol_version: 3,
        content: Ieee1609Dot2Content::SignedData(Box::new(SignedData {
            hash_id: HashAlgorithm::Sha256,
            tbs_data,
            signer,
            signature,
        })),
    };
    Ok(message.encode_to_vec()?)
}
