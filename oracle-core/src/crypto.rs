use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::rand::thread_rng;
use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{All, Message, Parity, Scalar, Secp256k1, SecretKey, Signing};
use bitcoin::XOnlyPublicKey;

use crate::error::Error;

/// The tag "BIP0340/challenge"
const SCHNORR_TAG_BYTES: [u8; 64] = [
    123, 181, 45, 122, 159, 239, 88, 50, 62, 177, 191, 122, 64, 125, 179, 130, 210, 243, 242, 216,
    27, 177, 34, 79, 73, 254, 81, 143, 109, 72, 211, 124, 123, 181, 45, 122, 159, 239, 88, 50, 62,
    177, 191, 122, 64, 125, 179, 130, 210, 243, 242, 216, 27, 177, 34, 79, 73, 254, 81, 143, 109,
    72, 211, 124,
];

/// A freshly generated nonce commitment: the secret scalar `k` and the
/// even-y x-only point `R` derived from it.
#[derive(Debug, Clone, Copy)]
pub struct Nonce {
    pub k: SecretKey,
    pub r: XOnlyPublicKey,
}

/// Capability over secp256k1 Schnorr (BIP-340-style) signing.
///
/// Errors from the underlying library are never exposed to callers; they
/// surface uniformly as [`Error::CryptoFailure`].
#[derive(Debug, Clone)]
pub struct Crypto {
    secp: Secp256k1<All>,
}

impl Default for Crypto {
    fn default() -> Self {
        Self::new()
    }
}

impl Crypto {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Generates a uniformly-random non-zero nonce scalar and derives its
    /// even-y x-only point. If the raw point has odd y, the scalar is
    /// negated so the stored `k` stays consistent with future signing.
    pub fn generate_nonce(&self) -> Nonce {
        let raw = SecretKey::new(&mut thread_rng());
        let (r, k) = normalize_parity(&self.secp, raw);
        Nonce { k, r }
    }

    /// Derives the x-only public point for a secret scalar, normalized to
    /// even-y the same way [`Crypto::generate_nonce`] does.
    pub fn derive_point(&self, k: &SecretKey) -> XOnlyPublicKey {
        k.x_only_public_key(&self.secp).0
    }

    /// Produces a 64-byte Schnorr signature over `message` using a
    /// previously committed nonce `k`, then verifies it against `priv_key`'s
    /// public key before returning it.
    pub fn sign(&self, priv_key: &SecretKey, k: SecretKey, message: &[u8]) -> Result<Signature, Error> {
        let msg = Message::from_hashed_data::<sha256::Hash>(message);
        let sig = schnorr_sign_with_nonce(&self.secp, msg.as_ref(), *priv_key, k);

        let pubkey = priv_key.x_only_public_key(&self.secp).0;
        self.secp
            .verify_schnorr(&sig, &msg, &pubkey)
            .map_err(|e| Error::CryptoFailure(e.to_string()))?;

        Ok(sig)
    }
}

fn normalize_parity<S: Signing>(secp: &Secp256k1<S>, key: SecretKey) -> (XOnlyPublicKey, SecretKey) {
    let (xonly, parity) = key.x_only_public_key(secp);

    match parity {
        Parity::Odd => {
            let key = key.negate();
            let (xonly, _) = key.x_only_public_key(secp);
            (xonly, key)
        }
        Parity::Even => (xonly, key),
    }
}

// DO NOT TRUST
// Ported from https://github.com/bitcoin-s/bitcoin-s/blob/ae0962d7eda0a218caaa9ed2b5862d5a1b298be3/crypto/src/main/scala/org/bitcoins/crypto/CryptoRuntime.scala#L304
fn schnorr_sign_with_nonce<S: Signing>(
    secp: &Secp256k1<S>,
    msg: &[u8],
    key: SecretKey,
    nonce_key: SecretKey,
) -> Signature {
    let (rx, k) = normalize_parity(secp, nonce_key);
    let (xonly, x) = normalize_parity(secp, key);

    // concat tag || msg
    let mut m = Vec::with_capacity(64 + 32 + 32 + msg.len());
    m.extend(SCHNORR_TAG_BYTES);
    m.extend(rx.serialize());
    m.extend(xonly.serialize());
    m.extend(msg);
    let e = sha256::Hash::hash(&m);

    let challenge = x
        .mul_tweak(&Scalar::from_be_bytes(e.to_byte_array()).unwrap())
        .unwrap();

    let sig = k.add_tweak(&Scalar::from(challenge)).unwrap();

    let mut sig_bytes = Vec::with_capacity(64);
    sig_bytes.extend(rx.serialize());
    sig_bytes.extend(sig.secret_bytes());
    Signature::from_slice(&sig_bytes).unwrap()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_nonce_r_matches_derive_point() {
        let crypto = Crypto::new();
        let nonce = crypto.generate_nonce();
        assert_eq!(nonce.r, crypto.derive_point(&nonce.k));
    }

    #[test]
    fn sign_verifies_against_own_pubkey() {
        let crypto = Crypto::new();
        let priv_key = SecretKey::new(&mut thread_rng());
        let nonce = crypto.generate_nonce();

        let sig = crypto.sign(&priv_key, nonce.k, b"12345.67").unwrap();

        let rx = sig.serialize()[..32].to_vec();
        assert_eq!(rx, nonce.r.serialize().to_vec());
    }

    #[test]
    fn signing_twice_with_same_nonce_and_message_is_deterministic() {
        let crypto = Crypto::new();
        let priv_key = SecretKey::new(&mut thread_rng());
        let nonce = crypto.generate_nonce();

        let sig1 = crypto.sign(&priv_key, nonce.k, b"42").unwrap();
        let sig2 = crypto.sign(&priv_key, nonce.k, b"42").unwrap();
        assert_eq!(sig1, sig2);
    }
}
