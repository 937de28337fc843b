pub mod asset;
pub mod crypto;
pub mod encode;
pub mod error;
pub mod event_type;
pub mod feed;
pub mod schedule;
pub mod storage;

use bitcoin::secp256k1::SecretKey;
use bitcoin::XOnlyPublicKey;
use chrono::{DateTime, Utc};

pub use asset::Asset;
pub use bitcoin;
pub use bitcoin::secp256k1::schnorr::Signature;

use crate::crypto::Crypto;
use crate::error::Error;
use crate::feed::PriceFeed;
use crate::storage::{Commitment, Storage};

/// The oracle: a process-wide identity (signing key, derived public key)
/// plus the attestation engine that orchestrates find-or-create R-values and
/// at-most-once signing over a concurrency-safe store.
#[derive(Debug, Clone)]
pub struct Oracle<S: Storage> {
    pub storage: S,
    signing_key: SecretKey,
    crypto: Crypto,
}

impl<S: Storage> Oracle<S> {
    pub fn new(storage: S, signing_key: SecretKey) -> Self {
        Self {
            storage,
            signing_key,
            crypto: Crypto::new(),
        }
    }

    pub fn public_key(&self) -> XOnlyPublicKey {
        self.crypto.derive_point(&self.signing_key)
    }

    /// Finds the commitment for `(asset_id, publish, event_type)`, creating
    /// one if absent.
    ///
    /// 1. Looks the row up by key; returns it if found.
    /// 2. Otherwise generates a fresh `(k, R)` pair and attempts to insert.
    /// 3. On a duplicate-key race with a concurrent caller, re-reads and
    ///    returns the winner's row. The freshly generated `k` above is
    ///    discarded — it was never returned or used, so discarding it is
    ///    safe and never results in two persisted nonces for one key.
    pub async fn commit(
        &self,
        asset_id: &str,
        publish: DateTime<Utc>,
        event_type: &str,
    ) -> Result<Commitment, Error> {
        if let Some(existing) = self.storage.find_by_key(asset_id, publish, event_type).await? {
            return Ok(existing);
        }

        let nonce = self.crypto.generate_nonce();
        let commitment = Commitment {
            asset_id: asset_id.to_string(),
            published_date: publish,
            event_type: event_type.to_string(),
            k: nonce.k,
            r: nonce.r,
            signature: None,
            value: None,
        };

        match self.storage.insert(commitment).await {
            Ok(saved) => Ok(saved),
            Err(Error::DuplicateKey) => self
                .storage
                .find_by_key(asset_id, publish, event_type)
                .await?
                .ok_or_else(|| {
                    Error::StorageFailure("commitment vanished after a duplicate-key race".into())
                }),
            Err(e) => Err(e),
        }
    }

    /// Signs the realized outcome for `(asset, publish, event_type)`,
    /// re-using the row's committed nonce and never producing two
    /// signatures for the same row.
    ///
    /// 1. `commit`s (may reuse an existing row).
    /// 2. If already signed, returns it unchanged (idempotent replay).
    /// 3. Fails with [`Error::InstantNotYetDue`] if `publish` is still in
    ///    the future.
    /// 4. Asks `feed` for the realized value, encodes the exact message,
    ///    signs it with the row's `k`, and seals the row.
    pub async fn sign<F: PriceFeed>(
        &self,
        feed: &F,
        asset: &Asset,
        publish: DateTime<Utc>,
        event_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Commitment, Error> {
        let commitment = self.commit(&asset.asset_id, publish, event_type).await?;
        if commitment.is_signed() {
            return Ok(commitment);
        }

        if publish > now {
            return Err(Error::InstantNotYetDue(format!(
                "oracle cannot sign a value not yet known, retry after {publish}"
            )));
        }

        let (event_kind, params) = event_type::parse_event_type(event_type);
        let feed_value = feed
            .past_price(&asset.asset_id, &asset.currency, publish)
            .await?;
        let message = encode::encode_outcome(&event_kind, &params, feed_value, asset.has_decimals)?;

        let signature = self
            .crypto
            .sign(&self.signing_key, commitment.k, message.as_bytes())?;

        match self
            .storage
            .seal(&asset.asset_id, publish, event_type, signature, message)
            .await
        {
            Ok(sealed) => Ok(sealed),
            Err(Error::SealConflict) => {
                log::error!(
                    "seal conflict for {}/{}@{publish}: nonce reuse risk averted, returning existing row without resigning",
                    asset.asset_id,
                    event_type,
                );
                self.storage
                    .find_by_key(&asset.asset_id, publish, event_type)
                    .await?
                    .ok_or_else(|| {
                        Error::StorageFailure("sealed commitment vanished after seal conflict".into())
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Looks up a commitment by its R-value, across all configured assets.
    pub async fn find_by_r(&self, r: &XOnlyPublicKey) -> Result<Option<Commitment>, Error> {
        self.storage.find_by_r(r).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::MemoryStorage;
    use bitcoin::secp256k1::rand::thread_rng;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedFeed {
        value: f64,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl PriceFeed for FixedFeed {
        async fn past_price(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<f64, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    fn oracle() -> Oracle<MemoryStorage> {
        Oracle::new(MemoryStorage::new(), SecretKey::new(&mut thread_rng()))
    }

    fn asset(asset_id: &str, has_decimals: bool) -> Asset {
        Asset {
            asset_id: asset_id.to_string(),
            description: None,
            currency: "usd".to_string(),
            has_decimals,
            start_date: Utc::now() - Duration::days(1),
            frequency: Duration::hours(1),
            range: Duration::days(1),
            event_types: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn commit_is_idempotent() {
        let o = oracle();
        let now = Utc::now();
        let first = o.commit("btcusd", now, "digits").await.unwrap();
        let second = o.commit("btcusd", now, "digits").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn commit_is_scoped_by_event_type() {
        let o = oracle();
        let now = Utc::now();
        let digits = o.commit("btcusd", now, "digits").await.unwrap();
        let above = o.commit("btcusd", now, "above(1000)").await.unwrap();
        assert_ne!(digits.r, above.r);
    }

    #[tokio::test]
    async fn sign_fails_when_not_yet_due() {
        let o = oracle();
        let a = asset("btcusd", true);
        let future = Utc::now() + Duration::hours(5);
        let feed = FixedFeed {
            value: 100.0,
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let err = o.sign(&feed, &a, future, "digits", Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "invalid-time-too-early");
    }

    #[tokio::test]
    async fn sign_is_at_most_once() {
        let o = oracle();
        let a = asset("btcusd", true);
        let past = Utc::now() - Duration::hours(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let feed = FixedFeed {
            value: 12345.678,
            calls: calls.clone(),
        };

        let first = o.sign(&feed, &a, past, "digits", Utc::now()).await.unwrap();
        assert_eq!(first.value, Some("12345.68".to_string()));

        let second = o.sign(&feed, &a, past, "digits", Utc::now()).await.unwrap();
        assert_eq!(second.signature, first.signature);
        assert_eq!(second.value, first.value);

        // the feed is only ever consulted once; the second call replays
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sign_verifies_against_oracle_public_key() {
        let o = oracle();
        let a = asset("btcusd", false);
        let past = Utc::now() - Duration::hours(1);
        let feed = FixedFeed {
            value: 12345.5,
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let sealed = o.sign(&feed, &a, past, "digits", Utc::now()).await.unwrap();
        let sig = sealed.signature.unwrap();
        let value = sealed.value.unwrap();
        assert_eq!(value, "12346");

        let secp = bitcoin::secp256k1::Secp256k1::verification_only();
        let msg = bitcoin::secp256k1::Message::from_hashed_data::<bitcoin::hashes::sha256::Hash>(
            value.as_bytes(),
        );
        assert!(secp.verify_schnorr(&sig, &msg, &o.public_key()).is_ok());
    }
}
