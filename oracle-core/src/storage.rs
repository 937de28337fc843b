use async_trait::async_trait;
use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::SecretKey;
use bitcoin::XOnlyPublicKey;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Error;

/// One row of persisted attestation state.
///
/// Identity is the composite key `(asset_id, published_date, event_type)`.
/// `r` is always `derive_point(k)`. `signature` and `value` are either both
/// set or both unset; once set they are immutable (one-time seal).
#[derive(Debug, Clone, PartialEq)]
pub struct Commitment {
    pub asset_id: String,
    pub published_date: DateTime<Utc>,
    pub event_type: String,
    pub k: SecretKey,
    pub r: XOnlyPublicKey,
    pub signature: Option<Signature>,
    pub value: Option<String>,
}

impl Commitment {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Persistence contract for attestation commitments.
///
/// Implementations must make `insert` atomic against a UNIQUE constraint on
/// the composite key, and `seal` a conditional write (`WHERE signature IS
/// NULL`) so two concurrent seals with different values cannot both
/// succeed. See `oracle-server`'s Postgres implementation for the reference
/// expression of both guarantees.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Looks up a commitment by its composite key.
    async fn find_by_key(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
    ) -> Result<Option<Commitment>, Error>;

    /// Looks up a commitment by its R-value, across all assets.
    async fn find_by_r(&self, r: &XOnlyPublicKey) -> Result<Option<Commitment>, Error>;

    /// Inserts a freshly generated commitment. Fails with
    /// [`Error::DuplicateKey`] if the composite key already exists.
    async fn insert(&self, commitment: Commitment) -> Result<Commitment, Error>;

    /// Sets `signature`/`value` iff currently unset. If the row is already
    /// sealed with `value`, returns that row unchanged; if sealed with a
    /// different value, fails with [`Error::SealConflict`].
    async fn seal(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
        signature: Signature,
        value: String,
    ) -> Result<Commitment, Error>;
}

type Key = (String, DateTime<Utc>, String);

fn key_of(asset_id: &str, published_date: DateTime<Utc>, event_type: &str) -> Key {
    (asset_id.to_string(), published_date, event_type.to_string())
}

/// An in-process, lock-based `Storage` used by tests and by examples that
/// don't need durability.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<HashMap<Key, Commitment>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_by_key(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
    ) -> Result<Option<Commitment>, Error> {
        let data = self
            .data
            .read()
            .map_err(|_| Error::StorageFailure("lock poisoned".into()))?;
        Ok(data.get(&key_of(asset_id, published_date, event_type)).cloned())
    }

    async fn find_by_r(&self, r: &XOnlyPublicKey) -> Result<Option<Commitment>, Error> {
        let data = self
            .data
            .read()
            .map_err(|_| Error::StorageFailure("lock poisoned".into()))?;
        Ok(data.values().find(|c| &c.r == r).cloned())
    }

    async fn insert(&self, commitment: Commitment) -> Result<Commitment, Error> {
        let key = key_of(&commitment.asset_id, commitment.published_date, &commitment.event_type);
        let mut data = self
            .data
            .write()
            .map_err(|_| Error::StorageFailure("lock poisoned".into()))?;
        if data.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        data.insert(key, commitment.clone());
        Ok(commitment)
    }

    async fn seal(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
        signature: Signature,
        value: String,
    ) -> Result<Commitment, Error> {
        let mut data = self
            .data
            .write()
            .map_err(|_| Error::StorageFailure("lock poisoned".into()))?;
        let commitment = data
            .get_mut(&key_of(asset_id, published_date, event_type))
            .ok_or(Error::NotFound)?;

        if let Some(existing) = &commitment.value {
            return if existing == &value {
                Ok(commitment.clone())
            } else {
                Err(Error::SealConflict)
            };
        }

        commitment.signature = Some(signature);
        commitment.value = Some(value);
        Ok(commitment.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::Crypto;

    fn sample_commitment(crypto: &Crypto, asset_id: &str, published_date: DateTime<Utc>) -> Commitment {
        let nonce = crypto.generate_nonce();
        Commitment {
            asset_id: asset_id.to_string(),
            published_date,
            event_type: "digits".to_string(),
            k: nonce.k,
            r: nonce.r,
            signature: None,
            value: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_key_roundtrips() {
        let storage = MemoryStorage::new();
        let crypto = Crypto::new();
        let now = Utc::now();
        let commitment = sample_commitment(&crypto, "btcusd", now);

        storage.insert(commitment.clone()).await.unwrap();
        let found = storage.find_by_key("btcusd", now, "digits").await.unwrap();
        assert_eq!(found, Some(commitment));
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let storage = MemoryStorage::new();
        let crypto = Crypto::new();
        let now = Utc::now();
        let commitment = sample_commitment(&crypto, "btcusd", now);

        storage.insert(commitment.clone()).await.unwrap();
        let err = storage.insert(commitment).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey));
    }

    #[tokio::test]
    async fn seal_is_conditional_on_unset_signature() {
        let storage = MemoryStorage::new();
        let crypto = Crypto::new();
        let now = Utc::now();
        let commitment = sample_commitment(&crypto, "btcusd", now);
        storage.insert(commitment.clone()).await.unwrap();

        let sig = crypto.sign(&SecretKey::new(&mut bitcoin::secp256k1::rand::thread_rng()), commitment.k, b"12346").unwrap();
        let sealed = storage
            .seal("btcusd", now, "digits", sig, "12346".to_string())
            .await
            .unwrap();
        assert_eq!(sealed.value, Some("12346".to_string()));

        // sealing again with the same value is idempotent
        let sealed_again = storage
            .seal("btcusd", now, "digits", sig, "12346".to_string())
            .await
            .unwrap();
        assert_eq!(sealed_again.value, Some("12346".to_string()));

        // sealing with a different value is a conflict, never overwrites
        let err = storage
            .seal("btcusd", now, "digits", sig, "99999".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SealConflict));
    }

    #[tokio::test]
    async fn find_by_r_looks_up_across_assets() {
        let storage = MemoryStorage::new();
        let crypto = Crypto::new();
        let now = Utc::now();
        let commitment = sample_commitment(&crypto, "btcusd", now);
        storage.insert(commitment.clone()).await.unwrap();

        let found = storage.find_by_r(&commitment.r).await.unwrap();
        assert_eq!(found, Some(commitment));
    }
}
