use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::SecretKey;
use bitcoin::XOnlyPublicKey;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use oracle_core::error::Error;
use oracle_core::storage::Commitment;

use super::schema::attestations;

#[derive(Queryable, Identifiable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = attestations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Attestation {
    pub id: i64,
    pub asset_id: String,
    pub published_date: NaiveDateTime,
    pub event_type: String,
    pub kvalue: String,
    pub rvalue: String,
    pub signature: Option<String>,
    pub value: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = attestations)]
pub struct NewAttestation {
    pub asset_id: String,
    pub published_date: NaiveDateTime,
    pub event_type: String,
    pub kvalue: String,
    pub rvalue: String,
}

impl Attestation {
    pub fn to_commitment(&self) -> Result<Commitment, Error> {
        Ok(Commitment {
            asset_id: self.asset_id.clone(),
            published_date: DateTime::<Utc>::from_naive_utc_and_offset(self.published_date, Utc),
            event_type: self.event_type.clone(),
            k: decode_secret_key(&self.kvalue)?,
            r: decode_xonly(&self.rvalue)?,
            signature: self
                .signature
                .as_deref()
                .map(decode_signature)
                .transpose()?,
            value: self.value.clone(),
        })
    }
}

impl NewAttestation {
    pub fn from_commitment(commitment: &Commitment) -> Self {
        Self {
            asset_id: commitment.asset_id.clone(),
            published_date: commitment.published_date.naive_utc(),
            event_type: commitment.event_type.clone(),
            kvalue: hex::encode(commitment.k.secret_bytes()),
            rvalue: hex::encode(commitment.r.serialize()),
        }
    }
}

fn decode_secret_key(s: &str) -> Result<SecretKey, Error> {
    let bytes = hex::decode(s).map_err(|e| Error::StorageFailure(e.to_string()))?;
    SecretKey::from_slice(&bytes).map_err(|e| Error::StorageFailure(e.to_string()))
}

fn decode_xonly(s: &str) -> Result<XOnlyPublicKey, Error> {
    let bytes = hex::decode(s).map_err(|e| Error::StorageFailure(e.to_string()))?;
    XOnlyPublicKey::from_slice(&bytes).map_err(|e| Error::StorageFailure(e.to_string()))
}

fn decode_signature(s: &str) -> Result<Signature, Error> {
    let bytes = hex::decode(s).map_err(|e| Error::StorageFailure(e.to_string()))?;
    Signature::from_slice(&bytes).map_err(|e| Error::StorageFailure(e.to_string()))
}
