use async_trait::async_trait;
use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::XOnlyPublicKey;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use oracle_core::error::Error;
use oracle_core::storage::{Commitment, Storage};

mod attestation;
mod schema;

use attestation::{Attestation, NewAttestation};
use schema::attestations;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// `Storage` backed by a Postgres table with a UNIQUE index on
/// `(asset_id, published_date, event_type)` and a conditional-update
/// `seal` so two concurrent seals with different values can't both succeed.
#[derive(Clone)]
pub struct PostgresStorage {
    db_pool: Pool<ConnectionManager<PgConnection>>,
}

impl PostgresStorage {
    pub fn new(db_pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { db_pool }
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<PgConnection>>, Error> {
        self.db_pool
            .get()
            .map_err(|e| Error::StorageFailure(e.to_string()))
    }
}

fn map_diesel_err(e: DieselError) -> Error {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Error::DuplicateKey,
        DieselError::NotFound => Error::NotFound,
        other => Error::StorageFailure(other.to_string()),
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn find_by_key(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
    ) -> Result<Option<Commitment>, Error> {
        let mut conn = self.conn()?;
        let row = attestations::table
            .filter(attestations::asset_id.eq(asset_id))
            .filter(attestations::published_date.eq(published_date.naive_utc()))
            .filter(attestations::event_type.eq(event_type))
            .first::<Attestation>(&mut conn)
            .optional()
            .map_err(map_diesel_err)?;

        row.map(|r| r.to_commitment()).transpose()
    }

    async fn find_by_r(&self, r: &XOnlyPublicKey) -> Result<Option<Commitment>, Error> {
        let mut conn = self.conn()?;
        let rvalue = hex::encode(r.serialize());
        let row = attestations::table
            .filter(attestations::rvalue.eq(rvalue))
            .first::<Attestation>(&mut conn)
            .optional()
            .map_err(map_diesel_err)?;

        row.map(|r| r.to_commitment()).transpose()
    }

    async fn insert(&self, commitment: Commitment) -> Result<Commitment, Error> {
        let mut conn = self.conn()?;
        let new_row = NewAttestation::from_commitment(&commitment);

        let row: Attestation = diesel::insert_into(attestations::table)
            .values(&new_row)
            .get_result(&mut conn)
            .map_err(map_diesel_err)?;

        row.to_commitment()
    }

    async fn seal(
        &self,
        asset_id: &str,
        published_date: DateTime<Utc>,
        event_type: &str,
        signature: Signature,
        value: String,
    ) -> Result<Commitment, Error> {
        let mut conn = self.conn()?;
        let published_date_naive = published_date.naive_utc();
        let sig_hex = hex::encode(signature.serialize());

        conn.transaction::<_, Error, _>(|conn| {
            let updated = diesel::update(attestations::table)
                .filter(attestations::asset_id.eq(asset_id))
                .filter(attestations::published_date.eq(published_date_naive))
                .filter(attestations::event_type.eq(event_type))
                .filter(attestations::signature.is_null())
                .set((
                    attestations::signature.eq(Some(sig_hex.clone())),
                    attestations::value.eq(Some(value.clone())),
                    attestations::updated_at.eq(diesel::dsl::now),
                ))
                .get_result::<Attestation>(conn)
                .optional()
                .map_err(map_diesel_err)?;

            if let Some(row) = updated {
                return row.to_commitment();
            }

            // the conditional update affected zero rows: either someone
            // else sealed it first (idempotent replay), or the row is gone.
            let existing = attestations::table
                .filter(attestations::asset_id.eq(asset_id))
                .filter(attestations::published_date.eq(published_date_naive))
                .filter(attestations::event_type.eq(event_type))
                .first::<Attestation>(conn)
                .optional()
                .map_err(map_diesel_err)?
                .ok_or(Error::NotFound)?;

            if existing.value.as_deref() == Some(value.as_str()) {
                existing.to_commitment()
            } else {
                Err(Error::SealConflict)
            }
        })
    }
}
