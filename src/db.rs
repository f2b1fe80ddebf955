use crate::config::Config;
use crate::error::IngestError;
use crate::sample::NoiseSample;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub fn connect_lazy(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(config.db_pool_min)
        .max_connections(config.db_pool_max)
        .acquire_timeout(config.db_acquire_timeout())
        .connect_lazy(&config.database_url)
        .context("failed to create database pool")
}

/// One station row as stored in the directory's source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StationRecord {
    pub station_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Pooled write/read gateway over the durable store. Sample writes run in
/// their own transaction with an explicit commit; a failed write is reported
/// to the caller and never retried here.
#[derive(Clone)]
pub struct SampleStore {
    pool: PgPool,
}

impl SampleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert_sample(&self, sample: &NoiseSample) -> Result<u64, IngestError> {
        let mut tx = self.pool.begin().await.map_err(IngestError::from_write)?;
        let result = sqlx::query(
            "INSERT INTO noise_samples (inserted_at, measured_at, station_id, value) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(sample.inserted_at)
        .bind(sample.measured_at)
        .bind(sample.station_id)
        .bind(sample.value)
        .execute(&mut *tx)
        .await
        .map_err(IngestError::from_write)?;
        tx.commit().await.map_err(IngestError::from_write)?;
        Ok(result.rows_affected())
    }

    pub async fn list_stations(&self) -> Result<Vec<StationRecord>, sqlx::Error> {
        sqlx::query_as::<_, StationRecord>(
            "SELECT station_id, latitude, longitude FROM stations ORDER BY station_id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn upsert_stations(&self, rows: &[StationRecord]) -> Result<u64, sqlx::Error> {
        let mut affected = 0;
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let result = sqlx::query(
                "INSERT INTO stations (station_id, latitude, longitude) VALUES ($1, $2, $3) \
                 ON CONFLICT (station_id) DO UPDATE \
                 SET latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude",
            )
            .bind(row.station_id)
            .bind(row.latitude)
            .bind(row.longitude)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StationDirectory;
    use crate::sample::coordinate_key;
    use chrono::{DateTime, Utc};
    use std::env;

    async fn setup_test_pool(database_url: &str, schema: &str) -> Result<PgPool> {
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .execute(&admin_pool)
            .await?;
        drop(admin_pool);

        let schema_name = schema.to_string();
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let schema = schema_name.clone();
                Box::pin(async move {
                    sqlx::query(&format!("SET search_path TO {}", schema))
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stations (
                station_id bigint primary key,
                latitude double precision not null,
                longitude double precision not null
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS noise_samples (
                inserted_at timestamptz not null,
                measured_at timestamptz not null,
                station_id bigint not null,
                value double precision not null
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(pool)
    }

    async fn drop_test_schema(database_url: &str, schema: &str) -> Result<()> {
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        let _ = sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
            .execute(&admin_pool)
            .await;
        Ok(())
    }

    #[tokio::test]
    async fn test_station_roundtrip_and_sample_insert() -> Result<()> {
        if env::var("NOISE_INTEGRATION_TEST").ok().as_deref() != Some("1") {
            return Ok(());
        }
        let database_url = match env::var("NOISE_TEST_DATABASE_URL") {
            Ok(value) => value,
            Err(_) => return Ok(()),
        };

        let schema = format!("noise_test_{}", std::process::id());
        let pool = setup_test_pool(&database_url, &schema).await?;
        let store = SampleStore::new(pool.clone());

        let affected = store
            .upsert_stations(&[
                StationRecord {
                    station_id: 12,
                    latitude: 37.5665,
                    longitude: 126.978,
                },
                StationRecord {
                    station_id: 13,
                    latitude: 35.1796,
                    longitude: 129.0756,
                },
            ])
            .await?;
        assert_eq!(affected, 2);

        let stations = store.list_stations().await?;
        assert_eq!(stations.len(), 2);

        // a stored station resolves through the directory for its exact key
        let directory = StationDirectory::new(pool.clone());
        let loaded = directory.refresh().await?;
        assert_eq!(loaded, 2);
        assert_eq!(directory.resolve(&coordinate_key(37.5665, 126.978)), Some(12));

        let measured_at = DateTime::parse_from_rfc3339("2026-08-06T03:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rows = store
            .insert_sample(&NoiseSample {
                inserted_at: Utc::now(),
                measured_at,
                station_id: 12,
                value: 45.7,
            })
            .await?;
        assert_eq!(rows, 1);

        let (count, value): (i64, f64) = sqlx::query_as(
            "SELECT COUNT(*), MAX(value) FROM noise_samples WHERE station_id = $1",
        )
        .bind(12i64)
        .fetch_one(&pool)
        .await?;
        assert_eq!(count, 1);
        assert!((value - 45.7).abs() < f64::EPSILON);

        drop_test_schema(&database_url, &schema).await?;
        Ok(())
    }
}
