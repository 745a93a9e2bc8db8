use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::application::repos::{LocationSource, RepoError};
use crate::domain::location::{LOCATION_ENTITY_TYPE, LocationId, RawLocation};

use super::{PostgresRepositories, map_sqlx_error};

const LOCATION_COLUMNS: &str = "id, entity_type, status, title, slug, location_type, email, \
    phone, address, city, state, postcode, hours, special_dates, prep_time, shipping_instances";

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: i64,
    entity_type: String,
    status: String,
    title: Option<String>,
    slug: Option<String>,
    location_type: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    hours: Option<serde_json::Value>,
    special_dates: Option<serde_json::Value>,
    prep_time: Option<i64>,
    shipping_instances: Option<serde_json::Value>,
}

impl From<LocationRow> for RawLocation {
    fn from(row: LocationRow) -> Self {
        Self {
            hours: decode_json(row.id, "hours", row.hours),
            special_dates: decode_json(row.id, "special_dates", row.special_dates),
            id: row.id,
            entity_type: row.entity_type,
            status: row.status,
            title: row.title,
            slug: row.slug,
            location_type: row.location_type,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            postcode: row.postcode,
            prep_time: row.prep_time,
            shipping_instances: row.shipping_instances,
        }
    }
}

/// Malformed JSON columns are treated as unset.
fn decode_json<T: DeserializeOwned>(
    id: LocationId,
    column: &'static str,
    value: Option<serde_json::Value>,
) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(location_id = id, column, error = %err, "Ignoring malformed location column");
            None
        }
    }
}

#[async_trait]
impl LocationSource for PostgresRepositories {
    async fn find(&self, id: LocationId) -> Result<Option<RawLocation>, RepoError> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1");
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(RawLocation::from))
    }

    async fn find_many(&self, ids: &[LocationId]) -> Result<Vec<RawLocation>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RawLocation::from).collect())
    }

    async fn published_ids(&self) -> Result<Vec<LocationId>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM locations
            WHERE entity_type = $1
              AND LOWER(TRIM(status)) IN ('publish', 'published')
            ORDER BY COALESCE(title, ''), id
            "#,
        )
        .bind(LOCATION_ENTITY_TYPE)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
