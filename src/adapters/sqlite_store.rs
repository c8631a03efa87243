use crate::adapters::schema::{areas, shipment_tracking_logs};
use crate::domain::model::{Area, AreaKey, ShipmentTrackingLog};
use crate::domain::ports::{AreaStore, TrackingStore};
use crate::utils::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

const DB_FILE: &str = "gateway.db";
const POOL_SIZE: u32 = 8;

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA synchronous = NORMAL;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = areas)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct AreaRow {
    id: i64,
    original_subdistrict_id: i64,
    original_postal_code: String,
    description: String,
    external_source: String,
    external_id: String,
    external_info: String,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = areas)]
struct AreaFields<'a> {
    original_subdistrict_id: i64,
    original_postal_code: &'a str,
    description: &'a str,
    external_source: &'a str,
    external_id: &'a str,
    external_info: &'a str,
}

impl<'a> AreaFields<'a> {
    fn of(area: &'a Area) -> StoreResult<Self> {
        let original_subdistrict_id = i64::try_from(area.original_subdistrict_id)
            .map_err(|e| StoreError::Query(DieselError::SerializationError(Box::new(e))))?;
        Ok(Self {
            original_subdistrict_id,
            original_postal_code: &area.original_postal_code,
            description: &area.description,
            external_source: &area.external_source,
            external_id: &area.external_id,
            external_info: &area.external_info,
        })
    }
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        Area {
            id: u64::try_from(row.id).unwrap_or_default(),
            original_subdistrict_id: u64::try_from(row.original_subdistrict_id).unwrap_or_default(),
            original_postal_code: row.original_postal_code,
            description: row.description,
            external_source: row.external_source,
            external_id: row.external_id,
            external_info: row.external_info,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = shipment_tracking_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct TrackingRow {
    id: String,
    courier_code: String,
    waybill: String,
    origin_info: String,
    destination_info: String,
    tracking_url: String,
    tracking_status: String,
    shipment_history: String,
    last_tracked_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Columns an upsert may overwrite. Identity and creation time stay put.
#[derive(AsChangeset)]
#[diesel(table_name = shipment_tracking_logs)]
struct TrackingChanges<'a> {
    origin_info: &'a str,
    destination_info: &'a str,
    tracking_url: &'a str,
    tracking_status: &'a str,
    shipment_history: &'a str,
    last_tracked_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<ShipmentTrackingLog> for TrackingRow {
    fn from(log: ShipmentTrackingLog) -> Self {
        TrackingRow {
            id: log.id,
            courier_code: log.courier_code,
            waybill: log.waybill,
            origin_info: log.origin_info,
            destination_info: log.destination_info,
            tracking_url: log.tracking_url,
            tracking_status: log.tracking_status,
            shipment_history: log.shipment_history,
            last_tracked_at: log.last_tracked_at.naive_utc(),
            created_at: log.created_at.naive_utc(),
            updated_at: log.updated_at.naive_utc(),
        }
    }
}

impl From<TrackingRow> for ShipmentTrackingLog {
    fn from(row: TrackingRow) -> Self {
        ShipmentTrackingLog {
            id: row.id,
            courier_code: row.courier_code,
            waybill: row.waybill,
            origin_info: row.origin_info,
            destination_info: row.destination_info,
            tracking_url: row.tracking_url,
            tracking_status: row.tracking_status,
            shipment_history: row.shipment_history,
            last_tracked_at: row.last_tracked_at.and_utc(),
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        }
    }
}

/// Turns a unique index violation into [`StoreError::Conflict`].
fn conflict_on(err: DieselError, field: &str, value: &str) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => StoreError::Conflict {
            field: field.to_string(),
            value: value.to_string(),
        },
        other => StoreError::Query(other),
    }
}

/// Durable store backed by SQLite through a diesel connection pool.
///
/// Queries are blocking, so each call runs on tokio's blocking pool with a
/// pooled connection.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) `gateway.db` under `data_dir` and applies pending
    /// migrations.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;
        let db_path = data_dir.join(DB_FILE).to_string_lossy().into_owned();

        let store = tokio::task::spawn_blocking(move || {
            let pool = Pool::builder()
                .max_size(POOL_SIZE)
                .min_idle(Some(1))
                .connection_customizer(Box::new(SqlitePragmas))
                .build(ConnectionManager::<SqliteConnection>::new(db_path.as_str()))
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", db_path, e)))?;
            pool.get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .batch_execute("PRAGMA journal_mode = WAL;")?;
            Self::migrate(pool)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))??;

        tracing::info!("📂 Opened store at {}", data_dir.join(DB_FILE).display());
        Ok(store)
    }

    /// A private in-memory database. One connection holds it, so the pool
    /// never lets that connection go.
    pub fn in_memory() -> StoreResult<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::migrate(pool)
    }

    fn migrate(pool: SqlitePool) -> StoreResult<Self> {
        {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| StoreError::Migration(e.to_string()))?;
            for version in &applied {
                tracing::debug!("Applied migration {}", version);
            }
        }
        Ok(Self { pool })
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

#[async_trait]
impl AreaStore for SqliteStore {
    async fn create(&self, area: Area) -> StoreResult<Area> {
        self.run(move |conn| {
            let row = diesel::insert_into(areas::table)
                .values(AreaFields::of(&area)?)
                .returning(AreaRow::as_returning())
                .get_result(conn)
                .map_err(|e| conflict_on(e, "external_id", &area.external_id))?;
            Ok(Area::from(row))
        })
        .await
    }

    async fn update(&self, area: Area) -> StoreResult<Area> {
        self.run(move |conn| {
            let missing = || StoreError::MissingRecord {
                id: area.id.to_string(),
            };
            let id = i64::try_from(area.id).map_err(|_| missing())?;
            let row = diesel::update(areas::table.find(id))
                .set(AreaFields::of(&area)?)
                .returning(AreaRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| conflict_on(e, "external_id", &area.external_id))?;
            row.map(Area::from).ok_or_else(missing)
        })
        .await
    }

    async fn find_by_natural_key(&self, key: &AreaKey) -> StoreResult<Option<Area>> {
        if key.is_empty() {
            return Ok(None);
        }
        let subdistrict_id = match key.subdistrict_id.map(i64::try_from) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => return Ok(None),
            None => None,
        };
        let postal_code = key.postal_code.clone();

        self.run(move |conn| {
            let mut query = areas::table
                .select(AreaRow::as_select())
                .order(areas::id.asc())
                .into_boxed();
            if let Some(id) = subdistrict_id {
                query = query.filter(areas::original_subdistrict_id.eq(id));
            }
            if let Some(code) = postal_code {
                query = query.filter(areas::original_postal_code.eq(code));
            }
            Ok(query.first(conn).optional()?.map(Area::from))
        })
        .await
    }

    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Area>> {
        if external_id.is_empty() {
            return Ok(None);
        }
        let external_id = external_id.to_string();

        self.run(move |conn| {
            Ok(areas::table
                .filter(areas::external_id.eq(external_id))
                .select(AreaRow::as_select())
                .first(conn)
                .optional()?
                .map(Area::from))
        })
        .await
    }
}

#[async_trait]
impl TrackingStore for SqliteStore {
    async fn find_by_waybill_and_courier(
        &self,
        waybill: &str,
        courier_code: &str,
    ) -> StoreResult<Option<ShipmentTrackingLog>> {
        let (waybill, courier_code) = (waybill.to_string(), courier_code.to_string());

        self.run(move |conn| {
            use crate::adapters::schema::shipment_tracking_logs::dsl;
            Ok(dsl::shipment_tracking_logs
                .filter(dsl::waybill.eq(waybill))
                .filter(dsl::courier_code.eq(courier_code))
                .select(TrackingRow::as_select())
                .first(conn)
                .optional()?
                .map(ShipmentTrackingLog::from))
        })
        .await
    }

    async fn create_or_update(
        &self,
        log: ShipmentTrackingLog,
    ) -> StoreResult<ShipmentTrackingLog> {
        self.run(move |conn| {
            use crate::adapters::schema::shipment_tracking_logs::dsl;
            let row = TrackingRow::from(log);
            let changes = TrackingChanges {
                origin_info: &row.origin_info,
                destination_info: &row.destination_info,
                tracking_url: &row.tracking_url,
                tracking_status: &row.tracking_status,
                shipment_history: &row.shipment_history,
                last_tracked_at: row.last_tracked_at,
                updated_at: row.updated_at,
            };

            let saved = conn.immediate_transaction::<_, DieselError, _>(|conn| {
                diesel::insert_into(dsl::shipment_tracking_logs)
                    .values(&row)
                    .on_conflict((dsl::waybill, dsl::courier_code))
                    .do_update()
                    .set(&changes)
                    .execute(conn)?;

                dsl::shipment_tracking_logs
                    .filter(dsl::waybill.eq(&row.waybill))
                    .filter(dsl::courier_code.eq(&row.courier_code))
                    .select(TrackingRow::as_select())
                    .first(conn)
            })?;
            Ok(ShipmentTrackingLog::from(saved))
        })
        .await
    }
}
