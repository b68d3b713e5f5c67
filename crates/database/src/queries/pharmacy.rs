use model::{
    filter::PharmacyFilter,
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use directory::database::Result;
use sqlx::{Executor, PgConnection, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    pharmacy::{PharmacyRow, StatsRow},
    with_id, with_ids,
};

use super::{contains_pattern, convert_error};

const COLUMNS: &str = "
    id, name, neighborhood, city, region, phone, is_24h, start_date, end_date,
    group_name, latitude, longitude, hours, services
";

/// Rows per insert statement, keeps the bind parameter count well below the
/// postgres limit.
const MAX_CHUNK_SIZE: usize = 500;

pub async fn get<'c, E>(executor: E, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "SELECT {} FROM pharmacies_garde WHERE id = $1;",
        COLUMNS
    ))
    .bind(id.raw_ref::<str>())
    .fetch_one(executor)
    .await
    .map(|row: PharmacyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_page<'c, E>(
    executor: E,
    filter: &PharmacyFilter,
    offset: u64,
    limit: u64,
) -> Result<Vec<WithId<Pharmacy>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        SELECT {}
        FROM pharmacies_garde
        WHERE ($1::text IS NULL OR search_index LIKE $1)
            AND ($2::text IS NULL OR btrim(region) = $2)
            AND ($3::text IS NULL OR btrim(city) = $3)
            AND (NOT $4 OR is_24h)
        ORDER BY name, id
        LIMIT $5 OFFSET $6;
        ",
        COLUMNS
    ))
    .bind(
        filter
            .search
            .as_deref()
            .map(|term| contains_pattern(&term.to_lowercase())),
    )
    .bind(filter.region.as_deref())
    .bind(filter.city.as_deref())
    .bind(filter.duty_only)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<PharmacyRow>| Ok(with_ids(rows)))
}

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Pharmacy>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "SELECT {} FROM pharmacies_garde ORDER BY name, id;",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<PharmacyRow>| Ok(with_ids(rows)))
}

pub async fn regions<'c, E>(executor: E) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT DISTINCT btrim(region) AS region
        FROM pharmacies_garde
        WHERE btrim(region) <> ''
        ORDER BY region;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn cities<'c, E>(executor: E, region: Option<&str>) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT DISTINCT btrim(city) AS city
        FROM pharmacies_garde
        WHERE city IS NOT NULL
            AND btrim(city) <> ''
            AND ($1::text IS NULL OR btrim(region) = $1)
        ORDER BY city;
        ",
    )
    .bind(region)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        INSERT INTO pharmacies_garde(
            name, neighborhood, city, region, phone, is_24h, start_date,
            end_date, group_name, latitude, longitude, hours, services
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&pharmacy.name)
    .bind(&pharmacy.neighborhood)
    .bind(&pharmacy.city)
    .bind(&pharmacy.region)
    .bind(&pharmacy.phone)
    .bind(pharmacy.is_24h)
    .bind(pharmacy.start_date)
    .bind(pharmacy.end_date)
    .bind(&pharmacy.group_name)
    .bind(pharmacy.latitude)
    .bind(pharmacy.longitude)
    .bind(&pharmacy.hours)
    .bind(&pharmacy.services)
    .fetch_one(executor)
    .await
    .map(|row: PharmacyRow| with_id(row))
    .map_err(convert_error)
}

/// Inserts in chunks over one connection. Atomic only inside a transaction.
pub async fn insert_all(connection: &mut PgConnection, pharmacies: &[Pharmacy]) -> Result<u64> {
    let mut inserted = 0;

    for chunk in pharmacies.chunks(MAX_CHUNK_SIZE) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "
            INSERT INTO pharmacies_garde(
                name, neighborhood, city, region, phone, is_24h, start_date,
                end_date, group_name, latitude, longitude, hours, services
            )
            ",
        );
        builder.push_values(chunk, |mut row, pharmacy| {
            row.push_bind(&pharmacy.name)
                .push_bind(&pharmacy.neighborhood)
                .push_bind(&pharmacy.city)
                .push_bind(&pharmacy.region)
                .push_bind(&pharmacy.phone)
                .push_bind(pharmacy.is_24h)
                .push_bind(pharmacy.start_date)
                .push_bind(pharmacy.end_date)
                .push_bind(&pharmacy.group_name)
                .push_bind(pharmacy.latitude)
                .push_bind(pharmacy.longitude)
                .push_bind(&pharmacy.hours)
                .push_bind(&pharmacy.services);
        });

        inserted += builder
            .build()
            .execute(&mut *connection)
            .await
            .map_err(convert_error)?
            .rows_affected();
    }

    Ok(inserted)
}

/// Writes the columns of the draft, location, hours and services stay as
/// they are.
pub async fn update<'c, E>(
    executor: E,
    id: &Id<Pharmacy>,
    draft: PharmacyDraft,
) -> Result<WithId<Pharmacy>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        UPDATE pharmacies_garde
        SET name = $1,
            neighborhood = $2,
            city = NULLIF($3, ''),
            region = $4,
            phone = $5,
            is_24h = $6,
            group_name = $7,
            start_date = $8,
            end_date = $9
        WHERE id = $10
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&draft.name)
    .bind(&draft.neighborhood)
    .bind(&draft.city)
    .bind(&draft.region)
    .bind(&draft.phone)
    .bind(draft.is_24h)
    .bind(&draft.group_name)
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(id.raw_ref::<str>())
    .fetch_one(executor)
    .await
    .map(|row: PharmacyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "DELETE FROM pharmacies_garde WHERE id = $1 RETURNING {};",
        COLUMNS
    ))
    .bind(id.raw_ref::<str>())
    .fetch_one(executor)
    .await
    .map(|row: PharmacyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn delete_all<'c, E>(executor: E) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM pharmacies_garde;")
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(convert_error)
}

pub async fn stats<'c, E>(executor: E) -> Result<PharmacyStats>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE is_24h) AS count_24h,
            COUNT(DISTINCT NULLIF(btrim(region), '')) AS regions,
            COUNT(DISTINCT NULLIF(btrim(city), '')) AS cities
        FROM pharmacies_garde;
        ",
    )
    .fetch_one(executor)
    .await
    .map(|row: StatsRow| row.into())
    .map_err(convert_error)
}
