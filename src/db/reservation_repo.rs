// src/db/reservation_repo.rs

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::UserSummary,
    models::booking::{BookedSlot, Reservation, ReservationLine, ReservationLineInput},
};

const LINE_COLUMNS: &str = "id, reservation_id, product_id, reservation_date, start_time, end_time";

// Linha + nome do produto, para leitura completa e recálculo de totais
#[derive(Debug, Clone, FromRow)]
pub struct PricedLineRow {
    pub reservation_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub hourly_price: Decimal,
    pub reservation_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Cabeçalho da reserva
    // ---

    pub async fn create<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, total_price)
            VALUES ($1, 0)
            RETURNING id, user_id, total_price, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(reservation)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, total_price, created_at, updated_at FROM reservations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(reservation)
    }

    /// Trava a linha da reserva até o fim da transação.
    pub async fn find_for_update(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, total_price, created_at, updated_at FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(reservation)
    }

    /// `owner = None` lista todas.
    pub async fn list(&self, owner: Option<Uuid>) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, user_id, total_price, created_at, updated_at
            FROM reservations
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    pub async fn set_total<'e, E>(&self, executor: E, id: Uuid, total: Decimal) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations SET total_price = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, total_price, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(total)
        .fetch_one(executor)
        .await?;
        Ok(reservation)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM reservations WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Linhas
    // ---

    /// Insere uma linha com o preço por hora vigente.
    /// A constraint de exclusão recusa sobreposições (23P01).
    pub async fn insert_line<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        line: &ReservationLineInput,
        hourly_price: Decimal,
    ) -> Result<ReservationLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ReservationLine>(&format!(
            r#"
            INSERT INTO reservation_lines (reservation_id, product_id, reservation_date, start_time, end_time, hourly_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINE_COLUMNS}
            "#
        ))
        .bind(reservation_id)
        .bind(line.product_id)
        .bind(line.date)
        .bind(line.slot.start())
        .bind(line.slot.end())
        .bind(hourly_price)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn delete_lines<'e, E>(&self, executor: E, reservation_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM reservation_lines WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Linhas gravadas nos pares (produto, data) informados.
    pub async fn committed_lines<'e, E>(
        &self,
        executor: E,
        keys: &[(Uuid, NaiveDate)],
    ) -> Result<Vec<ReservationLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (product_ids, dates): (Vec<Uuid>, Vec<NaiveDate>) = keys.iter().copied().unzip();

        let lines = sqlx::query_as::<_, ReservationLine>(&format!(
            r#"
            SELECT {LINE_COLUMNS} FROM reservation_lines
            WHERE (product_id, reservation_date) IN (
                SELECT * FROM UNNEST($1::uuid[], $2::date[])
            )
            ORDER BY product_id, reservation_date, start_time
            "#
        ))
        .bind(&product_ids)
        .bind(&dates)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Faixas já reservadas de um produto num dia, em ordem de início.
    pub async fn booked_slots(&self, product_id: Uuid, date: NaiveDate) -> Result<Vec<BookedSlot>, AppError> {
        let slots = sqlx::query_as::<_, BookedSlot>(
            r#"
            SELECT start_time AS heure_debut, end_time AS heure_fin
            FROM reservation_lines
            WHERE product_id = $1 AND reservation_date = $2
            ORDER BY start_time
            "#,
        )
        .bind(product_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    /// Linhas com o nome do produto e o preço gravado na reserva.
    pub async fn priced_lines<'e, E>(
        &self,
        executor: E,
        reservation_ids: &[Uuid],
    ) -> Result<Vec<PricedLineRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PricedLineRow>(
            r#"
            SELECT l.reservation_id, l.product_id, p.name AS product_name, l.hourly_price,
                   l.reservation_date, l.start_time, l.end_time
            FROM reservation_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.reservation_id = ANY($1)
            ORDER BY l.reservation_date, l.start_time
            "#,
        )
        .bind(reservation_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Trava, em ordem de id, as reservas com linhas do produto.
    /// Mesma ordem da edição de reservas: cabeçalho antes das linhas.
    pub async fn lock_for_product(&self, conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT r.id FROM reservations r
            WHERE EXISTS (
                SELECT 1 FROM reservation_lines l
                WHERE l.reservation_id = r.id AND l.product_id = $1
            )
            ORDER BY r.id
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_all(conn)
        .await?;
        Ok(ids)
    }

    /// Remove as linhas de um produto e devolve as reservas afetadas.
    pub async fn delete_lines_for_product<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let affected: Vec<Uuid> = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM reservation_lines WHERE product_id = $1 RETURNING reservation_id
            )
            SELECT DISTINCT reservation_id FROM removed
            "#,
        )
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(affected)
    }

    pub async fn clients(&self, user_ids: &[Uuid]) -> Result<Vec<UserSummary>, AppError> {
        let clients = sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = ANY($1)")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }
}
