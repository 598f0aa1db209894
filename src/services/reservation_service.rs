// src/services/reservation_service.rs

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_exclusion_violation, lock_slots},
        error::AppError,
    },
    db::{ProductRepository, ReservationRepository},
    middleware::auth::AuthenticatedUser,
    models::{
        auth::UserSummary,
        booking::{BookedSlot, LineDetail, Reservation, ReservationDetail, ReservationLineInput},
        catalog::Product,
    },
    services::{
        availability::{self, TimeSlot, Unavailability},
        policy::can_manage,
        pricing,
    },
};

#[derive(Clone)]
pub struct ReservationService {
    reservation_repo: ReservationRepository,
    product_repo: ProductRepository,
    pool: PgPool,
}

impl ReservationService {
    pub fn new(reservation_repo: ReservationRepository, product_repo: ProductRepository, pool: PgPool) -> Self {
        Self { reservation_repo, product_repo, pool }
    }

    /// Cria a reserva com todas as linhas, ou nada.
    pub async fn create_reservation(
        &self,
        user: &AuthenticatedUser,
        lines: Vec<ReservationLineInput>,
    ) -> Result<ReservationDetail, AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let reservation = self.reservation_repo.create(&mut *tx, user.id).await?;
        let total = self
            .write_lines(&mut tx, user, reservation.id, &lines, None)
            .await?;
        let reservation = self.reservation_repo.set_total(&mut *tx, reservation.id, total).await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(
            user_id = %user.id,
            reservation_id = %reservation.id,
            lines = lines.len(),
            total = %total,
            "Reserva criada"
        );
        self.detail_of(reservation).await
    }

    /// Substitui todas as linhas da reserva. As linhas atuais dela não contam
    /// como conflito; se alguma linha nova falhar, a reserva fica como estava.
    pub async fn update_reservation(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        lines: Vec<ReservationLineInput>,
    ) -> Result<ReservationDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Autorização antes de qualquer checagem de disponibilidade
        let current = self
            .reservation_repo
            .find_for_update(&mut tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.reservation"))?;
        if !can_manage(user, Some(current.user_id)) {
            return Err(AppError::Forbidden);
        }

        // 2. Troca as linhas e recalcula
        let total = self.write_lines(&mut tx, user, id, &lines, Some(id)).await?;
        let reservation = self.reservation_repo.set_total(&mut *tx, id, total).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            reservation_id = %id,
            lines = lines.len(),
            total = %total,
            "Reserva atualizada"
        );
        self.detail_of(reservation).await
    }

    pub async fn delete_reservation(&self, user: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .reservation_repo
            .find_for_update(&mut tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.reservation"))?;
        if !can_manage(user, Some(current.user_id)) {
            return Err(AppError::Forbidden);
        }

        // As linhas caem junto (ON DELETE CASCADE)
        self.reservation_repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, reservation_id = %id, "Reserva removida");
        Ok(())
    }

    /// Leitura sempre fresca; nada é gravado.
    /// `Ok` = livre; `AvailabilityConflict` = indisponível.
    pub async fn check_availability(&self, line: ReservationLineInput) -> Result<(), AppError> {
        let product = self
            .product_repo
            .find_by_id(&self.pool, line.product_id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;

        let booked = self
            .reservation_repo
            .committed_lines(&self.pool, &[(line.product_id, line.date)])
            .await?;

        availability::check_line(&product, &line, &booked).map_err(|reason| AppError::AvailabilityConflict {
            product: product.name.clone(),
            reason,
        })
    }

    pub async fn booked_slots(&self, product_id: Uuid, date: NaiveDate) -> Result<Vec<BookedSlot>, AppError> {
        self.product_repo
            .find_by_id(&self.pool, product_id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;

        self.reservation_repo.booked_slots(product_id, date).await
    }

    // ---
    // Leitura completa
    // ---

    /// Usuários comuns veem as próprias reservas; loueurs e admins veem todas.
    pub async fn list_details(&self, user: &AuthenticatedUser) -> Result<Vec<ReservationDetail>, AppError> {
        let owner = (!user.role.is_elevated()).then_some(user.id);
        let reservations = self.reservation_repo.list(owner).await?;
        self.details_of(reservations).await
    }

    pub async fn get_detail(&self, user: &AuthenticatedUser, id: Uuid) -> Result<ReservationDetail, AppError> {
        let reservation = self
            .reservation_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.reservation"))?;
        if !can_manage(user, Some(reservation.user_id)) {
            return Err(AppError::Forbidden);
        }
        self.detail_of(reservation).await
    }

    // ---
    // Núcleo: checagem + escrita sob lock
    // ---

    /// Valida e grava as linhas de `reservation_id`, devolvendo o novo total.
    ///
    /// 1. Carrega os produtos (inexistente = 404)
    /// 2. Locks consultivos por (produto, data), em ordem
    /// 3. Lê as linhas gravadas e roda o verificador (`exclude` = reserva em edição)
    /// 4. Troca as linhas; a constraint de exclusão é a última barreira
    async fn write_lines(
        &self,
        conn: &mut PgConnection,
        user: &AuthenticatedUser,
        reservation_id: Uuid,
        lines: &[ReservationLineInput],
        exclude: Option<Uuid>,
    ) -> Result<Decimal, AppError> {
        // 1. Produtos
        let ids: Vec<Uuid> = lines
            .iter()
            .map(|l| l.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let products: HashMap<Uuid, Product> = self
            .product_repo
            .find_many(&mut *conn, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        if products.len() != ids.len() {
            return Err(AppError::ResourceNotFound("resource.product"));
        }

        // 2. Locks
        let keys: Vec<(Uuid, NaiveDate)> = lines
            .iter()
            .map(|l| (l.product_id, l.date))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        lock_slots(&mut *conn, keys.iter().copied()).await?;

        // 3. Verificação
        let booked = self.reservation_repo.committed_lines(&mut *conn, &keys).await?;
        if let Err(rejection) = availability::check_request(lines, |id| products.get(&id), &booked, exclude) {
            let line = &lines[rejection.index];
            tracing::warn!(
                user_id = %user.id,
                product_id = %rejection.product_id,
                date = %line.date,
                start = %line.slot.start(),
                end = %line.slot.end(),
                reason = ?rejection.reason,
                "Reserva recusada"
            );
            return Err(AppError::AvailabilityConflict {
                product: rejection.product_name,
                reason: rejection.reason,
            });
        }

        // 4. Escrita
        if exclude.is_some() {
            self.reservation_repo.delete_lines(&mut *conn, reservation_id).await?;
        }
        let prices: HashMap<Uuid, Decimal> = products.iter().map(|(id, p)| (*id, p.hourly_price)).collect();
        for line in lines {
            let hourly_price = prices
                .get(&line.product_id)
                .copied()
                .ok_or_else(|| AppError::Consistency(format!("produto {} sem preço", line.product_id)))?;
            self.reservation_repo
                .insert_line(&mut *conn, reservation_id, line, hourly_price)
                .await
                .map_err(|e| match e {
                    AppError::DatabaseError(ref db) if is_exclusion_violation(db) => {
                        tracing::warn!(product_id = %line.product_id, date = %line.date, "Sobreposição barrada pela constraint");
                        AppError::AvailabilityConflict {
                            product: products
                                .get(&line.product_id)
                                .map(|p| p.name.clone())
                                .unwrap_or_else(|| line.product_id.to_string()),
                            reason: Unavailability::AlreadyReserved,
                        }
                    }
                    other => other,
                })?;
        }

        pricing::compute_total(lines, &prices)
    }

    async fn detail_of(&self, reservation: Reservation) -> Result<ReservationDetail, AppError> {
        let id = reservation.id;
        self.details_of(vec![reservation])
            .await?
            .pop()
            .ok_or_else(|| AppError::Consistency(format!("reserva {id} sumiu durante a leitura")))
    }

    async fn details_of(&self, reservations: Vec<Reservation>) -> Result<Vec<ReservationDetail>, AppError> {
        let ids: Vec<Uuid> = reservations.iter().map(|r| r.id).collect();
        let user_ids: Vec<Uuid> = reservations.iter().map(|r| r.user_id).collect();

        let mut lines_by_reservation: HashMap<Uuid, Vec<LineDetail>> = HashMap::new();
        for row in self.reservation_repo.priced_lines(&self.pool, &ids).await? {
            let slot = TimeSlot::new(row.start_time, row.end_time)
                .ok_or_else(|| AppError::Consistency(format!("linha inválida na reserva {}", row.reservation_id)))?;
            lines_by_reservation.entry(row.reservation_id).or_default().push(LineDetail {
                product_id: row.product_id,
                product_name: row.product_name,
                hourly_price: row.hourly_price,
                reservation_date: row.reservation_date,
                start_time: row.start_time,
                end_time: row.end_time,
                amount: pricing::line_amount(row.hourly_price, &slot),
            });
        }

        let clients: HashMap<Uuid, UserSummary> = self
            .reservation_repo
            .clients(&user_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(reservations
            .into_iter()
            .map(|reservation| ReservationDetail {
                client: clients.get(&reservation.user_id).cloned(),
                lines: lines_by_reservation.remove(&reservation.id).unwrap_or_default(),
                reservation,
            })
            .collect())
    }
}
