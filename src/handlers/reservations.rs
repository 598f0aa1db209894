// src/handlers/reservations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::booking::{
        AvailabilityCheckPayload, AvailabilityResponse, BookedSlot, BookedSlotsPayload, CreateReservationPayload,
        ReservationDetail,
    },
};

// ---
// Handler: create_reservation (POST /commandes e /commandes/create)
// ---
#[utoipa::path(
    post,
    path = "/api/commandes",
    tag = "Reservations",
    request_body = CreateReservationPayload,
    responses(
        (status = 200, description = "Reserva criada com todas as linhas", body = ReservationDetail),
        (status = 400, description = "Dados inválidos ou horário indisponível (nada é gravado)"),
        (status = 404, description = "Produto inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<Json<ReservationDetail>, ApiError> {
    // 1. Formato dos quatro arrays
    let lines = payload
        .into_lines()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    // 2. Checagem + escrita (tudo ou nada)
    let reservation = app_state
        .reservation_service
        .create_reservation(&user, lines)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reservation))
}

#[utoipa::path(
    put,
    path = "/api/commandes/{id}",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    request_body = CreateReservationPayload,
    responses(
        (status = 200, description = "Linhas substituídas", body = ReservationDetail),
        (status = 400, description = "Dados inválidos ou horário indisponível (reserva inalterada)"),
        (status = 403, description = "Nem dono nem loueur/admin"),
        (status = 404, description = "Reserva ou produto inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<Json<ReservationDetail>, ApiError> {
    let lines = payload
        .into_lines()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reservation = app_state
        .reservation_service
        .update_reservation(&user, id, lines)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reservation))
}

#[utoipa::path(
    delete,
    path = "/api/commandes/{id}",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 204, description = "Reserva removida"),
        (status = 403, description = "Nem dono nem loueur/admin"),
        (status = 404, description = "Reserva inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .reservation_service
        .delete_reservation(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/commandes_complete",
    tag = "Reservations",
    responses((status = 200, description = "Reservas com cliente e linhas", body = [ReservationDetail])),
    security(("api_jwt" = []))
)]
pub async fn list_complete(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ReservationDetail>>, ApiError> {
    let reservations = app_state
        .reservation_service
        .list_details(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/api/commandes_complete/{id}",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva com cliente e linhas", body = ReservationDetail),
        (status = 403, description = "Nem dono nem loueur/admin"),
        (status = 404, description = "Reserva inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_complete(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationDetail>, ApiError> {
    let reservation = app_state
        .reservation_service
        .get_detail(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reservation))
}

// Consulta pontual, sem gravar nada
#[utoipa::path(
    post,
    path = "/api/commandes/verifier-disponibilite",
    tag = "Reservations",
    request_body = AvailabilityCheckPayload,
    responses(
        (status = 200, description = "Resultado da consulta", body = AvailabilityResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_availability(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<AvailabilityCheckPayload>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let line = payload
        .into_line()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = match app_state.reservation_service.check_availability(line).await {
        Ok(()) => AvailabilityResponse {
            disponible: true,
            message: app_state.i18n_store.translate(&locale.0, "booking.available"),
        },
        Err(e @ AppError::AvailabilityConflict { .. }) => AvailabilityResponse {
            disponible: false,
            message: e.to_api_error(&locale, &app_state.i18n_store).error,
        },
        Err(e) => return Err(e.to_api_error(&locale, &app_state.i18n_store)),
    };

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/commandes/creneaux-reserves",
    tag = "Reservations",
    request_body = BookedSlotsPayload,
    responses(
        (status = 200, description = "Faixas já reservadas, em ordem", body = [BookedSlot]),
        (status = 404, description = "Produto inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn booked_slots(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<BookedSlotsPayload>,
) -> Result<Json<Vec<BookedSlot>>, ApiError> {
    let slots = app_state
        .reservation_service
        .booked_slots(payload.produit_id, payload.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(slots))
}
