// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::refresh,
        handlers::auth::logout,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,

        // --- Categories ---
        handlers::categories::list_public,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,

        // --- Products ---
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,

        // --- Reservations ---
        handlers::reservations::create_reservation,
        handlers::reservations::update_reservation,
        handlers::reservations::delete_reservation,
        handlers::reservations::list_complete,
        handlers::reservations::get_complete,
        handlers::reservations::check_availability,
        handlers::reservations::booked_slots,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::UserSummary,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateUserPayload,

            // --- Catalog ---
            models::catalog::Category,
            models::catalog::Product,
            models::catalog::ProductDetail,
            models::catalog::CategoryPayload,
            models::catalog::CreateProductPayload,
            models::catalog::UpdateProductPayload,

            // --- Booking ---
            models::booking::Reservation,
            models::booking::ReservationLine,
            models::booking::LineDetail,
            models::booking::ReservationDetail,
            models::booking::CreateReservationPayload,
            models::booking::AvailabilityCheckPayload,
            models::booking::AvailabilityResponse,
            models::booking::BookedSlotsPayload,
            models::booking::BookedSlot,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Gestão de Usuários (admin)"),
        (name = "Categories", description = "Categorias de Espaços"),
        (name = "Products", description = "Espaços Reserváveis"),
        (name = "Reservations", description = "Reservas por Faixa Horária")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
