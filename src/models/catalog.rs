// src/models/catalog.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::services::availability::AvailabilityWindow;

// --- Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Locaux commerciaux")]
    pub name: String,
    #[schema(example = "locaux-commerciaux")]
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Espaços reserváveis ("produits") ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    #[schema(example = "Bureau lumineux 4 places")]
    pub name: String,
    pub description: String,
    #[schema(example = "8.00")]
    pub hourly_price: Decimal,
    #[schema(example = "images/bureau.jpg")]
    pub image_path: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub available_until: Option<NaiveDate>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub legacy_availability: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Janela de disponibilidade, se configurada.
    pub fn availability_window(&self) -> Option<AvailabilityWindow> {
        match (self.available_from, self.available_until) {
            (Some(start), Some(end)) => AvailabilityWindow::new(start, end),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub categories: Vec<Category>,
}

// ---
// Payloads
// ---

fn validate_positive_price(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Le prix doit être supérieur à 0.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 255, message = "Le nom de la catégorie est obligatoire."))]
    #[schema(example = "Salles de réunion")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 255, message = "Le nom est obligatoire."))]
    #[schema(example = "Bureau lumineux 4 places")]
    pub nom: String,

    #[validate(length(min = 1, message = "La description est obligatoire."))]
    pub description: String,

    #[validate(custom(function = "validate_positive_price"))]
    #[schema(example = "8.00")]
    pub prix: Decimal,

    // Caminho/URL da imagem já enviada; o upload em si fica fora deste serviço
    pub image: Option<String>,

    #[validate(length(min = 1, message = "Sélectionnez au moins une catégorie."))]
    pub categories: Vec<Uuid>,

    #[schema(example = "2025-04-01")]
    pub date_debut: NaiveDate,

    #[schema(example = "2025-06-30")]
    pub date_fin: NaiveDate,
}

impl CreateProductPayload {
    pub fn validate_window(&self) -> Result<AvailabilityWindow, ValidationError> {
        AvailabilityWindow::new(self.date_debut, self.date_fin).ok_or_else(window_error)
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 255, message = "Le nom est obligatoire."))]
    pub nom: Option<String>,

    #[validate(length(min = 1, message = "La description est obligatoire."))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_positive_price"))]
    pub prix: Option<Decimal>,

    pub image: Option<String>,

    pub categories: Option<Vec<Uuid>>,

    pub date_debut: Option<NaiveDate>,

    pub date_fin: Option<NaiveDate>,
}

impl UpdateProductPayload {
    /// A janela só muda quando as duas datas vêm juntas.
    pub fn validate_window(&self) -> Result<Option<AvailabilityWindow>, ValidationError> {
        match (self.date_debut, self.date_fin) {
            (Some(start), Some(end)) => AvailabilityWindow::new(start, end)
                .map(Some)
                .ok_or_else(window_error),
            _ => Ok(None),
        }
    }
}

fn window_error() -> ValidationError {
    let mut err = ValidationError::new("after_or_equal");
    err.message = Some("La date de fin doit être postérieure ou égale à la date de début.".into());
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn create_payload_rejects_reversed_window() {
        let payload = CreateProductPayload {
            nom: "Open space".into(),
            description: "Calme".into(),
            prix: Decimal::new(800, 2),
            image: None,
            categories: vec![Uuid::new_v4()],
            date_debut: date("2025-06-30"),
            date_fin: date("2025-04-01"),
        };
        assert!(payload.validate().is_ok());
        assert_eq!(payload.validate_window().unwrap_err().code, "after_or_equal");
    }

    #[test]
    fn create_payload_rejects_zero_price() {
        let payload = CreateProductPayload {
            nom: "Open space".into(),
            description: "Calme".into(),
            prix: Decimal::ZERO,
            image: None,
            categories: vec![Uuid::new_v4()],
            date_debut: date("2025-04-01"),
            date_fin: date("2025-04-01"),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("prix"));
    }

    #[test]
    fn update_payload_ignores_half_window() {
        let payload = UpdateProductPayload {
            nom: None,
            description: None,
            prix: None,
            image: None,
            categories: None,
            date_debut: Some(date("2025-04-01")),
            date_fin: None,
        };
        assert_eq!(payload.validate_window().unwrap(), None);
    }
}
