// src/models/booking.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::auth::UserSummary;
use crate::services::availability::TimeSlot;

// --- Linhas persistidas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "16.00")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Tabela pivô reserva <-> produto
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationLine {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "2025-05-01")]
    pub reservation_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
}

// --- Leitura completa ("commandes_complete") ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineDetail {
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(example = "8.00")]
    pub hourly_price: Decimal,
    pub reservation_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    #[schema(example = "16.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub client: Option<UserSummary>,
    pub lines: Vec<LineDetail>,
}

// --- Entrada do núcleo de reservas ---

/// Uma linha pedida: (produto, data, início, fim).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationLineInput {
    pub product_id: Uuid,
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

// ---
// Payloads HTTP (contrato em francês do SPA)
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationPayload {
    #[validate(length(min = 1, message = "Vous devez sélectionner au moins un produit."))]
    pub produits: Vec<Uuid>,

    #[validate(length(min = 1, message = "Vous devez sélectionner au moins une date."))]
    #[schema(example = json!(["2025-05-01"]))]
    pub dates: Vec<String>,

    #[validate(length(min = 1, message = "Vous devez sélectionner au moins une heure de début."))]
    #[schema(example = json!(["09:00"]))]
    pub heures_debut: Vec<String>,

    #[validate(length(min = 1, message = "Vous devez sélectionner au moins une heure de fin."))]
    #[schema(example = json!(["11:00"]))]
    pub heures_fin: Vec<String>,
}

impl CreateReservationPayload {
    /// Converte os quatro arrays paralelos em linhas tipadas.
    /// Todos os erros de formato são acumulados por campo.
    pub fn into_lines(self) -> Result<Vec<ReservationLineInput>, ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();
        let count = self.produits.len();
        if self.dates.len() != count
            || self.heures_debut.len() != count
            || self.heures_fin.len() != count
        {
            errors.add(
                "produits",
                field_error("length_mismatch", "Chaque produit doit avoir une date, une heure de début et une heure de fin."),
            );
            return Err(errors);
        }

        let mut lines = Vec::with_capacity(count);
        for i in 0..count {
            let date = parse_date(&self.dates[i]);
            let start = parse_time(&self.heures_debut[i]);
            let end = parse_time(&self.heures_fin[i]);

            if date.is_none() {
                errors.add("dates", field_error("date", "Les dates doivent être valides."));
            }
            if start.is_none() {
                errors.add("heures_debut", field_error("time", "Les heures de début doivent être valides."));
            }
            if end.is_none() {
                errors.add("heures_fin", field_error("time", "Les heures de fin doivent être valides."));
            }

            if let (Some(date), Some(start), Some(end)) = (date, start, end) {
                match TimeSlot::new(start, end) {
                    Some(slot) => lines.push(ReservationLineInput {
                        product_id: self.produits[i],
                        date,
                        slot,
                    }),
                    None => errors.add(
                        "heures_fin",
                        field_error("after", "L'heure de fin doit être postérieure à l'heure de début."),
                    ),
                }
            }
        }

        if errors.is_empty() { Ok(lines) } else { Err(errors) }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AvailabilityCheckPayload {
    pub produit_id: Uuid,
    #[schema(example = "2025-05-01")]
    pub date: String,
    #[schema(example = "10:00")]
    pub heure_debut: String,
    #[schema(example = "12:00")]
    pub heure_fin: String,
}

impl AvailabilityCheckPayload {
    pub fn into_line(self) -> Result<ReservationLineInput, ValidationErrors> {
        CreateReservationPayload {
            produits: vec![self.produit_id],
            dates: vec![self.date],
            heures_debut: vec![self.heure_debut],
            heures_fin: vec![self.heure_fin],
        }
        .into_lines()
        .map(|mut lines| lines.remove(0))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub disponible: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookedSlotsPayload {
    pub produit_id: Uuid,
    #[schema(example = "2025-05-01")]
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookedSlot {
    #[schema(value_type = String, example = "09:00:00")]
    pub heure_debut: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub heure_fin: NaiveTime,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Aceita "HH:MM" (input type=time) e "HH:MM:SS".
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(dates: &[&str], starts: &[&str], ends: &[&str]) -> CreateReservationPayload {
        CreateReservationPayload {
            produits: dates.iter().map(|_| Uuid::new_v4()).collect(),
            dates: dates.iter().map(|s| s.to_string()).collect(),
            heures_debut: starts.iter().map(|s| s.to_string()).collect(),
            heures_fin: ends.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn builds_typed_lines_in_request_order() {
        let p = payload(&["2025-05-01", "2025-05-02"], &["09:00", "13:00:00"], &["11:00", "14:30"]);
        let ids = p.produits.clone();
        let lines = p.into_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, ids[0]);
        assert_eq!(lines[1].slot.start(), NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert_eq!(lines[1].slot.end(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut p = payload(&["2025-05-01"], &["09:00"], &["11:00"]);
        p.heures_fin.push("12:00".into());
        let errors = p.into_lines().unwrap_err();
        assert!(errors.field_errors().contains_key("produits"));
    }

    #[test]
    fn rejects_empty_request() {
        let errors = payload(&[], &[], &[]).into_lines().unwrap_err();
        assert!(errors.field_errors().contains_key("produits"));
        assert!(errors.field_errors().contains_key("dates"));
    }

    #[test]
    fn reports_each_malformed_field() {
        let errors = payload(&["01/05/2025"], &["9h"], &["11:00"]).into_lines().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("dates"));
        assert!(fields.contains_key("heures_debut"));
        assert!(!fields.contains_key("heures_fin"));
    }

    #[test]
    fn rejects_end_not_after_start() {
        let errors = payload(&["2025-05-01"], &["11:00"], &["11:00"]).into_lines().unwrap_err();
        assert_eq!(errors.field_errors()["heures_fin"][0].code, "after");
    }

    #[test]
    fn availability_payload_yields_single_line() {
        let id = Uuid::new_v4();
        let line = AvailabilityCheckPayload {
            produit_id: id,
            date: "2025-05-01".into(),
            heure_debut: "10:00".into(),
            heure_fin: "12:00".into(),
        }
        .into_line()
        .unwrap();
        assert_eq!(line.product_id, id);
        assert_eq!(line.date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
    }
}
