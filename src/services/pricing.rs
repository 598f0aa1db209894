// src/services/pricing.rs

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::booking::ReservationLineInput;
use crate::services::availability::TimeSlot;

/// Duração da faixa em horas (fracionárias).
pub fn line_hours(slot: &TimeSlot) -> Decimal {
    Decimal::from(slot.minutes()) / Decimal::from(60)
}

/// preço/hora × horas, arredondado ao centavo.
pub fn line_amount(hourly_price: Decimal, slot: &TimeSlot) -> Decimal {
    (hourly_price * Decimal::from(slot.minutes()) / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Soma exata dos valores de cada linha.
///
/// Produto ausente do mapa é erro de consistência: as linhas já foram
/// validadas contra o catálogo antes de chegar aqui.
pub fn compute_total(
    lines: &[ReservationLineInput],
    prices: &HashMap<Uuid, Decimal>,
) -> Result<Decimal, AppError> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        let price = prices.get(&line.product_id).ok_or_else(|| {
            AppError::Consistency(format!("produto {} sem preço no cálculo do total", line.product_id))
        })?;
        Ok(total + line_amount(*price, &line.slot))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn slot(s: (u32, u32), e: (u32, u32)) -> TimeSlot {
        TimeSlot::new(
            NaiveTime::from_hms_opt(s.0, s.1, 0).unwrap(),
            NaiveTime::from_hms_opt(e.0, e.1, 0).unwrap(),
        )
        .unwrap()
    }

    fn line(product_id: Uuid, s: TimeSlot) -> ReservationLineInput {
        ReservationLineInput {
            product_id,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            slot: s,
        }
    }

    #[test]
    fn hours_are_fractional() {
        assert_eq!(line_hours(&slot((13, 0), (14, 30))), Decimal::new(15, 1));
        assert_eq!(line_hours(&slot((9, 0), (9, 20))).round_dp(4), Decimal::new(3333, 4));
    }

    #[test]
    fn two_hours_at_eight_is_sixteen() {
        let x = Uuid::new_v4();
        let prices = HashMap::from([(x, Decimal::new(800, 2))]);
        let total = compute_total(&[line(x, slot((9, 0), (11, 0)))], &prices).unwrap();
        assert_eq!(total, Decimal::new(1600, 2));
    }

    #[test]
    fn line_amount_rounds_half_away_from_zero() {
        // 10.05 × 0.5 = 5.025 → 5.03
        assert_eq!(line_amount(Decimal::new(1005, 2), &slot((9, 0), (9, 30))), Decimal::new(503, 2));
    }

    #[test]
    fn total_is_sum_of_lines() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let prices = HashMap::from([(x, Decimal::new(800, 2)), (y, Decimal::new(1250, 2))]);
        let a = line(x, slot((9, 0), (11, 0)));
        let b = line(y, slot((13, 0), (14, 30)));

        let sum = compute_total(&[a], &prices).unwrap() + compute_total(&[b], &prices).unwrap();
        assert_eq!(compute_total(&[a, b], &prices).unwrap(), sum);
        assert_eq!(sum, Decimal::new(3475, 2));
    }

    #[test]
    fn empty_request_costs_nothing() {
        assert_eq!(compute_total(&[], &HashMap::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn missing_product_is_a_consistency_error() {
        let err = compute_total(&[line(Uuid::new_v4(), slot((9, 0), (10, 0)))], &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }
}
