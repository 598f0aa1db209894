// src/services/availability.rs
//
// Regras puras de disponibilidade. Nada aqui toca o banco: o serviço de reservas
// busca as linhas persistidas (sob lock) e delega a decisão a estas funções.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::models::booking::{ReservationLine, ReservationLineInput};
use crate::models::catalog::Product;

// ---
// Janela de disponibilidade (intervalo de datas inclusivo)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailabilityWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl AvailabilityWindow {
    /// `None` quando start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusivo nas duas pontas.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Parser tolerante da string composta herdada. Usado apenas no backfill de boot.
    ///
    /// Formatos aceitos:
    /// - `início-fim` sem espaços, cada lado em `YYYY-MM-DD`, `DD/MM/YYYY` ou
    ///   `YYYY/MM/DD` (formatos podem se misturar)
    /// - `início - fim` / `início au fim` / `início to fim`
    ///
    /// Datas invertidas são trocadas. Qualquer outra coisa devolve `None`.
    pub fn parse_legacy(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let (start, end) = split_legacy(raw)?;
        if start <= end {
            Some(Self { start, end })
        } else {
            Some(Self { start: end, end: start })
        }
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

fn split_legacy(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
    for separator in [" - ", " au ", " to "] {
        if let Some((start, end)) = raw.split_once(separator) {
            return Some((parse_legacy_date(start)?, parse_legacy_date(end)?));
        }
    }

    // Sem espaços: o hífen separador é o que deixa duas datas válidas
    raw.match_indices('-')
        .find_map(|(i, _)| Some((parse_legacy_date(&raw[..i])?, parse_legacy_date(&raw[i + 1..])?)))
}

fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw.trim(), format).ok())
}

// ---
// Faixa horária semiaberta [início, fim)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// `None` se o fim não for estritamente depois do início.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// [s1,e1) e [s2,e2) se sobrepõem sse s1 < e2 e s2 < e1.
pub fn overlaps(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    s1 < e2 && s2 < e1
}

// ---
// Verificador
// ---

/// Motivo pelo qual uma linha não pode ser reservada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailability {
    OutsideWindow,
    AlreadyReserved,
    ConflictsWithRequest,
}

impl Unavailability {
    pub fn message_key(self) -> &'static str {
        match self {
            Unavailability::OutsideWindow => "booking.outside_window",
            Unavailability::AlreadyReserved => "booking.already_reserved",
            Unavailability::ConflictsWithRequest => "booking.conflicts_with_request",
        }
    }
}

/// Linha recusada: índice no pedido, produto e motivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRejection {
    pub index: usize,
    pub product_id: Uuid,
    pub product_name: String,
    pub reason: Unavailability,
}

/// Produto sem janela configurada nunca é reservável.
pub fn is_within_availability_window(product: &Product, date: NaiveDate) -> bool {
    product
        .availability_window()
        .is_some_and(|window| window.contains(date))
}

/// Nenhuma linha persistida do mesmo produto/data sobrepõe o slot.
pub fn is_slot_free(booked: &[ReservationLine], product_id: Uuid, date: NaiveDate, slot: &TimeSlot) -> bool {
    !booked.iter().any(|line| {
        line.product_id == product_id
            && line.reservation_date == date
            && overlaps(line.start_time, line.end_time, slot.start, slot.end)
    })
}

pub fn check_line(
    product: &Product,
    line: &ReservationLineInput,
    booked: &[ReservationLine],
) -> Result<(), Unavailability> {
    if !is_within_availability_window(product, line.date) {
        return Err(Unavailability::OutsideWindow);
    }
    if !is_slot_free(booked, line.product_id, line.date, &line.slot) {
        return Err(Unavailability::AlreadyReserved);
    }
    Ok(())
}

/// Avalia todas as linhas, na ordem do pedido, contra o estado persistido.
///
/// - `booked`: linhas já gravadas nos pares (produto, data) do pedido.
/// - `exclude`: reserva em edição; suas próprias linhas não contam como conflito.
/// - Linhas irmãs do mesmo pedido também não podem se sobrepor.
///
/// A primeira linha recusada interrompe tudo.
pub fn check_request<'p>(
    lines: &[ReservationLineInput],
    product_of: impl Fn(Uuid) -> Option<&'p Product>,
    booked: &[ReservationLine],
    exclude: Option<Uuid>,
) -> Result<(), LineRejection> {
    let persisted: Vec<ReservationLine> = booked
        .iter()
        .filter(|line| Some(line.reservation_id) != exclude)
        .cloned()
        .collect();

    for (index, line) in lines.iter().enumerate() {
        let Some(product) = product_of(line.product_id) else {
            // Produto inexistente é tratado antes (NotFound); aqui só por segurança de tipos.
            return Err(LineRejection {
                index,
                product_id: line.product_id,
                product_name: line.product_id.to_string(),
                reason: Unavailability::OutsideWindow,
            });
        };

        let reject = |reason| LineRejection {
            index,
            product_id: product.id,
            product_name: product.name.clone(),
            reason,
        };

        check_line(product, line, &persisted).map_err(reject)?;

        let clashes_with_sibling = lines[..index].iter().any(|earlier| {
            earlier.product_id == line.product_id
                && earlier.date == line.date
                && earlier.slot.overlaps(&line.slot)
        });
        if clashes_with_sibling {
            return Err(reject(Unavailability::ConflictsWithRequest));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(s: (u32, u32), e: (u32, u32)) -> TimeSlot {
        TimeSlot::new(time(s.0, s.1), time(e.0, e.1)).unwrap()
    }

    fn product(name: &str, window: Option<(&str, &str)>) -> Product {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        Product {
            id: Uuid::new_v4(),
            owner_id: None,
            name: name.into(),
            description: "Espace de travail".into(),
            hourly_price: Decimal::new(800, 2),
            image_path: None,
            available_from: window.map(|(s, _)| date(s)),
            available_until: window.map(|(_, e)| date(e)),
            legacy_availability: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn input(product: &Product, d: &str, s: TimeSlot) -> ReservationLineInput {
        ReservationLineInput { product_id: product.id, date: date(d), slot: s }
    }

    fn commit(reservation_id: Uuid, line: &ReservationLineInput) -> ReservationLine {
        ReservationLine {
            id: Uuid::new_v4(),
            reservation_id,
            product_id: line.product_id,
            reservation_date: line.date,
            start_time: line.slot.start(),
            end_time: line.slot.end(),
        }
    }

    // --- Janela ---

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let w = AvailabilityWindow::new(date("2025-04-01"), date("2025-06-30")).unwrap();
        assert!(w.contains(date("2025-04-01")));
        assert!(w.contains(date("2025-06-30")));
        assert!(!w.contains(date("2025-03-31")));
        assert!(!w.contains(date("2025-07-01")));
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(AvailabilityWindow::new(date("2025-06-30"), date("2025-04-01")).is_none());
    }

    #[test]
    fn product_without_window_is_never_bookable() {
        let p = product("Sans dates", None);
        assert!(!is_within_availability_window(&p, date("2025-05-01")));
    }

    #[test]
    fn legacy_six_token_form() {
        let w = AvailabilityWindow::parse_legacy("2025-04-01-2025-06-30").unwrap();
        assert_eq!(w.start(), date("2025-04-01"));
        assert_eq!(w.end(), date("2025-06-30"));
    }

    #[test]
    fn legacy_two_token_french_form() {
        let w = AvailabilityWindow::parse_legacy("01/04/2025-30/06/2025").unwrap();
        assert_eq!(w.start(), date("2025-04-01"));
        assert_eq!(w.end(), date("2025-06-30"));
    }

    #[test]
    fn legacy_unspaced_mixed_formats() {
        let w = AvailabilityWindow::parse_legacy("2025-04-01-30/06/2025").unwrap();
        assert_eq!(w.start(), date("2025-04-01"));
        assert_eq!(w.end(), date("2025-06-30"));

        let w = AvailabilityWindow::parse_legacy("01/04/2025-2025-06-30").unwrap();
        assert_eq!(w.start(), date("2025-04-01"));
        assert_eq!(w.end(), date("2025-06-30"));
    }

    #[test]
    fn legacy_spaced_separator_with_iso_sides() {
        let w = AvailabilityWindow::parse_legacy("2025-04-01 - 2025-06-30").unwrap();
        assert_eq!(w.end(), date("2025-06-30"));
    }

    #[test]
    fn legacy_reversed_dates_are_swapped() {
        let w = AvailabilityWindow::parse_legacy("2025-06-30-2025-04-01").unwrap();
        assert_eq!(w.start(), date("2025-04-01"));
    }

    #[test]
    fn legacy_malformed_input_yields_none() {
        for raw in ["", "   ", "2025-04-01", "n/a-n/a", "2025-04-01-2025-06", "31/02/2025-01/03/2025", "a-b-c", "2025-04-01-30/06"] {
            assert!(AvailabilityWindow::parse_legacy(raw).is_none(), "{raw:?}");
        }
    }

    // --- Sobreposição ---

    #[test]
    fn overlap_is_symmetric_and_reflexive() {
        let cases = [
            (slot((9, 0), (11, 0)), slot((10, 0), (12, 0))),
            (slot((9, 0), (11, 0)), slot((11, 0), (12, 0))),
            (slot((9, 0), (12, 0)), slot((10, 0), (10, 30))),
            (slot((8, 0), (9, 0)), slot((13, 0), (14, 0))),
        ];
        for (a, b) in cases {
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
            assert!(a.overlaps(&a));
            assert!(b.overlaps(&b));
        }
    }

    #[test]
    fn abutting_slots_do_not_overlap() {
        assert!(!slot((9, 0), (11, 0)).overlaps(&slot((11, 0), (12, 0))));
    }

    #[test]
    fn empty_or_inverted_slot_is_rejected() {
        assert!(TimeSlot::new(time(11, 0), time(11, 0)).is_none());
        assert!(TimeSlot::new(time(12, 0), time(11, 0)).is_none());
    }

    // --- Cenários de reserva ---

    #[test]
    fn booking_scenarios_on_a_single_product() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let mut booked = Vec::new();
        let lookup = |id: Uuid| (id == x.id).then_some(&x);

        // 1. 09:00–11:00 livre
        let first = input(&x, "2025-05-01", slot((9, 0), (11, 0)));
        assert!(check_request(&[first], lookup, &booked, None).is_ok());
        booked.push(commit(Uuid::new_v4(), &first));

        // 2. 10:00–12:00 sobrepõe
        let second = input(&x, "2025-05-01", slot((10, 0), (12, 0)));
        let err = check_request(&[second], lookup, &booked, None).unwrap_err();
        assert_eq!(err.reason, Unavailability::AlreadyReserved);
        assert_eq!(err.product_name, "Bureau X");

        // 3. 11:00–12:00 encosta, não sobrepõe
        let third = input(&x, "2025-05-01", slot((11, 0), (12, 0)));
        assert!(check_request(&[third], lookup, &booked, None).is_ok());

        // 4. fora da janela
        let fourth = input(&x, "2025-07-01", slot((9, 0), (10, 0)));
        let err = check_request(&[fourth], lookup, &booked, None).unwrap_err();
        assert_eq!(err.reason, Unavailability::OutsideWindow);
    }

    #[test]
    fn first_failing_line_is_reported_with_its_index() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let booked = vec![commit(Uuid::new_v4(), &input(&x, "2025-05-01", slot((9, 0), (11, 0))))];
        let lookup = |id: Uuid| (id == x.id).then_some(&x);

        let lines = [
            input(&x, "2025-05-02", slot((9, 0), (11, 0))),
            input(&x, "2025-05-01", slot((10, 0), (12, 0))),
        ];
        let err = check_request(&lines, lookup, &booked, None).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.product_id, x.id);
    }

    #[test]
    fn sibling_lines_may_not_overlap() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let lookup = |id: Uuid| (id == x.id).then_some(&x);
        let lines = [
            input(&x, "2025-05-01", slot((9, 0), (11, 0))),
            input(&x, "2025-05-01", slot((10, 30), (12, 0))),
        ];
        let err = check_request(&lines, lookup, &[], None).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.reason, Unavailability::ConflictsWithRequest);
    }

    #[test]
    fn siblings_on_different_products_or_dates_are_independent() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let y = product("Salle Y", Some(("2025-04-01", "2025-06-30")));
        let products: HashMap<Uuid, &Product> = [(x.id, &x), (y.id, &y)].into_iter().collect();
        let lines = [
            input(&x, "2025-05-01", slot((9, 0), (11, 0))),
            input(&y, "2025-05-01", slot((9, 0), (11, 0))),
            input(&x, "2025-05-02", slot((9, 0), (11, 0))),
        ];
        assert!(check_request(&lines, |id| products.get(&id).copied(), &[], None).is_ok());
    }

    #[test]
    fn reservation_being_updated_does_not_conflict_with_itself() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let lookup = |id: Uuid| (id == x.id).then_some(&x);
        let own = Uuid::new_v4();
        let line = input(&x, "2025-05-01", slot((9, 0), (11, 0)));
        let booked = vec![commit(own, &line)];

        assert!(check_request(&[line], lookup, &booked, None).is_err());
        assert!(check_request(&[line], lookup, &booked, Some(own)).is_ok());
        // Outra reserva continua bloqueando
        assert!(check_request(&[line], lookup, &booked, Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn free_check_is_stable_without_writes() {
        let x = product("Bureau X", Some(("2025-04-01", "2025-06-30")));
        let booked = vec![commit(Uuid::new_v4(), &input(&x, "2025-05-01", slot((9, 0), (11, 0))))];
        let probe = slot((10, 0), (10, 30));
        let first = is_slot_free(&booked, x.id, date("2025-05-01"), &probe);
        let second = is_slot_free(&booked, x.id, date("2025-05-01"), &probe);
        assert_eq!(first, second);
        assert!(!first);
    }

    // Sequência pseudoaleatória de pedidos: o que for aceito nunca se sobrepõe.
    #[test]
    fn accepted_bookings_never_overlap() {
        let products = [
            product("A", Some(("2025-05-01", "2025-05-03"))),
            product("B", Some(("2025-05-01", "2025-05-03"))),
        ];
        let lookup = |id: Uuid| products.iter().find(|p| p.id == id);
        let dates = ["2025-05-01", "2025-05-02", "2025-05-03", "2025-05-04"];
        let mut booked: Vec<ReservationLine> = Vec::new();

        let mut seed: u64 = 0x5eed_cafe;
        let mut next = |bound: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        for _ in 0..400 {
            let line_count = 1 + next(3) as usize;
            let lines: Vec<ReservationLineInput> = (0..line_count)
                .map(|_| {
                    let p = &products[next(2) as usize];
                    let start = 8 * 2 + next(20) as u32; // meias horas entre 08:00 e 17:30
                    let len = 1 + next(6) as u32;
                    let s = time(start / 2, (start % 2) * 30);
                    let e = time((start + len) / 2, ((start + len) % 2) * 30);
                    input(p, dates[next(4) as usize], TimeSlot::new(s, e).unwrap())
                })
                .collect();

            let before = booked.len();
            if check_request(&lines, lookup, &booked, None).is_ok() {
                let reservation = Uuid::new_v4();
                booked.extend(lines.iter().map(|l| commit(reservation, l)));
            }
            assert!(booked.len() == before || booked.len() == before + line_count);
        }

        assert!(!booked.is_empty());
        for (i, a) in booked.iter().enumerate() {
            for b in &booked[i + 1..] {
                let same_slot_space = a.product_id == b.product_id && a.reservation_date == b.reservation_date;
                assert!(
                    !(same_slot_space && overlaps(a.start_time, a.end_time, b.start_time, b.end_time)),
                    "double booking: {a:?} / {b:?}"
                );
            }
        }
    }
}
