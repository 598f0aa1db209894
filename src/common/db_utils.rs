// src/common/db_utils.rs

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::error::AppError;

// SQLSTATE
const EXCLUSION_VIOLATION: &str = "23P01";
const UNIQUE_VIOLATION: &str = "23505";

// ---
// Locks consultivos por (produto, data)
// ---
/// Serializa escritores concorrentes sobre o mesmo produto/dia.
///
/// Os locks valem até o fim da transação (`pg_advisory_xact_lock`) e são
/// adquiridos em ordem crescente e sem repetição, então duas transações
/// nunca se esperam em ciclo.
pub(crate) async fn lock_slots(
    conn: &mut PgConnection,
    keys: impl IntoIterator<Item = (Uuid, NaiveDate)>,
) -> Result<(), AppError> {
    let ordered: BTreeSet<(Uuid, NaiveDate)> = keys.into_iter().collect();

    for (product_id, date) in ordered {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(slot_lock_key(product_id, date))
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

fn slot_lock_key(product_id: Uuid, date: NaiveDate) -> String {
    format!("product:{product_id}:{date}")
}

/// A constraint de exclusão `reservation_lines_no_overlap` recusou a linha.
pub(crate) fn is_exclusion_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION))
}

/// Violação de UNIQUE na constraint informada.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION) && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}
