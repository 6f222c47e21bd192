use chrono::{NaiveDate, Utc};
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};

use crate::services::insertable::NewDailyCounter;
use crate::types::{format_order_number, CafeSlug, OrderError, MAX_ORDER_NUMBER};

/// Compare-and-set attempts against the daily counter before the allocator
/// reports abnormal contention.
pub const CAS_ATTEMPTS: usize = 50;

/// Order-row insert attempts across unique-constraint conflicts before
/// capacity is declared exhausted.
pub const INSERT_ATTEMPTS: usize = 20;

#[derive(Debug, Clone)]
pub struct ReservedNumber {
    pub date: NaiveDate,
    pub sequence: i32,
    pub order_number: String,
}

/// Wraps modulo 900 back to 1, never 0.
pub fn next_candidate(last_number: i32) -> i32 {
    (last_number.rem_euclid(MAX_ORDER_NUMBER)) + 1
}

/// Drives one CAS pass at a time until a pass lands. `Ok(Some(n))` means the
/// guarded update advanced the counter to sequence `n`; `Ok(None)` means
/// another writer moved it first and the pass runs again. Losing every pass
/// means the row is churning abnormally fast.
fn advance_until_won<F>(mut attempt_cas: F) -> Result<i32, OrderError>
where
    F: FnMut() -> Result<Option<i32>, OrderError>,
{
    for _ in 0..CAS_ATTEMPTS {
        if let Some(sequence) = attempt_cas()? {
            return Ok(sequence);
        }
    }

    Err(OrderError::Contention)
}

/// Reserves the next daily sequence number for a cafe by advancing its
/// counter row with an optimistic compare-and-set. The counter only
/// accelerates allocation; the unique constraint on
/// (cafe_slug, order_date, order_sequence) is the correctness backstop, so a
/// torn counter at worst costs a retry at the order insert.
pub fn reserve(conn: &mut PgConnection, cafe: CafeSlug) -> Result<ReservedNumber, OrderError> {
    use crate::schema::cafe_daily_counters::dsl::cafe_daily_counters;
    use crate::schema::cafe_daily_counters::{cafe_slug, counter_date, last_number};

    let today = Utc::now().date_naive();

    // Lazily create the day's counter row; racing creators both succeed.
    diesel::insert_into(cafe_daily_counters)
        .values(NewDailyCounter {
            cafe_slug: cafe.as_str().to_owned(),
            counter_date: today,
            last_number: 0,
        })
        .on_conflict((cafe_slug, counter_date))
        .do_nothing()
        .execute(conn)?;

    let sequence = advance_until_won(|| {
        let observed: i32 = cafe_daily_counters
            .filter(cafe_slug.eq(cafe.as_str()))
            .filter(counter_date.eq(today))
            .select(last_number)
            .first(conn)?;

        let candidate = next_candidate(observed);

        // The update only lands if the row still holds the observed value.
        let advanced = diesel::update(
            cafe_daily_counters
                .filter(cafe_slug.eq(cafe.as_str()))
                .filter(counter_date.eq(today))
                .filter(last_number.eq(observed)),
        )
        .set(last_number.eq(candidate))
        .execute(conn)?;

        Ok((advanced == 1).then_some(candidate))
    })?;

    Ok(ReservedNumber {
        date: today,
        sequence,
        order_number: format_order_number(sequence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_start_at_one_and_move_forward() {
        assert_eq!(next_candidate(0), 1);
        assert_eq!(next_candidate(1), 2);
        assert_eq!(next_candidate(41), 42);
    }

    #[test]
    fn candidates_wrap_after_the_daily_cap_and_never_hit_zero() {
        assert_eq!(next_candidate(899), 900);
        assert_eq!(next_candidate(900), 1);
        assert_eq!(next_candidate(1800), 1);
    }

    #[test]
    fn reserved_numbers_format_with_their_sequence() {
        for last in [0, 8, 899, 900] {
            let candidate = next_candidate(last);
            assert!((1..=MAX_ORDER_NUMBER).contains(&candidate));
            assert_eq!(format_order_number(candidate).parse::<i32>().ok(), Some(candidate));
        }
    }

    #[test]
    fn losing_every_cas_race_reports_contention() {
        let mut races = 0;
        let result = advance_until_won(|| {
            races += 1;
            Ok(None)
        });

        assert!(matches!(result, Err(OrderError::Contention)));
        assert_eq!(races, CAS_ATTEMPTS);
    }

    #[test]
    fn a_won_cas_race_stops_the_loop() {
        let mut races = 0;
        let result = advance_until_won(|| {
            races += 1;
            if races < 4 { Ok(None) } else { Ok(Some(17)) }
        });

        assert_eq!(result.unwrap(), 17);
        assert_eq!(races, 4);
    }

    #[test]
    fn counter_read_errors_surface_immediately() {
        let mut races = 0;
        let result = advance_until_won(|| {
            races += 1;
            Err(OrderError::Db(diesel::result::Error::NotFound))
        });

        assert!(matches!(result, Err(OrderError::Db(_))));
        assert_eq!(races, 1);
    }
}
