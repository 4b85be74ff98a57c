use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

use crate::models::barber::{Barber, Service};

/// Candidate booking window: `[start_at, end_at)` in absolute time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
}

/// Occupied interval loaded from appointments or overrides.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimeRange {
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
}

/// Anchors a wall-clock time on a calendar day in the barber's fixed offset.
pub fn to_instant(date: Date, time: Time, offset: UtcOffset) -> OffsetDateTime {
    date.with_time(time).assume_offset(offset)
}

/// Half-open overlap of `[a_start, a_end)` and `[b_start, b_end)`.
/// Intervals that merely touch at an endpoint do not overlap.
pub fn intervals_overlap(
    a_start: OffsetDateTime,
    a_end: OffsetDateTime,
    b_start: OffsetDateTime,
    b_end: OffsetDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Full candidate grid for one barber, service and calendar day.
///
/// Walks forward from opening time in `slot_minutes` steps and emits every
/// start whose service-occupied interval still ends by closing time. A
/// service that cannot finish within the day yields no slots at all; slots
/// never span midnight.
pub fn generate_slots(barber: &Barber, service: &Service, date: Date) -> Vec<Slot> {
    if barber.slot_minutes <= 0 || service.duration_minutes <= 0 {
        return Vec::new();
    }
    let offset = barber.utc_offset();
    let open = to_instant(date, barber.open_time, offset);
    let close = to_instant(date, barber.close_time, offset);
    let step = Duration::minutes(i64::from(barber.slot_minutes));
    let duration = Duration::minutes(i64::from(service.duration_minutes));

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor + duration <= close {
        slots.push(Slot {
            start_at: cursor,
            end_at: cursor + duration,
        });
        cursor += step;
    }
    slots
}

/// Drops every slot whose interval overlaps any blocking interval.
///
/// Applied once with booked appointment ranges and once with closed
/// override ranges; the order of the two passes does not matter.
pub fn remove_blocked(slots: Vec<Slot>, blocked: &[TimeRange]) -> Vec<Slot> {
    slots
        .into_iter()
        .filter(|slot| {
            !blocked
                .iter()
                .any(|b| intervals_overlap(slot.start_at, slot.end_at, b.start_at, b.end_at))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    fn barber(open: Time, close: Time, slot_minutes: i32, utc_offset_minutes: i32) -> Barber {
        Barber {
            id: uuid::Uuid::new_v4(),
            slug: "test-barber".to_string(),
            name: "Test Barber".to_string(),
            open_time: open,
            close_time: close,
            slot_minutes,
            utc_offset_minutes,
            is_active: true,
            admin_secret: "secret".to_string(),
            created_at: datetime!(2026-01-01 00:00 UTC),
            updated_at: datetime!(2026-01-01 00:00 UTC),
        }
    }

    fn service(duration_minutes: i32, owner: &Barber) -> Service {
        Service {
            id: uuid::Uuid::new_v4(),
            barber_id: owner.id,
            name: "Cut".to_string(),
            duration_minutes,
            price_cents: Some(30_000),
            created_at: datetime!(2026-01-01 00:00 UTC),
        }
    }

    fn range(start_at: OffsetDateTime, end_at: OffsetDateTime) -> TimeRange {
        TimeRange { start_at, end_at }
    }

    #[test]
    fn instant_applies_fixed_offset() {
        let at = to_instant(
            date!(2026 - 07 - 15),
            time!(9:00),
            UtcOffset::from_whole_seconds(3 * 3600).unwrap(),
        );
        assert_eq!(at, datetime!(2026-07-15 9:00 +3));
        assert_eq!(at, datetime!(2026-07-15 6:00 UTC));
    }

    #[test]
    fn overlap_is_half_open() {
        let a = datetime!(2026-07-15 10:00 UTC);
        let b = datetime!(2026-07-15 10:30 UTC);
        let c = datetime!(2026-07-15 11:00 UTC);
        let d = datetime!(2026-07-15 11:30 UTC);

        // Touching endpoints only.
        assert!(!intervals_overlap(a, b, b, c));
        assert!(!intervals_overlap(b, c, a, b));
        // Partial, containing and identical intervals.
        assert!(intervals_overlap(a, c, b, d));
        assert!(intervals_overlap(a, d, b, c));
        assert!(intervals_overlap(a, b, a, b));
        // Disjoint.
        assert!(!intervals_overlap(a, b, c, d));
    }

    #[test]
    fn grid_steps_by_granularity_and_ends_by_close() {
        // Open 09:00-18:00, 30-minute grid, 45-minute service: the latest
        // start that still finishes by close is 17:15, and the latest grid
        // point at or before it is 17:00.
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(45, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));

        assert_eq!(slots.len(), 17);
        assert_eq!(slots[0].start_at, datetime!(2026-07-15 9:00 UTC));
        assert_eq!(slots[0].end_at, datetime!(2026-07-15 9:45 UTC));
        assert_eq!(slots.last().unwrap().start_at, datetime!(2026-07-15 17:00 UTC));

        let latest_start = datetime!(2026-07-15 17:15 UTC);
        assert!(slots.iter().all(|s| s.start_at <= latest_start));
        assert!(slots.iter().all(|s| s.end_at <= datetime!(2026-07-15 18:00 UTC)));
        assert!(!slots
            .iter()
            .any(|s| s.start_at == datetime!(2026-07-15 17:30 UTC)));
        assert!(slots.windows(2).all(|w| w[0].start_at < w[1].start_at));
    }

    #[test]
    fn service_exactly_filling_the_day_gets_one_slot() {
        let barber = barber(time!(9:00), time!(10:00), 30, 0);
        let service = service(60, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_at, datetime!(2026-07-15 9:00 UTC));
        assert_eq!(slots[0].end_at, datetime!(2026-07-15 10:00 UTC));
    }

    #[test]
    fn service_longer_than_the_day_gets_no_slots() {
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(10 * 60, &barber);
        assert!(generate_slots(&barber, &service, date!(2026 - 07 - 15)).is_empty());
    }

    #[test]
    fn nonpositive_granularity_gets_no_slots() {
        let b = barber(time!(9:00), time!(18:00), 0, 0);
        let s = service(30, &b);
        assert!(generate_slots(&b, &s, date!(2026 - 07 - 15)).is_empty());
    }

    #[test]
    fn slots_honor_the_barber_offset() {
        let barber = barber(time!(9:00), time!(10:00), 30, 180);
        let service = service(30, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        assert_eq!(slots[0].start_at, datetime!(2026-07-15 6:00 UTC));
    }

    #[test]
    fn booked_interval_blocks_only_overlapping_slots() {
        // One 10:00-10:30 booking, 30-minute service: 10:00 disappears,
        // the adjacent 09:30 and 10:30 stay.
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(30, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        let booked = vec![range(
            datetime!(2026-07-15 10:00 UTC),
            datetime!(2026-07-15 10:30 UTC),
        )];

        let open = remove_blocked(slots, &booked);
        let starts: Vec<_> = open.iter().map(|s| s.start_at).collect();
        assert!(!starts.contains(&datetime!(2026-07-15 10:00 UTC)));
        assert!(starts.contains(&datetime!(2026-07-15 9:30 UTC)));
        assert!(starts.contains(&datetime!(2026-07-15 10:30 UTC)));
    }

    #[test]
    fn longer_service_is_blocked_when_its_tail_overlaps() {
        // 45-minute service starting 09:45 runs into a 10:00 booking.
        let barber = barber(time!(9:00), time!(18:00), 15, 0);
        let service = service(45, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        let booked = vec![range(
            datetime!(2026-07-15 10:00 UTC),
            datetime!(2026-07-15 10:30 UTC),
        )];

        let open = remove_blocked(slots, &booked);
        let starts: Vec<_> = open.iter().map(|s| s.start_at).collect();
        assert!(!starts.contains(&datetime!(2026-07-15 9:45 UTC)));
        assert!(!starts.contains(&datetime!(2026-07-15 9:30 UTC)));
        assert!(starts.contains(&datetime!(2026-07-15 9:15 UTC)));
        assert!(starts.contains(&datetime!(2026-07-15 10:30 UTC)));
    }

    #[test]
    fn closure_removes_every_intersecting_slot() {
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(30, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        let closed = vec![range(
            datetime!(2026-07-15 12:00 UTC),
            datetime!(2026-07-15 13:00 UTC),
        )];

        let open = remove_blocked(slots, &closed);
        let starts: Vec<_> = open.iter().map(|s| s.start_at).collect();
        assert!(!starts.contains(&datetime!(2026-07-15 12:00 UTC)));
        assert!(!starts.contains(&datetime!(2026-07-15 12:30 UTC)));
        // Ends exactly at the closure start, so it survives.
        assert!(starts.contains(&datetime!(2026-07-15 11:30 UTC)));
        assert!(starts.contains(&datetime!(2026-07-15 13:00 UTC)));
    }

    #[test]
    fn filter_passes_commute() {
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(30, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        let booked = vec![range(
            datetime!(2026-07-15 10:00 UTC),
            datetime!(2026-07-15 10:30 UTC),
        )];
        let closed = vec![range(
            datetime!(2026-07-15 12:00 UTC),
            datetime!(2026-07-15 13:00 UTC),
        )];

        let a = remove_blocked(remove_blocked(slots.clone(), &booked), &closed);
        let b = remove_blocked(remove_blocked(slots, &closed), &booked);
        assert_eq!(a, b);
    }

    #[test]
    fn filtering_is_idempotent() {
        let barber = barber(time!(9:00), time!(18:00), 30, 0);
        let service = service(30, &barber);
        let slots = generate_slots(&barber, &service, date!(2026 - 07 - 15));
        let booked = vec![range(
            datetime!(2026-07-15 10:00 UTC),
            datetime!(2026-07-15 11:00 UTC),
        )];

        let once = remove_blocked(slots, &booked);
        let twice = remove_blocked(once.clone(), &booked);
        assert_eq!(once, twice);
    }
}
