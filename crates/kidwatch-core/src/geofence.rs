//! Geofence transition detection

use chrono::{DateTime, Datelike, Local};
use kidwatch_api::{Coordinate, Geofence, GeofenceStatus, TransitionDirection, TransitionEvent};
use kidwatch_util::WallClock;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Whether a zone's schedule covers `now`. Active hours include both ends.
pub fn is_zone_active(zone: &Geofence, now: &DateTime<Local>) -> bool {
    let day_ok = zone.active_days.is_empty() || zone.active_days.contains(now.weekday());
    let hours_ok = zone
        .active_hours
        .is_none_or(|hours| hours.contains_inclusive(WallClock::of(now)));
    day_ok && hours_ok
}

/// Result of running the detector over a child's zones
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceOutcome {
    /// Every input zone, in order, with `last_status` updated
    pub updated_zones: Vec<Geofence>,
    /// One event per zone whose known status flipped
    pub events: Vec<TransitionEvent>,
}

/// Classify a reported point against each zone and report boundary crossings.
///
/// A zone whose previous status is `Unknown` only gets a baseline; no event
/// fires until a second evaluation disagrees with it. Zones outside their
/// schedule reset to `Unknown`. Disabled zones pass through untouched.
pub fn detect_transitions(
    zones: &[Geofence],
    point: Coordinate,
    now: DateTime<Local>,
) -> GeofenceOutcome {
    let mut updated_zones = Vec::with_capacity(zones.len());
    let mut events = Vec::new();

    for zone in zones {
        let mut zone = zone.clone();
        if !zone.enabled {
            updated_zones.push(zone);
            continue;
        }

        let previous = zone.last_status;
        let current = if !is_zone_active(&zone, &now) {
            GeofenceStatus::Unknown
        } else if haversine_distance(zone.center, point) <= zone.radius_meters {
            GeofenceStatus::Inside
        } else {
            GeofenceStatus::Outside
        };

        if previous != GeofenceStatus::Unknown
            && current != GeofenceStatus::Unknown
            && previous != current
        {
            events.push(TransitionEvent {
                zone_name: zone.name.clone(),
                direction: TransitionDirection::from_status(current),
                timestamp: now,
            });
        }

        zone.last_status = current;
        updated_zones.push(zone);
    }

    GeofenceOutcome {
        updated_zones,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kidwatch_util::{DaysOfWeek, TimeWindow};

    const SCHOOL: Coordinate = Coordinate {
        latitude: 40.7128,
        longitude: -74.0060,
    };

    /// About 1.1 km north of the school
    const PARK: Coordinate = Coordinate {
        latitude: 40.7228,
        longitude: -74.0060,
    };

    fn zone(status: GeofenceStatus) -> Geofence {
        let mut zone = Geofence::new("School", SCHOOL);
        zone.last_status = status;
        zone
    }

    fn monday_at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 12, 29, h, m, 0).unwrap()
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance(SCHOOL, SCHOOL), 0.0);
    }

    #[test]
    fn distance_matches_known_values() {
        // 0.01 degrees of latitude is roughly 1112 m
        let d = haversine_distance(SCHOOL, PARK);
        assert!((d - 1112.0).abs() < 5.0, "got {}", d);

        // New York to Los Angeles, roughly 3936 km
        let la = Coordinate::new(34.0522, -118.2437);
        let d = haversine_distance(SCHOOL, la) / 1000.0;
        assert!((d - 3936.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn distance_between_antipodes_is_half_circumference() {
        let d = haversine_distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - half).abs() < 1.0, "got {}", d);
        assert!(d.is_finite());
    }

    #[test]
    fn same_point_is_inside() {
        let outcome = detect_transitions(&[zone(GeofenceStatus::Unknown)], SCHOOL, monday_at(9, 0));
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Inside);
    }

    #[test]
    fn first_evaluation_never_emits() {
        let outcome = detect_transitions(&[zone(GeofenceStatus::Unknown)], PARK, monday_at(9, 0));
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Outside);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn inside_to_inside_is_quiet() {
        let outcome = detect_transitions(&[zone(GeofenceStatus::Inside)], SCHOOL, monday_at(9, 0));
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn leaving_emits_left() {
        let now = monday_at(15, 5);
        let outcome = detect_transitions(&[zone(GeofenceStatus::Inside)], PARK, now);

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.zone_name, "School");
        assert_eq!(event.direction, TransitionDirection::Left);
        assert_eq!(event.timestamp, now);
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Outside);
    }

    #[test]
    fn entering_emits_entered() {
        let outcome = detect_transitions(&[zone(GeofenceStatus::Outside)], SCHOOL, monday_at(8, 0));
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].direction, TransitionDirection::Entered);
    }

    #[test]
    fn boundary_counts_as_inside() {
        let mut z = zone(GeofenceStatus::Outside);
        z.radius_meters = haversine_distance(SCHOOL, PARK);
        let outcome = detect_transitions(&[z], PARK, monday_at(8, 0));
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Inside);
    }

    #[test]
    fn outside_active_window_resets_to_unknown() {
        let mut z = zone(GeofenceStatus::Inside);
        z.active_hours = Some(TimeWindow::new(
            WallClock::new(7, 30).unwrap(),
            WallClock::new(16, 0).unwrap(),
        ));

        let outcome = detect_transitions(&[z.clone()], PARK, monday_at(18, 0));
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Unknown);
        assert!(outcome.events.is_empty());

        // The end minute is still active
        let outcome = detect_transitions(&[z], PARK, monday_at(16, 0));
        assert_eq!(outcome.events.len(), 1);
    }

    #[test]
    fn active_days_filter() {
        let mut z = zone(GeofenceStatus::Inside);
        z.active_days = DaysOfWeek::WEEKENDS;

        let outcome = detect_transitions(&[z], PARK, monday_at(12, 0));
        assert_eq!(outcome.updated_zones[0].last_status, GeofenceStatus::Unknown);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn overnight_active_hours() {
        let mut z = zone(GeofenceStatus::Unknown);
        z.active_hours = Some(TimeWindow::new(
            WallClock::new(20, 0).unwrap(),
            WallClock::new(7, 0).unwrap(),
        ));

        assert!(is_zone_active(&z, &monday_at(23, 0)));
        assert!(is_zone_active(&z, &monday_at(7, 0)));
        assert!(!is_zone_active(&z, &monday_at(12, 0)));
    }

    #[test]
    fn disabled_zone_passes_through() {
        let mut z = zone(GeofenceStatus::Inside);
        z.enabled = false;

        let outcome = detect_transitions(&[z.clone()], PARK, monday_at(9, 0));
        assert_eq!(outcome.updated_zones, vec![z]);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn zones_evaluated_independently() {
        let mut home = Geofence::new("Home", PARK);
        home.last_status = GeofenceStatus::Outside;
        let zones = vec![zone(GeofenceStatus::Inside), home];

        let outcome = detect_transitions(&zones, PARK, monday_at(15, 30));
        let directions: Vec<_> = outcome
            .events
            .iter()
            .map(|e| (e.zone_name.as_str(), e.direction))
            .collect();
        assert_eq!(
            directions,
            vec![
                ("School", TransitionDirection::Left),
                ("Home", TransitionDirection::Entered)
            ]
        );
    }
}
