//! Daily screen-time limit resolution

use chrono::{Datelike, NaiveDate};
use kidwatch_api::ChildProfile;
use kidwatch_util::is_weekend;

/// Limit in minutes that applies on `date`.
///
/// Saturday and Sunday use the weekend limit, other days the weekday limit.
/// When the day-specific limit is unset the generic daily limit applies.
pub fn resolve_daily_limit(profile: &ChildProfile, date: NaiveDate) -> u32 {
    let specific = if is_weekend(date.weekday()) {
        profile.weekend_screen_time_limit
    } else {
        profile.weekday_screen_time_limit
    };
    specific.unwrap_or(profile.daily_screen_time_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kidwatch_util::{ChildId, ParentId};

    fn profile() -> ChildProfile {
        ChildProfile::new(ChildId::new("alex"), ParentId::new("parent-1"), "Alex")
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 29).unwrap()
    }

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 27).unwrap()
    }

    #[test]
    fn generic_limit_when_nothing_specific() {
        let mut p = profile();
        p.daily_screen_time_limit = 90;
        assert_eq!(resolve_daily_limit(&p, monday()), 90);
        assert_eq!(resolve_daily_limit(&p, saturday()), 90);
    }

    #[test]
    fn day_specific_limit_wins() {
        let mut p = profile();
        p.daily_screen_time_limit = 90;
        p.weekday_screen_time_limit = Some(60);
        p.weekend_screen_time_limit = Some(180);

        assert_eq!(resolve_daily_limit(&p, monday()), 60);
        assert_eq!(resolve_daily_limit(&p, saturday()), 180);
        assert_eq!(resolve_daily_limit(&p, saturday().succ_opt().unwrap()), 180);
    }

    #[test]
    fn weekend_only_override_leaves_weekdays_generic() {
        let mut p = profile();
        p.weekend_screen_time_limit = Some(240);
        assert_eq!(resolve_daily_limit(&p, monday()), p.daily_screen_time_limit);
    }
}
