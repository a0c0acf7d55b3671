//! Unit tests for channel schedule matching and post formatting

use chrono::{FixedOffset, TimeZone, Utc};
use rstest::rstest;
use tierbot::models::ScheduleTime;
use tierbot::scheduler::format::format_post;

#[rstest]
#[case("00:00", true)]
#[case("09:05", true)]
#[case("23:59", true)]
#[case("24:00", false)]
#[case("24:60", false)]
#[case("12:60", false)]
#[case("7:30", false)]
#[case("07-30", false)]
#[case("", false)]
fn test_schedule_time_validation(#[case] input: &str, #[case] valid: bool) {
    assert_eq!(input.parse::<ScheduleTime>().is_ok(), valid);
}

#[test]
fn test_local_minute_matches_configured_time() {
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 7, 4, 14, 0, 59).unwrap();

    let current = ScheduleTime::of(&now.with_timezone(&offset));
    assert_eq!(current, "09:00".parse::<ScheduleTime>().unwrap());
    assert_ne!(current, "14:00".parse::<ScheduleTime>().unwrap());
}

#[test]
fn test_post_is_html_safe() {
    let post = format_post("<script>alert(1)</script>");
    assert!(post.starts_with("&lt;script&gt;"));
    assert!(post.ends_with("</i>"));
}
