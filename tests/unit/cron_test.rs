//! Tests for the cron primitive

use chrono::NaiveDate;
use prometheus_stream_listener::core::CronSchedule;

#[test]
fn test_parse_and_display_round_trip() {
    let cron: CronSchedule = "0 */5 9-17 ? * MON-FRI".parse().unwrap();
    assert_eq!(cron.to_string(), "0 */5 9-17 ? * MON-FRI");
    assert_eq!(cron.expression(), "0 */5 9-17 ? * MON-FRI");
}

#[test]
fn test_business_hours_schedule() {
    let cron = CronSchedule::parse("0 */5 9-17 ? * MON-FRI").unwrap();
    // Friday 2024-03-01 17:58 -> Monday 09:00.
    let friday_evening = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(17, 58, 0)
        .unwrap();
    let monday_morning = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    assert_eq!(cron.next_after(friday_evening), Some(monday_morning));
}

#[test]
fn test_leap_day_schedule() {
    let cron = CronSchedule::parse("0 0 12 29 FEB ?").unwrap();
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let expected = NaiveDate::from_ymd_opt(2028, 2, 29)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(cron.next_after(start), Some(expected));
}
