use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn rows() -> String {
    json!([
        {"id": "a1", "title": "Algebra", "date": "2025-06-02", "start_time": "16:00",
         "time_hrs": 1, "is_recurring": true, "recurring_days": ["Monday"]},
        {"id": "a2", "title": "Algebra", "date": "2025-06-09", "start_time": "16:00",
         "time_hrs": 1, "is_recurring": true, "recurring_days": ["Monday"]},
        {"id": "c1", "title": "Chemistry", "date": "2025-06-03", "start_time": "10:00",
         "time_hrs": "1.5", "is_recurring": true},
        {"id": "42", "Class Number": "A-101", "Date": "06/01/2025", "Start Time": "2:00 PM",
         "Time (hrs)": "1.5", "Tutor Name": "Dana Reyes"},
        {"id": "bad", "date": "not-a-date"}
    ])
    .to_string()
}

fn sessions() -> Command {
    let mut cmd = Command::cargo_bin("sessions").unwrap();
    cmd.env_remove("SESSION_ENGINE_TODAY")
        .env_remove("SESSION_ENGINE_DAYS")
        .env("SESSION_ENGINE_LOG", "off");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn day_view_lists_sessions_on_that_day() {
    let out = sessions()
        .args(["day", "2025-06-01", "--today", "2025-05-20"])
        .write_stdin(rows())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let view = stdout_json(&out);
    assert_eq!(view["hasSessions"], true);
    let list = view["sessions"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], "42");
    assert_eq!(list[0]["endTime"], "15:30");
}

#[test]
fn day_view_accepts_us_dates() {
    sessions()
        .args(["day", "6/3/2025", "--today", "2025-05-20"])
        .write_stdin(rows())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"c1\""));
}

#[test]
fn upcoming_window_is_ordered_and_bounded() {
    let out = sessions()
        .args(["upcoming", "--today", "2025-06-01"])
        .write_stdin(rows())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let view = stdout_json(&out);
    let ids: Vec<&str> = view["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    // a2 on June 9 is outside the 7-day window; "bad" falls back to June 1.
    assert_eq!(ids, vec!["bad", "42", "a1", "c1"]);
}

#[test]
fn upcoming_days_flag_widens_window() {
    sessions()
        .args(["upcoming", "--today", "2025-06-01", "--days", "14"])
        .write_stdin(rows())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a2\""));
}

#[test]
fn corrupt_row_is_reported_as_error_status() {
    sessions()
        .args(["day", "2025-06-01", "--today", "2025-06-01"])
        .write_stdin(rows())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("Error Loading"));
}

#[test]
fn month_markers_list_days() {
    let out = sessions()
        .args(["month", "--year", "2025", "--month", "6", "--today", "2025-05-20"])
        .write_stdin(rows())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_json(&out)["days"], json!([1, 2, 3, 9]));
}

#[test]
fn month_out_of_range_fails() {
    sessions()
        .args(["month", "--year", "2025", "--month", "13"])
        .write_stdin(rows())
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 12"));
}

#[test]
fn recurring_delete_targets_match_title() {
    let out = sessions()
        .args(["delete-targets", "a1", "--all-recurring"])
        .write_stdin(rows())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let view = stdout_json(&out);
    assert_eq!(view["scope"], "allRecurring");
    assert_eq!(view["ids"], json!(["a1", "a2"]));
}

#[test]
fn recurring_flag_on_one_shot_row_skips_it() {
    let out = sessions()
        .args(["delete-targets", "42", "--all-recurring"])
        .write_stdin(rows())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_json(&out)["ids"], json!([]));
}

#[test]
fn single_delete_targets_one() {
    sessions()
        .args(["delete-targets", "a1"])
        .write_stdin(rows())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a2\"").not());
}

#[test]
fn unknown_delete_target_fails() {
    sessions()
        .args(["delete-targets", "zzz"])
        .write_stdin(rows())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no session with id"));
}

#[test]
fn non_array_input_fails() {
    sessions()
        .args(["upcoming"])
        .write_stdin("{\"id\": 1}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a JSON array"));
}

#[test]
fn invalid_day_argument_fails() {
    sessions()
        .args(["day", "someday"])
        .write_stdin("[]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));
}
