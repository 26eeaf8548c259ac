use std::sync::Arc;

use rollcall_model::{AttendanceRecord, Statistics, StudentDocument, StudentId};
use rollcall_service::db::MemoryStore;
use rollcall_service::reports::{ReportCriteria, ReportError, ReportService, UNKNOWN_NAME};
use serde_json::{json, Value};

fn entry(date: &str, status: &str) -> Value {
    json!({"teacher": "Dr. Rao", "date": date, "time": "09:00", "status": status})
}

fn student(id: &str, name: Option<&str>, attendance: Value) -> StudentDocument {
    StudentDocument {
        id: StudentId::new(id),
        name: name.map(str::to_string),
        attendance: AttendanceRecord::from_json(&attendance),
    }
}

fn criteria(semester: Option<&str>, student_ids: Option<Vec<&str>>) -> ReportCriteria {
    ReportCriteria {
        subject: Some("CS101".to_string()),
        start_date: Some("2024-01-01".to_string()),
        end_date: Some("2024-01-31".to_string()),
        semester: semester.map(str::to_string),
        student_ids: student_ids.map(|ids| ids.into_iter().map(str::to_string).collect()),
        division: None,
    }
}

/// Student A: 10 entries inside January (6 present) plus 2 outside it.
fn student_a() -> StudentDocument {
    let mut cs101: Vec<Value> = (1..=10)
        .map(|day| {
            let status = if day <= 6 { "present" } else { "absent" };
            entry(&format!("2024-01-{day:02}"), status)
        })
        .collect();
    cs101.push(entry("2023-12-31", "present"));
    cs101.push(entry("2024-02-01", "present"));

    student(
        "u23cs1001",
        Some("Asha"),
        json!({"3": {"CS101": cs101, "MA201": [entry("2024-01-05", "absent")]}}),
    )
}

/// Student B: enrolled in semester 3, but nothing for CS101 in range.
fn student_b() -> StudentDocument {
    student(
        "p22ai0042",
        None,
        json!({"3": {"CS101": [entry("2024-03-01", "present")], "MA201": [entry("2024-01-02", "present")]}}),
    )
}

fn service(students: Vec<StudentDocument>) -> (ReportService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_students(students));
    (ReportService::new(store.clone()), store)
}

#[tokio::test]
async fn semester_report_aggregates_each_student() {
    let (reports, _) = service(vec![student_a(), student_b()]);

    let rows = reports.report(&criteria(Some("3"), None)).await.unwrap();
    assert_eq!(rows.len(), 2);

    let a = &rows[0];
    assert_eq!(a.student_id.as_str(), "u23cs1001");
    assert_eq!(a.name, "Asha");
    assert_eq!(a.attendance_records.len(), 10);
    assert_eq!(
        a.statistics,
        Statistics {
            total_classes: 10,
            present: 6,
            absent: 4,
            percentage: 60.0,
        }
    );

    let b = &rows[1];
    assert_eq!(b.student_id.as_str(), "p22ai0042");
    assert_eq!(b.name, UNKNOWN_NAME);
    assert!(b.attendance_records.is_empty());
    assert_eq!(b.statistics, Statistics::default());

    let identity = b.identity.as_ref().unwrap();
    assert_eq!(identity.degree, "M.Tech");
    assert_eq!(identity.department, "Artificial Intelligence");
    assert_eq!(identity.year, "2022");
    assert_eq!(identity.roll_number, "0042");
}

#[tokio::test]
async fn semester_selection_skips_students_without_entries() {
    let empty = student("u23cs1003", Some("Ravi"), json!({"3": {"CS101": []}, "4": {}}));
    let (reports, _) = service(vec![student_a(), empty]);

    let rows = reports.report(&criteria(Some("3"), None)).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.student_id.as_str()).collect();
    assert_eq!(ids, vec!["u23cs1001"]);
}

#[tokio::test]
async fn explicit_ids_select_in_store_order() {
    let (reports, _) = service(vec![student_a(), student_b()]);

    let rows = reports
        .report(&criteria(Some("3"), Some(vec!["p22ai0042", "missing", "u23cs1001"])))
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.student_id.as_str()).collect();
    assert_eq!(ids, vec!["u23cs1001", "p22ai0042"]);
}

#[tokio::test]
async fn explicit_ids_without_semester_report_no_entries() {
    let (reports, _) = service(vec![student_a()]);

    let rows = reports
        .report(&criteria(None, Some(vec!["u23cs1001"])))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].attendance_records.is_empty());
    assert_eq!(rows[0].statistics, Statistics::default());
}

#[tokio::test]
async fn semester_without_students_yields_empty_report() {
    let (reports, _) = service(vec![student_a(), student_b()]);

    let rows = reports.report(&criteria(Some("8"), None)).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn unknown_student_ids_yield_empty_report() {
    let (reports, _) = service(vec![student_a(), student_b()]);

    let rows = reports
        .report(&criteria(Some("3"), Some(vec!["u23cs9998", "u23cs9999"])))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn window_bounds_are_inclusive() {
    let doc = student(
        "u23cs1004",
        None,
        json!({"3": {"CS101": [
            entry("2024-01-01", "present"),
            entry("24-01-31", "absent"),
            entry("2024-01-31T23:59:00Z", "present"),
        ]}}),
    );
    let (reports, _) = service(vec![doc]);

    let rows = reports.report(&criteria(Some("3"), None)).await.unwrap();
    assert_eq!(rows[0].attendance_records.len(), 3);
    assert_eq!(rows[0].statistics.percentage, 66.67);
}

#[tokio::test]
async fn inverted_window_yields_empty_rows() {
    let (reports, _) = service(vec![student_a()]);
    let c = ReportCriteria {
        start_date: Some("2024-01-31".to_string()),
        end_date: Some("2024-01-01".to_string()),
        ..criteria(Some("3"), None)
    };

    let rows = reports.report(&c).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].attendance_records.is_empty());
}

#[tokio::test]
async fn missing_criteria_are_rejected() {
    let (reports, _) = service(vec![student_a()]);

    let no_subject = ReportCriteria {
        subject: None,
        ..criteria(Some("3"), None)
    };
    let no_end = ReportCriteria {
        end_date: None,
        ..criteria(Some("3"), None)
    };
    let no_selection = criteria(None, None);

    for c in [no_subject, no_end, no_selection] {
        assert!(matches!(
            reports.report(&c).await,
            Err(ReportError::Validation { .. })
        ));
    }
}

#[tokio::test]
async fn store_failure_surfaces_as_store_error() {
    let (reports, store) = service(vec![student_a()]);
    store.set_unavailable(true);

    assert!(matches!(
        reports.report(&criteria(Some("3"), None)).await,
        Err(ReportError::Store(_))
    ));
}

#[tokio::test]
async fn student_report_returns_full_history() {
    let (reports, _) = service(vec![student_a()]);

    let row = reports
        .student_report("u23cs1001", "3", "CS101")
        .await
        .unwrap();
    assert_eq!(row.name, "Asha");
    assert_eq!(row.attendance_records.len(), 12);
    assert_eq!(row.statistics.present, 8);
    assert_eq!(row.statistics.absent, 4);
}

#[tokio::test]
async fn student_report_for_unknown_subject_is_empty() {
    let (reports, _) = service(vec![student_a()]);

    let row = reports
        .student_report("u23cs1001", "5", "CS101")
        .await
        .unwrap();
    assert!(row.attendance_records.is_empty());
    assert_eq!(row.statistics, Statistics::default());
}

#[tokio::test]
async fn student_report_errors() {
    let (reports, _) = service(vec![student_a()]);

    assert!(matches!(
        reports.student_report("u23cs1001", "", "CS101").await,
        Err(ReportError::Validation { .. })
    ));
    assert!(matches!(
        reports.student_report("u23cs9999", "3", "CS101").await,
        Err(ReportError::NotFound(id)) if id.as_str() == "u23cs9999"
    ));
}
