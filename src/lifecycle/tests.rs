use rstest::rstest;

use super::*;

type Record = Lifecycle<i32, String>;

#[test]
fn new_is_idle() {
    let r = Record::new();
    assert_eq!(r.status, Status::Idle);
    assert_eq!(r.data, None);
    assert_eq!(r.error, None);
    assert!(r.is_idle());
    assert!(!r.is_loading());
    assert!(!r.is_error());
    assert!(!r.is_success());
    assert_eq!(r, Record::default());
}

#[test]
fn to_pending_keeps_data_and_error() {
    let r = Lifecycle {
        status: Status::Resolved,
        data: Some(1),
        error: Some("e".to_string()),
    };
    let r = apply_patch(r, Patch::ToPending);
    assert_eq!(r.status, Status::Pending);
    assert_eq!(r.data, Some(1));
    assert_eq!(r.error, Some("e".to_string()));
}

#[test]
fn to_resolved_keeps_error() {
    let r = apply_patch(Record::new(), Patch::ToRejected("boom".to_string()));
    let r = apply_patch(r, Patch::ToResolved(5));
    assert!(r.is_success());
    assert_eq!(r.data, Some(5));
    assert_eq!(r.error, Some("boom".to_string()));
}

#[test]
fn to_rejected_keeps_data() {
    let r = apply_patch(Record::new(), Patch::ToResolved(5));
    let r = apply_patch(r, Patch::ToRejected("boom".to_string()));
    assert!(r.is_error());
    assert_eq!(r.data, Some(5));
    assert_eq!(r.error, Some("boom".to_string()));
}

#[test]
fn replace_overwrites_every_field() {
    let r = apply_patch(Record::new(), Patch::ToResolved(5));
    let r = apply_patch(r, Patch::Replace(Record::new()));
    assert_eq!(r, Record::new());
}

#[rstest]
#[case(Seed::new(), Lifecycle { status: Status::Idle, data: None, error: None })]
#[case(Seed::new().status(Status::Pending), Lifecycle { status: Status::Pending, data: None, error: None })]
#[case(Seed::new().data(3), Lifecycle { status: Status::Idle, data: Some(3), error: None })]
#[case(
    Seed::new().status(Status::Rejected).error("x".to_string()),
    Lifecycle { status: Status::Rejected, data: None, error: Some("x".to_string()) }
)]
fn seed_merges_over_default(#[case] seed: Seed<i32, String>, #[case] expected: Record) {
    assert_eq!(Lifecycle::from(seed), expected);
}

#[rstest]
#[case(Status::Idle, "idle")]
#[case(Status::Pending, "pending")]
#[case(Status::Resolved, "resolved")]
#[case(Status::Rejected, "rejected")]
fn status_text(#[case] status: Status, #[case] text: &str) {
    assert_eq!(status.to_string(), text);
    assert_eq!(text.parse::<Status>().unwrap(), status);
    assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{text}\""));
}

#[test]
fn status_parse_unknown() {
    assert!("loading".parse::<Status>().is_err());
}

#[test]
fn seed_from_json() {
    let seed: Seed<i32, String> =
        serde_json::from_str(r#"{ "status": "resolved", "data": 7 }"#).unwrap();
    assert_eq!(
        Lifecycle::from(seed),
        Lifecycle {
            status: Status::Resolved,
            data: Some(7),
            error: None
        }
    );

    let seed: Seed<i32, String> = serde_json::from_str("{}").unwrap();
    assert_eq!(seed, Seed::new());
}

#[test]
fn lifecycle_to_json() {
    let r = apply_patch(Record::new(), Patch::ToRejected("boom".to_string()));
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        serde_json::json!({ "status": "rejected", "data": null, "error": "boom" })
    );
}
