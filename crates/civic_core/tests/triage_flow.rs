use civic_core::clock::FixedClock;
use civic_core::db;
use civic_core::duplicates::{detect_duplicates, should_warn_duplicate};
use civic_core::schema::{Category, ExistingIssue, IssueDraft, PriorityRank};
use civic_core::scoring::sort_by_priority;
use time::macros::datetime;

const SNAPSHOT: &str = r#"[
  {"id": "w-1", "title": "Burst pipe on Kissy Road", "description": "water pouring onto the road",
   "category": "Water", "latitude": 8.48400, "longitude": -13.22990, "status": "Reported",
   "upvote_count": 64, "created_at": "2024-05-01T08:00:00Z"},
  {"id": "w-2", "title": "Burst pipe on Kissy Road", "description": "water pouring onto the road",
   "category": "Water", "latitude": 8.48401, "longitude": -13.22990, "status": "Resolved",
   "upvote_count": 10, "created_at": "2024-04-01T08:00:00Z"},
  {"id": "r-1", "title": "Pothole", "description": "", "category": "Roads",
   "latitude": 8.48405, "longitude": -13.22990, "status": "In Progress",
   "upvote_count": 3, "created_at": "2024-06-25T08:00:00+01:00"},
  {"id": "x-1", "title": "Burst pipe on Kissy Road", "description": "water pouring onto the road",
   "category": "Water", "latitude": 8.49400, "longitude": -13.22990, "status": "Reported",
   "upvote_count": 0, "created_at": "2024-06-29T08:00:00Z"}
]"#;

fn load_snapshot() -> rusqlite::Connection {
    let conn = db::open_in_memory().unwrap();
    let issues: Vec<ExistingIssue> = serde_json::from_str(SNAPSHOT).unwrap();
    for issue in &issues {
        db::upsert_issue(&conn, issue).unwrap();
    }
    conn
}

#[test]
fn draft_near_open_water_issue_triggers_warning() {
    let conn = load_snapshot();
    let open = db::list_open_issues(&conn).unwrap();
    assert_eq!(open.len(), 3);

    let draft = IssueDraft {
        title: "burst pipe kissy road".to_string(),
        description: "Water pouring onto the road".to_string(),
        category: Category::Water,
        latitude: 8.48402,
        longitude: -13.22990,
    };
    let matches = detect_duplicates(&draft, &open);

    // w-2 is resolved, r-1 is another category, x-1 is ~1.1km away
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].issue_id, "w-1");
    assert!(matches[0].reason.starts_with("Very close location"));
    assert!(should_warn_duplicate(&matches));
}

#[test]
fn detector_excludes_resolved_even_without_store_filter() {
    let conn = load_snapshot();
    let all = db::list_issues(&conn).unwrap();
    assert_eq!(all.len(), 4);

    let draft = IssueDraft {
        title: "Burst pipe on Kissy Road".to_string(),
        description: "water pouring onto the road".to_string(),
        category: Category::Water,
        latitude: 8.48401,
        longitude: -13.22990,
    };
    let ids: Vec<String> = detect_duplicates(&draft, &all)
        .into_iter()
        .map(|m| m.issue_id)
        .collect();
    assert_eq!(ids, vec!["w-1".to_string()]);
}

#[test]
fn snapshot_ranks_most_urgent_first() {
    let conn = load_snapshot();
    let open = db::list_open_issues(&conn).unwrap();
    let ranked = sort_by_priority(open, &FixedClock(datetime!(2024-06-30 08:00 UTC)));

    let ids: Vec<&str> = ranked.iter().map(|r| r.issue.id.as_str()).collect();
    assert_eq!(ids, vec!["w-1", "x-1", "r-1"]);
    assert_eq!(ranked[0].priority_score.rank, PriorityRank::Critical);
    assert_eq!(ranked[0].priority_score.score, 95.0);
}
