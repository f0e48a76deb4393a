use crate::schema::{Category, ExistingIssue, RESOLVED_STATUS};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use time::{OffsetDateTime, UtcOffset};
use time::format_description::well_known::Rfc3339;

pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    init(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          description TEXT NOT NULL DEFAULT '',
          category TEXT NOT NULL,
          latitude REAL NOT NULL,
          longitude REAL NOT NULL,
          status TEXT NOT NULL,
          upvote_count INTEGER NOT NULL DEFAULT 0,
          created_at TEXT NOT NULL,
          imported_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
        CREATE INDEX IF NOT EXISTS idx_issues_category ON issues(category);
        "#,
    )?;
    Ok(())
}

pub fn upsert_issue(conn: &Connection, issue: &ExistingIssue) -> Result<()> {
    let created_at = issue.created_at.to_offset(UtcOffset::UTC).format(&Rfc3339)?;

    conn.execute(
        r#"
        INSERT INTO issues (
          id, title, description, category, latitude, longitude,
          status, upvote_count, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
          title=excluded.title,
          description=excluded.description,
          category=excluded.category,
          latitude=excluded.latitude,
          longitude=excluded.longitude,
          status=excluded.status,
          upvote_count=excluded.upvote_count,
          created_at=excluded.created_at
        "#,
        params![
            issue.id,
            issue.title,
            issue.description,
            issue.category.label(),
            issue.latitude,
            issue.longitude,
            issue.status,
            issue.upvote_count,
            created_at
        ],
    )?;

    Ok(())
}

const SELECT_ISSUES: &str = r#"
    SELECT id, title, description, category, latitude, longitude,
           status, upvote_count, created_at
    FROM issues
"#;

pub fn list_issues(conn: &Connection) -> Result<Vec<ExistingIssue>> {
    query_issues(conn, &format!("{SELECT_ISSUES} ORDER BY created_at DESC"), params![])
}

/// Issues a duplicate check should consider: everything not marked resolved.
pub fn list_open_issues(conn: &Connection) -> Result<Vec<ExistingIssue>> {
    query_issues(
        conn,
        &format!("{SELECT_ISSUES} WHERE status != ?1 ORDER BY created_at DESC"),
        params![RESOLVED_STATUS],
    )
}

pub fn get_issue(conn: &Connection, id: &str) -> Result<Option<ExistingIssue>> {
    let mut stmt = conn.prepare(&format!("{SELECT_ISSUES} WHERE id = ?1"))?;
    let row = stmt.query_row(params![id], IssueRow::from_row).optional()?;
    row.map(IssueRow::into_issue).transpose()
}

fn query_issues<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<ExistingIssue>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, IssueRow::from_row)?;

    let mut issues = Vec::new();
    for r in rows {
        issues.push(r?.into_issue()?);
    }
    Ok(issues)
}

#[derive(Debug)]
struct IssueRow {
    id: String,
    title: String,
    description: String,
    category: String,
    latitude: f64,
    longitude: f64,
    status: String,
    upvote_count: u32,
    created_at: String,
}

impl IssueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(IssueRow {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            status: row.get(6)?,
            upvote_count: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_issue(self) -> Result<ExistingIssue> {
        let created_at = OffsetDateTime::parse(&self.created_at, &Rfc3339)
            .with_context(|| format!("issue {} has invalid created_at {}", self.id, self.created_at))?;
        Ok(ExistingIssue {
            id: self.id,
            title: self.title,
            description: self.description,
            category: Category::from(self.category),
            latitude: self.latitude,
            longitude: self.longitude,
            status: self.status,
            upvote_count: self.upvote_count,
            created_at,
        })
    }
}
