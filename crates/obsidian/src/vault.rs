use anyhow::Result;
use civic_core::clock::Clock;
use civic_core::config::PriorityConfig;
use civic_core::db;
use civic_core::schema::{IssueStatus, RankedIssue};
use civic_core::scoring::sort_by_priority_with;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use tracing::info;

pub struct VaultPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub issues_dir: PathBuf,
}

impl VaultPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_dir: root.join("00_Index"),
            issues_dir: root.join("Issues"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir)?;
        fs::create_dir_all(&self.issues_dir)?;
        Ok(())
    }
}

/// Writes one note per stored issue and a priority-ordered index.
/// Returns the number of issue notes written.
pub fn build_vault(
    conn: &Connection,
    vault_root: &Path,
    clock: &impl Clock,
    config: &PriorityConfig,
) -> Result<usize> {
    let paths = VaultPaths::new(vault_root);
    paths.ensure()?;

    let ranked = sort_by_priority_with(db::list_issues(conn)?, clock, config);

    // 1) Issue notes
    for r in &ranked {
        write_issue_note(&paths, r)?;
    }

    // 2) Priority MOC
    let mut lines: Vec<String> = Vec::new();
    lines.push("# MOC - Priorities".to_string());
    lines.push(String::new());
    lines.push("This index is generated. Do not edit manually.".to_string());
    lines.push(String::new());
    lines.push("## Open Issues".to_string());
    lines.push(String::new());

    let (closed, open): (Vec<&RankedIssue>, Vec<&RankedIssue>) =
        ranked.iter().partition(|r| is_closed(r));

    if open.is_empty() {
        lines.push("_No open issues._".to_string());
    }
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    for r in &open {
        lines.push(format!(
            "- [[Issues/{}|{}]] <span style=\"color:{}\">{}</span> ({:.1})",
            note_name(&r.issue.id),
            r.issue.title,
            r.priority_score.rank.color(),
            r.priority_score.rank,
            r.priority_score.score
        ));
        *category_counts
            .entry(r.issue.category.label().to_string())
            .or_insert(0) += 1;
    }

    lines.push(String::new());
    lines.push("## Open Issues by Category".to_string());
    lines.push(String::new());

    let mut counts: Vec<(String, usize)> = category_counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if counts.is_empty() {
        lines.push("_No categories found._".to_string());
    } else {
        for (category, count) in counts {
            lines.push(format!("- {category} ({count})"));
        }
    }

    lines.push(String::new());
    lines.push("## Closed".to_string());
    lines.push(String::new());
    if closed.is_empty() {
        lines.push("_No closed issues._".to_string());
    } else {
        for r in &closed {
            lines.push(format!(
                "- [[Issues/{}|{}]] ({})",
                note_name(&r.issue.id),
                r.issue.title,
                r.issue.status
            ));
        }
    }

    let moc_path = paths.index_dir.join("MOC - Priorities.md");
    fs::write(moc_path, lines.join("\n"))?;

    info!(
        issues = ranked.len(),
        open = open.len(),
        vault = %paths.root.display(),
        "vault written"
    );
    Ok(ranked.len())
}

fn is_closed(r: &RankedIssue) -> bool {
    matches!(
        r.issue.lifecycle(),
        Some(IssueStatus::Resolved | IssueStatus::Rejected)
    )
}

fn write_issue_note(paths: &VaultPaths, r: &RankedIssue) -> Result<()> {
    let issue = &r.issue;
    let priority = &r.priority_score;
    let note_path = paths.issues_dir.join(format!("{}.md", note_name(&issue.id)));

    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&format!("id: {}\n", issue.id));
    md.push_str(&format!("category: {}\n", issue.category));
    md.push_str(&format!("status: {}\n", issue.status));
    md.push_str(&format!("created_at: {}\n", issue.created_at.format(&Rfc3339)?));
    md.push_str(&format!("upvotes: {}\n", issue.upvote_count));
    md.push_str(&format!("location: [{}, {}]\n", issue.latitude, issue.longitude));
    md.push_str(&format!("priority_score: {:.2}\n", priority.score));
    md.push_str(&format!("priority_rank: {}\n", priority.rank));
    md.push_str(&format!("priority_color: \"{}\"\n", priority.rank.color()));
    md.push_str("---\n\n");

    md.push_str(&format!("# {}\n\n", issue.title));

    md.push_str("## Description\n");
    if issue.description.trim().is_empty() {
        md.push_str("_No description provided._\n");
    } else {
        md.push_str(&issue.description);
        md.push('\n');
    }

    md.push_str("\n## Priority\n");
    md.push_str(&format!("- Upvotes: {:.1} / 40\n", priority.factors.upvotes));
    md.push_str(&format!("- Severity: {:.1} / 30\n", priority.factors.severity));
    md.push_str(&format!("- Age: {:.1} / 20\n", priority.factors.age));
    md.push_str(&format!("- Location: {:.1} / 10\n", priority.factors.location));

    fs::write(note_path, md)?;
    Ok(())
}

// Store ids are opaque; keep them usable as file names and wiki links.
fn note_name(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '|' | '#' | '[' | ']' => '_',
            c => c,
        })
        .collect()
}
