//! Month-granularity retention for dated backup files.
//!
//! Everything dated in the current or the previous calendar month is kept.
//! Older files are grouped by `(YYYY-MM, entity)` and only the earliest file
//! of each group survives.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::Serialize;

use crate::filename::parse_backup_filename;

/// The `YYYY-MM` month from which files are protected, derived from "today".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionAnchor {
    boundary: String,
}

impl RetentionAnchor {
    pub fn from_date(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        let previous = first.checked_sub_months(Months::new(1)).unwrap_or(first);
        Self {
            boundary: previous.format("%Y-%m").to_string(),
        }
    }

    /// Anchored at today's date in the local time zone, so the protected
    /// months flip at local midnight, not at UTC midnight.
    pub fn now() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// The previous month as `YYYY-MM`.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Whether a file with this month key may be pruned at all.
    pub fn is_eligible(&self, month: &str) -> bool {
        month < self.boundary.as_str()
    }
}

/// Names of the files that may be deleted under the retention policy.
pub fn select_files_to_delete<S: AsRef<str>>(
    filenames: &[S],
    anchor: &RetentionAnchor,
) -> BTreeSet<String> {
    plan_retention(filenames, anchor).delete.into_iter().collect()
}

/// Outcome of evaluating the policy over one directory listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionPlan {
    pub boundary: String,
    /// Survivors of eligible groups plus every protected file, sorted.
    pub keep: Vec<String>,
    /// Eligible files shadowed by an earlier file of the same group, sorted.
    pub delete: Vec<String>,
}

pub fn plan_retention<S: AsRef<str>>(filenames: &[S], anchor: &RetentionAnchor) -> RetentionPlan {
    let mut keep = Vec::new();
    let mut eligible = Vec::new();
    for name in filenames {
        let name: &str = name.as_ref();
        if anchor.is_eligible(parse_backup_filename(name).month) {
            eligible.push(name);
        } else {
            keep.push(name.to_string());
        }
    }
    eligible.sort_unstable();

    let mut seen = HashSet::new();
    let mut delete = Vec::new();
    for name in eligible {
        let parsed = parse_backup_filename(name);
        if seen.insert(parsed.group_key()) {
            keep.push(name.to_string());
        } else {
            delete.push(name.to_string());
        }
    }
    keep.sort_unstable();

    RetentionPlan {
        boundary: anchor.boundary().to_string(),
        keep,
        delete,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn anchor(y: i32, m: u32, d: u32) -> RetentionAnchor {
        RetentionAnchor::from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn boundary_is_previous_month() {
        assert_eq!(anchor(2024, 5, 20).boundary(), "2024-04");
        assert_eq!(anchor(2024, 1, 1).boundary(), "2023-12");
        assert_eq!(anchor(2024, 3, 31).boundary(), "2024-02");
    }

    #[test]
    fn now_follows_local_calendar() {
        let before = Local::now().date_naive();
        let anchor = RetentionAnchor::now();
        let after = Local::now().date_naive();
        assert!(
            anchor == RetentionAnchor::from_date(before)
                || anchor == RetentionAnchor::from_date(after)
        );
    }

    #[test]
    fn keeps_earliest_per_month_and_entity() {
        let files = [
            "2024-03-01-full-db1.tar.gz",
            "2024-03-15-full-db1.tar.gz",
            "2024-02-01-full-db2.tar.gz",
            "2024-04-10-full-db1.tar.gz",
            "2024-05-01-full-db1.tar.gz",
        ];
        let deleted = select_files_to_delete(&files, &anchor(2024, 5, 20));
        assert_eq!(
            deleted,
            BTreeSet::from(["2024-03-15-full-db1.tar.gz".to_string()])
        );
    }

    #[test]
    fn entities_are_rotated_independently() {
        let files = [
            "2024-01-20-orders.tar.gz",
            "2024-01-05-orders.tar.gz",
            "2024-01-07-users.tar.gz",
            "2024-01-09-users.tar.gz",
            "2024-01-11-users.tar.gz",
        ];
        let plan = plan_retention(&files, &anchor(2024, 6, 1));
        assert_eq!(
            plan.delete,
            vec!["2024-01-09-users.tar.gz", "2024-01-11-users.tar.gz", "2024-01-20-orders.tar.gz"]
        );
        assert_eq!(
            plan.keep,
            vec!["2024-01-05-orders.tar.gz", "2024-01-07-users.tar.gz"]
        );
    }

    #[test]
    fn current_and_previous_month_are_never_deleted() {
        let files = [
            "2024-05-01-db.tar.gz",
            "2024-05-02-db.tar.gz",
            "2024-04-01-db.tar.gz",
            "2024-04-02-db.tar.gz",
            "2024-04-03-other.tar.gz",
        ];
        assert!(select_files_to_delete(&files, &anchor(2024, 5, 31)).is_empty());
    }

    #[test]
    fn second_pass_proposes_nothing() {
        let files: Vec<String> = (1..=28)
            .flat_map(|day| {
                [
                    format!("2023-11-{day:02}-a.tar.gz"),
                    format!("2023-12-{day:02}-b.tar.gz"),
                    format!("2024-02-{day:02}-a.tar.gz"),
                ]
            })
            .collect();
        let now = anchor(2024, 3, 10);
        let deleted = select_files_to_delete(&files, &now);
        assert_eq!(deleted.len(), 27 * 2);

        let survivors: Vec<&String> = files.iter().filter(|f| !deleted.contains(*f)).collect();
        assert!(select_files_to_delete(&survivors, &now).is_empty());
    }

    #[test]
    fn survivors_are_unique_and_earliest_per_group() {
        let files = [
            "2023-07-30-x.tar.gz",
            "2023-07-02-x.tar.gz",
            "2023-07-15-y.tar.gz",
            "2023-08-01-x.tar.gz",
            "2023-07-15-extra-x.tar.gz",
            "2023-07-01-extra-y.tar.gz",
            "junk",
        ];
        let now = anchor(2024, 1, 1);
        let deleted = select_files_to_delete(&files, &now);

        let mut survivors: HashMap<(String, String), Vec<&str>> = HashMap::new();
        for name in files.iter().filter(|f| !deleted.contains(**f)) {
            let parsed = parse_backup_filename(name);
            if now.is_eligible(parsed.month) {
                survivors
                    .entry((parsed.month.to_string(), parsed.entity.to_string()))
                    .or_default()
                    .push(*name);
            }
        }
        for (group, members) in &survivors {
            assert_eq!(members.len(), 1, "group {group:?} has {members:?}");
            let earliest = files
                .iter()
                .filter(|f| {
                    let p = parse_backup_filename(f);
                    (p.month, p.entity) == (group.0.as_str(), group.1.as_str())
                })
                .min()
                .unwrap();
            assert_eq!(members[0], *earliest);
        }
        assert!(deleted.contains("2023-07-30-x.tar.gz"));
        assert!(deleted.contains("2023-07-15-extra-x.tar.gz"));
    }

    #[test]
    fn short_names_group_by_truncated_month() {
        let files = ["2023", "2023", "2023-1", "abc"];
        let plan = plan_retention(&files, &anchor(2024, 5, 1));
        // "abc" sorts after every digit, so it is never eligible.
        assert_eq!(plan.delete, vec!["2023"]);
        assert_eq!(plan.keep, vec!["2023", "2023-1", "abc"]);
    }

    #[test]
    fn empty_input() {
        let files: [&str; 0] = [];
        assert!(select_files_to_delete(&files, &RetentionAnchor::now()).is_empty());
    }
}
