//! Human-readable task reports
//!
//! Formats [`TaskSnapshot`]s for the terminal, both for the tasks of a
//! finished `run` and for rows read back from the history store.

use crate::state::TaskStatus;
use crate::tasks::TaskSnapshot;

/// Number of per-task errors shown before the list is truncated
const MAX_ERRORS_SHOWN: usize = 10;

/// Counts tasks per status, in lifecycle order
pub fn status_counts(tasks: &[TaskSnapshot]) -> Vec<(TaskStatus, usize)> {
    TaskStatus::all_statuses()
        .into_iter()
        .map(|status| (status, tasks.iter().filter(|t| t.status == status).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Formats the report of a run
///
/// # Arguments
///
/// * `tasks` - Snapshots to report, in display order
///
/// # Returns
///
/// The report text, ending with a newline
pub fn format_report(tasks: &[TaskSnapshot]) -> String {
    let mut out = String::new();
    out.push_str("=== Mirror Report ===\n\n");

    if tasks.is_empty() {
        out.push_str("No tasks.\n");
        return out;
    }

    for task in tasks {
        out.push_str(&format!("[{}] {}\n", task.status, task.config.start_url));
        out.push_str(&format!("  Task: {}\n", task.id));
        if let Some(worker) = &task.worker {
            out.push_str(&format!("  Worker: {}\n", worker));
        }
        out.push_str(&format!("  Duration: {}\n", task.duration));

        if let Some(summary) = &task.summary {
            out.push_str(&format!("  Output: {}\n", summary.output_directory.display()));
            out.push_str(&format!(
                "  Pages: {}, assets: {}\n",
                summary.pages_downloaded, summary.assets_downloaded
            ));
        }
        if let Some(error) = &task.error {
            out.push_str(&format!("  Error: {}\n", error));
        }

        let errors = task.summary.as_ref().map(|s| s.errors.as_slice()).unwrap_or_default();
        // a failed setup repeats its message as the only summary error
        let errors: Vec<&String> = errors.iter().filter(|e| Some(*e) != task.error.as_ref()).collect();
        if !errors.is_empty() {
            out.push_str(&format!("  Errors ({}):\n", errors.len()));
            for error in errors.iter().take(MAX_ERRORS_SHOWN) {
                out.push_str(&format!("    - {}\n", error));
            }
            if errors.len() > MAX_ERRORS_SHOWN {
                out.push_str(&format!("    ... and {} more\n", errors.len() - MAX_ERRORS_SHOWN));
            }
        }
        out.push('\n');
    }

    let totals: Vec<String> = status_counts(tasks)
        .into_iter()
        .map(|(status, n)| format!("{} {}", n, status))
        .collect();
    out.push_str(&format!("Tasks: {} ({})\n", tasks.len(), totals.join(", ")));
    out
}

/// Formats history rows as one line per task
pub fn format_history(tasks: &[TaskSnapshot]) -> String {
    if tasks.is_empty() {
        return "No recorded tasks.\n".to_string();
    }

    let mut out = String::new();
    for task in tasks {
        let pages = task
            .summary
            .as_ref()
            .map(|s| s.pages_downloaded.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{}  {:<9}  {:>5} pages  {:>8}  {}\n",
            task.submitted_at,
            task.status.to_db_string(),
            pages, task.duration, task.config.start_url
        ));
    }
    out
}

/// Prints the report of a run to stdout
pub fn print_report(tasks: &[TaskSnapshot]) {
    print!("{}", format_report(tasks));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::state::JobSummary;
    use crate::tasks::Task;
    use std::path::PathBuf;

    fn finished(url: &str, status: TaskStatus, summary: Option<JobSummary>, error: Option<&str>) -> TaskSnapshot {
        let mut task = Task::new(CrawlConfig::new(url), None);
        task.start("site-mirror-worker-1");
        task.finish(status, summary, error.map(str::to_string));
        task.snapshot()
    }

    fn summary(errors: Vec<String>) -> JobSummary {
        JobSummary {
            output_directory: PathBuf::from("/out/example.com"),
            pages_downloaded: 3,
            assets_downloaded: 12,
            elapsed_ms: 61_000,
            errors,
            saved_pages: Vec::new(),
        }
    }

    #[test]
    fn test_empty_report() {
        assert!(format_report(&[]).contains("No tasks."));
        assert_eq!(format_history(&[]), "No recorded tasks.\n");
    }

    #[test]
    fn test_report_lists_tasks_and_totals() {
        let tasks = vec![
            finished("https://example.com/", TaskStatus::Succeeded, Some(summary(vec![])), None),
            finished(
                "https://broken.example/",
                TaskStatus::Failed,
                Some(JobSummary::setup_failure(PathBuf::from("/out"), "Cannot create output directory")),
                Some("Cannot create output directory"),
            ),
        ];

        let report = format_report(&tasks);
        assert!(report.contains("[SUCCEEDED] https://example.com/"));
        assert!(report.contains("  Pages: 3, assets: 12\n"));
        assert!(report.contains("  Worker: site-mirror-worker-1\n"));
        assert!(report.contains("  Error: Cannot create output directory\n"));
        assert!(!report.contains("Errors (1)"));
        assert!(report.ends_with("Tasks: 2 (1 SUCCEEDED, 1 FAILED)\n"));
    }

    #[test]
    fn test_long_error_lists_are_truncated() {
        let errors = (0..13).map(|i| format!("https://example.com/{} -> boom", i)).collect();
        let tasks = vec![finished("https://example.com/", TaskStatus::Succeeded, Some(summary(errors)), None)];

        let report = format_report(&tasks);
        assert!(report.contains("  Errors (13):\n"));
        assert!(report.contains("    - https://example.com/9 -> boom\n"));
        assert!(!report.contains("https://example.com/10 -> boom"));
        assert!(report.contains("    ... and 3 more\n"));
    }

    #[test]
    fn test_status_counts() {
        let tasks = vec![
            finished("https://a/", TaskStatus::Cancelled, None, None),
            finished("https://b/", TaskStatus::Cancelled, None, None),
            Task::new(CrawlConfig::new("https://c/"), None).snapshot(),
        ];
        let counts = status_counts(&tasks);
        assert_eq!(counts, vec![(TaskStatus::Queued, 1), (TaskStatus::Cancelled, 2)]);
    }

    #[test]
    fn test_history_line() {
        let tasks = vec![finished("https://example.com/", TaskStatus::Succeeded, Some(summary(vec![])), None)];
        let history = format_history(&tasks);
        assert!(history.contains("SUCCEEDED"));
        assert!(history.contains("    3 pages"));
        assert!(history.trim_end().ends_with("https://example.com/"));
    }
}
