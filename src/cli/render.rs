//! Pull request table

use owo_colors::{OwoColorize, Style};
use prp::types::PullRequestRecord;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const HEADERS: [&str; 11] = [
    "Repo", "ID", "Title", "Owner", "Branch", "Target", "+1", "UTD", "Status", "Review", "Labels",
];

/// Characters of the title shown outside wide mode
const SHORT_TITLE_LEN: usize = 10;

/// Column separator
const SEPARATOR: &str = "|";

/// Sort by repository name, then pull request number
pub fn sort_records(records: &mut [PullRequestRecord]) {
    records.sort_by(|a, b| {
        a.repo
            .name
            .cmp(&b.repo.name)
            .then_with(|| a.repo.owner.cmp(&b.repo.owner))
            .then_with(|| a.number.cmp(&b.number))
    });
}

/// Upper-case initials of each `-` separated word: `needs-review` -> `NR`
pub fn shorten_label(label: &str) -> String {
    label
        .split('-')
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// `Y`/`N` per context, ordered by context name, joined by `/`
pub fn format_build_status(status: &BTreeMap<String, bool>) -> String {
    status
        .values()
        .map(|passed| yes_no(*passed))
        .collect::<Vec<_>>()
        .join("/")
}

const fn yes_no(value: bool) -> &'static str {
    if value { "Y" } else { "N" }
}

/// Cell text with the style it's printed in
struct Cell {
    text: String,
    style: Style,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Style::new(),
        }
    }

    fn flag(value: bool) -> Self {
        Self {
            text: yes_no(value).to_string(),
            style: if value {
                Style::new().green()
            } else {
                Style::new().red()
            },
        }
    }
}

fn row_cells(record: &PullRequestRecord, wide: bool) -> Vec<Cell> {
    let title = record.title.replace('&', "and");
    let title = if wide {
        title
    } else {
        title.chars().take(SHORT_TITLE_LEN).collect()
    };

    let labels = if wide {
        record.labels.join(",")
    } else {
        record
            .labels
            .iter()
            .map(|l| shorten_label(l))
            .collect::<Vec<_>>()
            .join(",")
    };

    vec![
        Cell::plain(&record.repo.name),
        Cell::plain(record.number.to_string()),
        Cell::plain(title),
        Cell::plain(&record.author_login),
        Cell::plain(&record.head_branch),
        Cell::plain(&record.target_branch),
        Cell::plain(record.approval_count.to_string()),
        Cell::flag(record.is_rebased),
        Cell::plain(format_build_status(&record.build_status_by_context)),
        Cell::flag(record.needs_viewer_approval),
        Cell::plain(labels),
    ]
}

/// Render records (already sorted) as an aligned table
///
/// With `color` off the output is plain text. Rows with `visible` cleared
/// are dimmed as a whole.
pub fn render_table(records: &[PullRequestRecord], wide: bool, color: bool) -> String {
    let header: Vec<Cell> = HEADERS.iter().map(|h| Cell::plain(*h)).collect();
    let rows: Vec<(bool, Vec<Cell>)> = records
        .iter()
        .map(|r| (r.visible, row_cells(r, wide)))
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|c| c.text.chars().count()).collect();
    for (_, cells) in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.text.chars().count());
        }
    }

    let mut out = String::new();
    for (visible, cells) in std::iter::once((true, header)).chain(rows) {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(&widths).enumerate() {
            let last = i + 1 == widths.len();
            let padded = if last {
                cell.text.clone()
            } else {
                format!("{:<width$}", cell.text)
            };
            if color && visible {
                let _ = write!(line, "{}", padded.style(cell.style));
            } else {
                line.push_str(&padded);
            }
            if !last {
                line.push_str(SEPARATOR);
            }
        }
        if color && !visible {
            let _ = writeln!(out, "{}", line.dimmed());
        } else {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use prp::types::{Identity, PullRequest};

    fn record(repo: &str, number: u64, title: &str) -> PullRequestRecord {
        let pr = PullRequest {
            number,
            title: title.to_string(),
            author_login: "alice".to_string(),
            head_ref: "feature".to_string(),
            base_ref: "main".to_string(),
            head_label: "alice:feature".to_string(),
            base_label: "octo:main".to_string(),
            head_sha: "abc".to_string(),
            head_ssh_url: String::new(),
            base_ssh_url: String::new(),
            html_url: String::new(),
        };
        PullRequestRecord::from_pull_request(repo.parse().unwrap(), pr, &Identity::new("bob"))
    }

    #[test]
    fn test_shorten_label() {
        assert_eq!(shorten_label("needs-review"), "NR");
        assert_eq!(shorten_label("bug"), "B");
        assert_eq!(shorten_label("a--b"), "AB");
    }

    #[test]
    fn test_build_status_sorted_by_context() {
        let status = BTreeMap::from([
            ("z/deploy".to_string(), false),
            ("a/test".to_string(), true),
        ]);
        assert_eq!(format_build_status(&status), "Y/N");
        assert_eq!(format_build_status(&BTreeMap::new()), "");
    }

    #[test]
    fn test_sort_by_repo_then_number() {
        let mut records = vec![
            record("octo/widgets", 9, "a"),
            record("octo/gadgets", 12, "b"),
            record("octo/widgets", 3, "c"),
        ];
        sort_records(&mut records);
        let order: Vec<_> = records
            .iter()
            .map(|r| (r.repo.name.as_str(), r.number))
            .collect();
        assert_eq!(order, [("gadgets", 12), ("widgets", 3), ("widgets", 9)]);
    }

    #[test]
    fn test_table_plain() {
        let mut r = record("octo/widgets", 42, "Add widgets & gadgets");
        r.approval_count = 2;
        r.is_rebased = true;
        r.labels = vec!["needs-review".to_string(), "bug".to_string()];
        r.build_status_by_context = BTreeMap::from([("ci".to_string(), true)]);

        let table = render_table(&[r.clone()], false, false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Repo   |ID|Title     |Owner|"));
        assert_eq!(
            lines[1],
            "widgets|42|Add widget|alice|feature|main  |2 |Y  |Y     |Y     |NR,B"
        );

        let wide = render_table(&[r], true, false);
        assert!(wide.contains("Add widgets and gadgets"));
        assert!(wide.contains("needs-review,bug"));
    }

    #[test]
    fn test_hidden_rows_render_without_color_codes_when_plain() {
        let mut r = record("octo/widgets", 1, "x");
        r.visible = false;
        let table = render_table(&[r], false, false);
        assert!(!table.contains('\u{1b}'));
    }
}
