//! Matching a PR's clone URLs against `git remote -v`

use super::error::{RebaseError, RemoteKind};
use std::collections::BTreeSet;

/// Whether a `remote -v` line describes the fetch or the push URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(fetch)`
    Fetch,
    /// `(push)`
    Push,
}

/// One line of `git remote -v`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Remote name
    pub name: String,
    /// Configured URL
    pub url: String,
    /// Fetch or push
    pub direction: Direction,
}

/// Parse `git remote -v` output
///
/// Lines look like `origin\tgit@github.com:o/r.git (fetch)`. Anything
/// that doesn't is skipped.
pub fn parse_remotes(output: &str) -> Vec<RemoteEntry> {
    output
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.split_once('\t')?;
            let (url, direction) = rest.trim_end().rsplit_once(' ')?;
            let direction = match direction {
                "(fetch)" => Direction::Fetch,
                "(push)" => Direction::Push,
                _ => return None,
            };
            Some(RemoteEntry {
                name: name.to_string(),
                url: url.to_string(),
                direction,
            })
        })
        .collect()
}

/// Find the single remote whose `direction` URL is exactly `url`
pub fn find_remote(
    entries: &[RemoteEntry],
    url: &str,
    direction: Direction,
    which: RemoteKind,
) -> Result<String, RebaseError> {
    let names: BTreeSet<&str> = entries
        .iter()
        .filter(|e| e.direction == direction && !url.is_empty() && e.url == url)
        .map(|e| e.name.as_str())
        .collect();

    let mut iter = names.iter();
    match (iter.next(), iter.next()) {
        (Some(name), None) => Ok((*name).to_string()),
        (None, _) => Err(RebaseError::RemoteNotFound {
            which,
            url: url.to_string(),
        }),
        (Some(_), Some(_)) => Err(RebaseError::RemoteAmbiguous {
            which,
            url: url.to_string(),
            names: names.iter().map(|n| (*n).to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTES: &str = "\
origin\tgit@github.com:alice/widgets.git (fetch)
origin\tgit@github.com:alice/widgets.git (push)
upstream\tgit@github.com:octo/widgets.git (fetch)
upstream\tno_push (push)
";

    #[test]
    fn test_parse_remotes() {
        let entries = parse_remotes(REMOTES);
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[3],
            RemoteEntry {
                name: "upstream".to_string(),
                url: "no_push".to_string(),
                direction: Direction::Push,
            }
        );
    }

    #[test]
    fn test_parse_skips_garbage() {
        assert!(parse_remotes("not a remote line\n\norigin\turl (sideways)\n").is_empty());
    }

    #[test]
    fn test_find_owned_and_upstream() {
        let entries = parse_remotes(REMOTES);
        assert_eq!(
            find_remote(
                &entries,
                "git@github.com:alice/widgets.git",
                Direction::Push,
                RemoteKind::Owned
            )
            .unwrap(),
            "origin"
        );
        assert_eq!(
            find_remote(
                &entries,
                "git@github.com:octo/widgets.git",
                Direction::Fetch,
                RemoteKind::Upstream
            )
            .unwrap(),
            "upstream"
        );
    }

    #[test]
    fn test_direction_must_match() {
        let entries = parse_remotes(REMOTES);
        // upstream is only configured for fetch
        let err = find_remote(
            &entries,
            "git@github.com:octo/widgets.git",
            Direction::Push,
            RemoteKind::Owned,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RebaseError::RemoteNotFound {
                which: RemoteKind::Owned,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_url_never_matches() {
        let entries = parse_remotes("weird\t (push)\n");
        assert!(find_remote(&entries, "", Direction::Push, RemoteKind::Owned).is_err());
    }

    #[test]
    fn test_ambiguous_remote() {
        let entries = parse_remotes(
            "a\tgit@github.com:alice/widgets.git (push)\nb\tgit@github.com:alice/widgets.git (push)\n",
        );
        let err = find_remote(
            &entries,
            "git@github.com:alice/widgets.git",
            Direction::Push,
            RemoteKind::Owned,
        )
        .unwrap_err();
        match err {
            RebaseError::RemoteAmbiguous { names, .. } => assert_eq!(names, ["a", "b"]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
