use std::collections::HashSet;
use std::fmt;

use chrono::DateTime;
use colored::Colorize;

use crate::error::{Error, Result};
use crate::object::{find, read_object, Commit, Kind, Object};
use crate::oid::Oid;
use crate::repo::Repository;

/// a commit with its oid, ready for display
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub oid: Oid,
    pub commit: Commit,
}

enum Visit {
    Discover(Oid),
    Emit(Box<LogEntry>),
}

/// commit history from a starting name, newest first
///
/// the walk is a depth-first post-order over all parents with a seen
/// set (a malformed repository cannot loop it); the collected order is
/// reversed for presentation.
pub fn log(repo: &Repository, start: &str) -> Result<Vec<LogEntry>> {
    let start_oid = find(repo, start, Some(Kind::Commit), true)?;

    let mut seen: HashSet<Oid> = HashSet::new();
    let mut stack = vec![Visit::Discover(start_oid)];
    let mut entries = Vec::new();

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Emit(entry) => entries.push(*entry),
            Visit::Discover(oid) => {
                if !seen.insert(oid) {
                    continue;
                }
                let Object::Commit(commit) = read_object(repo, &oid)? else {
                    return Err(Error::Malformed(format!("{} is not a commit", oid)));
                };
                let parents = commit.parents()?;
                stack.push(Visit::Emit(Box::new(LogEntry { oid, commit })));
                for parent in parents.into_iter().rev() {
                    stack.push(Visit::Discover(parent));
                }
            }
        }
    }

    entries.reverse();
    Ok(entries)
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", format!("commit {}", self.oid).yellow())?;

        if let Some(author) = self.commit.author() {
            let author = String::from_utf8_lossy(author);
            match parse_author(&author) {
                Some((identity, timestamp, offset)) => {
                    writeln!(f, "Author: {}", identity)?;
                    writeln!(f, "Date:   {} {}", format_date(timestamp), offset)?;
                }
                None => writeln!(f, "Author: {}", author)?,
            }
        }

        writeln!(f)?;
        for line in String::from_utf8_lossy(self.commit.message()).lines() {
            writeln!(f, "    {}", line)?;
        }
        Ok(())
    }
}

/// split `Name <email> <secs> <±HHMM>` from the right
fn parse_author(author: &str) -> Option<(&str, i64, &str)> {
    let mut parts = author.rsplitn(3, ' ');
    let offset = parts.next()?;
    let timestamp: i64 = parts.next()?.parse().ok()?;
    let identity = parts.next()?;
    Some((identity, timestamp, offset))
}

/// `Wed Jan 02 15:04:05 2006`, in the recorded clock's UTC
fn format_date(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(datetime) => datetime.format("%a %b %d %H:%M:%S %Y").to_string(),
        None => timestamp.to_string(),
    }
}
