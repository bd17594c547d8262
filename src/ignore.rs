use std::collections::HashMap;
use std::path::PathBuf;

use glob::Pattern;

use crate::config::xdg_config_home;
use crate::error::{Error, Result};
use crate::fs::Root;
use crate::index::Index;
use crate::object::{read_object, Object};
use crate::repo::Repository;

/// a single ignore rule: pattern plus its effect
///
/// `ignore` is true for plain patterns and false for `!` negations.
#[derive(Clone, Debug)]
pub struct IgnoreRule {
    pattern: Pattern,
    ignore: bool,
}

/// combined ignore rules for a repository
///
/// absolute rule files (info/exclude, the global ignore file) apply
/// everywhere; scoped rule sets come from `.gitignore` blobs recorded
/// in the index and apply below their directory.
#[derive(Clone, Debug, Default)]
pub struct Ignore {
    absolute: Vec<Vec<IgnoreRule>>,
    scoped: HashMap<String, Vec<IgnoreRule>>,
}

impl Ignore {
    /// gather ignore rules from every source
    pub fn read(repo: &Repository) -> Result<Self> {
        let mut result = Self::default();

        if repo.fs().file_exists("info/exclude", Root::Git) {
            let content = repo.fs().file_read_text("info/exclude", Root::Git)?;
            result.absolute.push(parse_lines(&content));
        }

        if let Some(config_home) = xdg_config_home() {
            let global = config_home.join("git/ignore");
            if global.is_file() {
                let content = std::fs::read_to_string(&global).map_err(|e| Error::Io {
                    path: global,
                    source: e,
                })?;
                result.absolute.push(parse_lines(&content));
            }
        }

        let index = Index::read(repo)?;
        for entry in index.entries() {
            if entry.name != ".gitignore" && !entry.name.ends_with("/.gitignore") {
                continue;
            }
            let dir = parent_dir(&entry.name).to_string();
            let object = read_object(repo, &entry.oid)?;
            let Object::Blob(blob) = object else {
                return Err(Error::Malformed(format!(
                    "index entry {} does not name a blob",
                    entry.name
                )));
            };
            let content = String::from_utf8_lossy(blob.data()).to_string();
            result.scoped.insert(dir, parse_lines(&content));
        }

        Ok(result)
    }

    /// decide whether a repo-relative path is ignored
    ///
    /// scoped rule sets are consulted from the deepest enclosing
    /// directory outward and the first scope with a verdict wins;
    /// absolute rules are the fallback. within a rule set the last
    /// matching rule decides.
    pub fn check(&self, path: &str) -> Result<bool> {
        if path.starts_with('/') {
            return Err(Error::PathOutsideWorktree(PathBuf::from(path)));
        }

        let mut dir = parent_dir(path);
        loop {
            if let Some(rules) = self.scoped.get(dir) {
                // match relative to the scope directory
                let scoped_path = if dir.is_empty() {
                    path
                } else {
                    &path[dir.len() + 1..]
                };
                if let Some(verdict) = check_rules(rules, scoped_path) {
                    return Ok(verdict);
                }
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_dir(dir);
        }

        for rules in &self.absolute {
            if let Some(verdict) = check_rules(rules, path) {
                return Ok(verdict);
            }
        }

        Ok(false)
    }
}

/// last matching rule wins; None when nothing matched
fn check_rules(rules: &[IgnoreRule], path: &str) -> Option<bool> {
    let mut verdict = None;
    for rule in rules {
        if rule.pattern.matches(path) {
            verdict = Some(rule.ignore);
        }
    }
    verdict
}

fn parse_lines(content: &str) -> Vec<IgnoreRule> {
    content.lines().filter_map(parse_line).collect()
}

/// parse one ignore line; comments and blanks yield nothing
fn parse_line(line: &str) -> Option<IgnoreRule> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (raw, ignore) = match line.strip_prefix('!') {
        Some(rest) => (rest, false),
        None => match line.strip_prefix('\\') {
            Some(rest) => (rest, true),
            None => (line, true),
        },
    };
    match Pattern::new(raw) {
        Ok(pattern) => Some(IgnoreRule { pattern, ignore }),
        Err(_) => {
            log::warn!("skipping unparseable ignore pattern: {}", raw);
            None
        }
    }
}

/// everything before the last slash, or "" at the top level
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}
