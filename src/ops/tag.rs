use chrono::Local;

use crate::error::Result;
use crate::object::{find, read_object, write_object, Object, Tag};
use crate::oid::Oid;
use crate::refs;
use crate::repo::Repository;

/// names of all tags, in listing order
pub fn tag_list(repo: &Repository) -> Result<Vec<String>> {
    let tree = refs::list(repo, "refs/tags")?;
    Ok(refs::flatten(&tree, "")
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// create a tag pointing at a resolvable name
///
/// a lightweight tag is just a ref at the target oid; an annotated tag
/// writes a tag object (with tagger and message) and points the ref at
/// that instead.
pub fn tag_create(
    repo: &Repository,
    name: &str,
    target: &str,
    annotated: bool,
    message: &str,
) -> Result<Oid> {
    let target_oid = find(repo, target, None, true)?;

    let ref_target = if annotated {
        let kind = read_object(repo, &target_oid)?.kind();
        let now = Local::now();
        let tagger = format!(
            "{} {} {}",
            repo.config().user_identity(),
            now.timestamp(),
            now.format("%z")
        );
        let tag = Tag::new(target_oid, kind, name, &tagger, message);
        write_object(repo, &Object::Tag(tag))?
    } else {
        target_oid
    };

    refs::create(repo, &format!("refs/tags/{}", name), &ref_target)?;
    Ok(ref_target)
}
