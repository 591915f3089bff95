//! Version chains.
//!
//! Versions are ordinary prompt records linked by metadata: every member
//! of a lineage shares a group id, and each non-initial version points
//! back at the record it was derived from. Creating a version never
//! mutates the source; restoring an old version appends a new head rather
//! than rewinding the chain, so forward history is preserved. Deleting a
//! version is an ordinary delete with no chain repair; lineage queries key
//! on the group id so gaps are tolerated.

use chrono::Utc;
use uuid::Uuid;

use crate::prompt::Prompt;

/// One past the highest version number currently present in the group.
pub fn next_version_number(group: Uuid, library: &[Prompt]) -> u32 {
    library
        .iter()
        .filter(|p| p.group_id() == group)
        .map(|p| p.version_number)
        .max()
        .map_or(1, |n| n + 1)
}

/// Derives a new version from `source`: fresh id and timestamps, copied
/// content fields, the source's lineage group, and a back-reference to the
/// source. The source record is left untouched.
pub fn create_version(source: &Prompt, library: &[Prompt]) -> Prompt {
    let group = source.group_id();
    let now = Utc::now();
    Prompt {
        id: Uuid::new_v4(),
        name: source.name.clone(),
        content: source.content.clone(),
        category: source.category,
        custom_category: source.custom_category.clone(),
        tags: source.tags.clone(),
        pinned: source.pinned,
        sensitive: source.sensitive,
        created_at: now,
        updated_at: now,
        version_group_id: Some(group),
        version_number: next_version_number(group, library),
        previous_version_id: Some(source.id),
    }
}

/// Makes `version`'s content the new head of its chain by deriving a new
/// version from it. Forward versions stay in place.
pub fn restore(version: &Prompt, library: &[Prompt]) -> Prompt {
    create_version(version, library)
}

/// All members of a lineage, newest first.
pub fn history(group: Uuid, library: &[Prompt]) -> Vec<&Prompt> {
    let mut members: Vec<&Prompt> = library.iter().filter(|p| p.group_id() == group).collect();
    members.sort_by(|a, b| b.version_number.cmp(&a.version_number));
    members
}

/// The member of a lineage with the highest version number.
pub fn head(group: Uuid, library: &[Prompt]) -> Option<&Prompt> {
    library
        .iter()
        .filter(|p| p.group_id() == group)
        .max_by_key(|p| p.version_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Category;

    fn base() -> Prompt {
        Prompt::new(
            "versioned".to_string(),
            "v1 content".to_string(),
            Category::Template,
        )
    }

    #[test]
    fn test_create_version_links_to_source() {
        let source = base();
        let library = vec![source.clone()];

        let v2 = create_version(&source, &library);

        assert_ne!(source.id, v2.id);
        assert_eq!(source.group_id(), v2.group_id());
        assert_eq!(Some(source.id), v2.previous_version_id);
        assert_eq!(source.version_number + 1, v2.version_number);
        assert_eq!(source.content, v2.content);

        // Source is untouched; both are independently retrievable.
        assert_eq!(1, library[0].version_number);
        assert!(library[0].previous_version_id.is_none());
    }

    #[test]
    fn test_restore_appends_past_forward_versions() {
        let v1 = base();
        let mut library = vec![v1.clone()];
        let v2 = create_version(&v1, &library);
        library.push(v2.clone());
        let v3 = create_version(&v2, &library);
        library.push(v3.clone());

        // Restoring v1 must not overwrite v2/v3; it becomes a new head.
        let restored = restore(&v1, &library);
        library.push(restored.clone());

        assert_eq!(4, restored.version_number);
        assert_eq!(Some(v1.id), restored.previous_version_id);
        assert_eq!("v1 content", restored.content);
        assert_eq!(4, history(v1.group_id(), &library).len());
        assert_eq!(restored.id, head(v1.group_id(), &library).unwrap().id);
    }

    #[test]
    fn test_history_is_newest_first() {
        let v1 = base();
        let mut library = vec![v1.clone()];
        let v2 = create_version(&v1, &library);
        library.push(v2.clone());
        let v3 = create_version(&v2, &library);
        library.push(v3.clone());

        let chain = history(v1.group_id(), &library);
        let numbers: Vec<u32> = chain.iter().map(|p| p.version_number).collect();
        assert_eq!(vec![3, 2, 1], numbers);
    }

    #[test]
    fn test_deleting_a_version_does_not_break_the_lineage() {
        let v1 = base();
        let mut library = vec![v1.clone()];
        let v2 = create_version(&v1, &library);
        library.push(v2.clone());
        let v3 = create_version(&v2, &library);
        library.push(v3.clone());

        // Ordinary delete of the middle version; no chain repair happens.
        library.retain(|p| p.id != v2.id);

        let chain = history(v1.group_id(), &library);
        assert_eq!(2, chain.len());
        assert_eq!(v3.id, head(v1.group_id(), &library).unwrap().id);
        // v3 still points at the deleted record; that dangling reference
        // is accepted behavior.
        assert_eq!(Some(v2.id), v3.previous_version_id);
    }

    #[test]
    fn test_unrelated_groups_are_independent() {
        let a = base();
        let mut other = base();
        other.name = "unrelated".to_string();
        let library = vec![a.clone(), other.clone()];

        let a2 = create_version(&a, &library);
        assert_eq!(2, a2.version_number);
        assert_eq!(1, next_version_number(other.group_id(), &library));
    }
}
