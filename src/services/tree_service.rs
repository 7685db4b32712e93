use tracing::warn;

use crate::models::FileNode;

/// Apply one drag-and-drop edit to a proposed tree.
///
/// Works on a deep clone, so the caller's previous reference stays valid and
/// can back a UI-level undo stack. A move is a no-op when the source is
/// missing, and is rejected outright when the target directory is missing or
/// sits inside the moved subtree; the original behavior there was to drop the
/// node on the floor.
pub fn move_node(tree: &FileNode, source_path: &str, target_dir_path: &str) -> FileNode {
    let mut edited = tree.clone();

    if edited.find(source_path).is_none() {
        return edited;
    }
    match edited.find(target_dir_path) {
        Some(target) if target.is_dir() => {}
        _ => {
            warn!("rejecting move of {source_path}: no directory at {target_dir_path}");
            return edited;
        }
    }

    let Some(node) = edited.remove(source_path) else {
        // Source is the root itself; roots do not move.
        return edited;
    };
    if edited.insert_child(target_dir_path, node).is_some() {
        // Target vanished with the removal: it was inside the moved subtree.
        warn!("rejecting move of {source_path} into its own subtree {target_dir_path}");
        return tree.clone();
    }

    edited.recompute_sizes();
    edited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> FileNode {
        FileNode::directory(
            "/data",
            "data",
            0,
            vec![
                FileNode::directory(
                    "virtual://docs-1",
                    "Documents",
                    0,
                    vec![FileNode::file("/data/a.txt", "a.txt", 10, 0)],
                ),
                FileNode::directory(
                    "virtual://img-1",
                    "Images",
                    0,
                    vec![FileNode::file("/data/b.jpg", "b.jpg", 4, 0)],
                ),
            ],
        )
    }

    #[test]
    fn moves_node_to_end_of_target_directory() {
        let tree = proposal();
        let edited = move_node(&tree, "/data/a.txt", "virtual://img-1");

        assert!(edited.find("virtual://docs-1").unwrap().flatten_files().is_empty());
        let images = edited.find("virtual://img-1").unwrap();
        let names: Vec<&str> = images
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["b.jpg", "a.txt"]);
        assert_eq!(images.size, 14);
    }

    #[test]
    fn original_tree_is_left_untouched() {
        let tree = proposal();
        let before = serde_json::to_string(&tree).unwrap();
        let _ = move_node(&tree, "/data/a.txt", "virtual://img-1");
        assert_eq!(serde_json::to_string(&tree).unwrap(), before);
    }

    #[test]
    fn missing_source_is_a_no_op() {
        let tree = proposal();
        let edited = move_node(&tree, "/data/nope.txt", "virtual://img-1");
        assert_eq!(
            serde_json::to_string(&edited).unwrap(),
            serde_json::to_string(&tree).unwrap()
        );
    }

    #[test]
    fn missing_target_rejects_the_move_instead_of_dropping_the_node() {
        let tree = proposal();
        let edited = move_node(&tree, "/data/a.txt", "virtual://nowhere");
        assert_eq!(edited.file_count(), 2);
        assert!(edited.find("/data/a.txt").is_some());
    }

    #[test]
    fn file_target_rejects_the_move() {
        let tree = proposal();
        let edited = move_node(&tree, "/data/a.txt", "/data/b.jpg");
        assert!(edited.find("virtual://docs-1").unwrap().find("/data/a.txt").is_some());
    }

    #[test]
    fn moving_a_directory_into_its_own_subtree_is_rejected() {
        let tree = FileNode::directory(
            "/data",
            "data",
            0,
            vec![FileNode::directory(
                "virtual://outer-1",
                "outer",
                0,
                vec![FileNode::directory("virtual://inner-1", "inner", 0, Vec::new())],
            )],
        );
        let edited = move_node(&tree, "virtual://outer-1", "virtual://inner-1");
        assert_eq!(
            serde_json::to_string(&edited).unwrap(),
            serde_json::to_string(&tree).unwrap()
        );
    }
}
