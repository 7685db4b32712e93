use crate::models::{FileNode, MoveOperation};

/// Compare a proposed tree against the scan root it was derived from and
/// return the file moves needed to realize it on disk.
///
/// The proposed root's own name is not re-applied; `original_root_path` is the
/// base context and each directory below contributes only its `name` (never
/// its synthetic path). Directories themselves never produce operations —
/// destination directories are created at execution time and emptied ones are
/// abandoned.
pub fn compute_moves(original_root_path: &str, proposed: &FileNode) -> Vec<MoveOperation> {
    let mut operations = Vec::new();
    let base = normalize_path(original_root_path);
    if let Some(children) = &proposed.children {
        for child in children {
            walk(child, &base, &mut operations);
        }
    }
    operations
}

fn walk(node: &FileNode, context: &str, operations: &mut Vec<MoveOperation>) {
    match &node.children {
        Some(children) => {
            let context = join_normalized(context, &node.name);
            for child in children {
                walk(child, &context, operations);
            }
        }
        None => {
            let destination = join_normalized(context, &node.name);
            if normalize_path(&node.path) != destination {
                operations.push(MoveOperation::new(node.path.clone(), destination));
            }
        }
    }
}

fn normalize_path(path: &str) -> String {
    let mut out = path.replace('\\', "/");
    while out.ends_with('/') && out.len() > 1 {
        out.pop();
    }
    out
}

fn join_normalized(base: &str, tail: &str) -> String {
    if base == "/" {
        format!("/{tail}")
    } else {
        format!("{base}/{tail}")
    }
}
