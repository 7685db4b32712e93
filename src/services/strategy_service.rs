use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::FileNode;
use crate::services::topic_service::{self, TopicClassifier};

/// Fixed category table for the type strategy; emission order follows this
/// list, with any unexpected category appended alphabetically.
const CATEGORY_ORDER: &[&str] = &[
    "Images",
    "Documents",
    "Audio",
    "Video",
    "Code",
    "Archives",
    "Others",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Time,
    Type,
    Topic,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Type => write!(f, "type"),
            Self::Topic => write!(f, "topic"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "type" => Ok(Self::Type),
            "topic" => Ok(Self::Topic),
            _ => Err(format!("unknown strategy: {s}")),
        }
    }
}

/// Transform a snapshot into a proposed tree without touching the input.
///
/// The returned root keeps the snapshot root's path and name; every directory
/// below it is virtual and every file node is a clone carrying its original
/// real path. The topic strategy needs a classifier; the others ignore it.
pub async fn apply_strategy(
    kind: StrategyKind,
    root: &FileNode,
    classifier: Option<&dyn TopicClassifier>,
) -> Result<FileNode, AppError> {
    match kind {
        StrategyKind::Time => Ok(apply_time(root)),
        StrategyKind::Type => Ok(apply_type(root)),
        StrategyKind::Topic => {
            let classifier = classifier.ok_or_else(|| {
                AppError::Classification(
                    "no classifier configured; topic organization needs one".to_string(),
                )
            })?;
            topic_service::apply_topic(root, classifier).await
        }
    }
}

/// Synthetic directory key, unique per `apply` call, never resolved on disk.
pub(crate) fn virtual_path(name: &str) -> String {
    format!("virtual://{name}-{}", Uuid::new_v4().simple())
}

pub(crate) fn proposed_root(root: &FileNode, children: Vec<FileNode>) -> FileNode {
    FileNode::directory(root.path.clone(), root.name.clone(), root.modified_at, children)
}

fn apply_time(root: &FileNode) -> FileNode {
    let mut buckets: BTreeMap<i32, BTreeMap<u32, Vec<FileNode>>> = BTreeMap::new();
    for file in root.flatten_files() {
        let (year, month) = year_month(file.modified_at);
        buckets
            .entry(year)
            .or_default()
            .entry(month)
            .or_default()
            .push(file.clone());
    }

    let children = buckets
        .into_iter()
        .rev()
        .map(|(year, months)| {
            let year_name = year.to_string();
            let month_dirs = months
                .into_iter()
                .rev()
                .map(|(month, mut files)| {
                    files.sort_by(|a, b| a.name.cmp(&b.name));
                    let month_name = format!("{month:02}");
                    FileNode::directory(virtual_path(&month_name), month_name, 0, files)
                })
                .collect();
            FileNode::directory(virtual_path(&year_name), year_name, 0, month_dirs)
        })
        .collect();

    proposed_root(root, children)
}

fn year_month(millis: i64) -> (i32, u32) {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| (dt.year(), dt.month()))
        .unwrap_or((1970, 1))
}

fn apply_type(root: &FileNode) -> FileNode {
    let mut buckets: HashMap<String, Vec<FileNode>> = HashMap::new();
    for file in root.flatten_files() {
        let extension = Path::new(&file.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        buckets
            .entry(category_for_extension(&extension).to_string())
            .or_default()
            .push(file.clone());
    }

    let mut children = Vec::new();
    for category in CATEGORY_ORDER {
        if let Some(mut files) = buckets.remove(*category) {
            files.sort_by(|a, b| a.name.cmp(&b.name));
            children.push(FileNode::directory(
                virtual_path(category),
                category.to_string(),
                0,
                files,
            ));
        }
    }
    let mut rest: Vec<(String, Vec<FileNode>)> = buckets.into_iter().collect();
    rest.sort_by(|a, b| a.0.cmp(&b.0));
    for (category, mut files) in rest {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        children.push(FileNode::directory(virtual_path(&category), category, 0, files));
    }

    proposed_root(root, children)
}

fn category_for_extension(extension: &str) -> &'static str {
    match extension {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "heic" | "tif" | "tiff" => {
            "Images"
        }
        "txt" | "md" | "doc" | "docx" | "pdf" | "rtf" | "odt" | "pages" | "ppt" | "pptx"
        | "key" | "csv" | "xls" | "xlsx" => "Documents",
        "mp3" | "wav" | "aac" | "flac" | "ogg" | "m4a" => "Audio",
        "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v" => "Video",
        "rs" | "js" | "jsx" | "ts" | "tsx" | "py" | "go" | "java" | "kt" | "swift" | "c" | "cc"
        | "cpp" | "h" | "hpp" | "sh" | "zsh" | "bash" | "html" | "css" | "json" | "toml"
        | "yaml" | "yml" => "Code",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => "Archives",
        _ => "Others",
    }
}
