use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::FileNode;
use crate::services::strategy_service::{proposed_root, virtual_path};

/// Guard against sending unbounded prompts; larger selections should be
/// organized by time or type instead.
pub const MAX_TOPIC_FILES: usize = 2_000;

/// The external classification capability consumed by the topic strategy.
/// Implementations wrap a chat-completion client; only file names are ever
/// sent, never file contents.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Returns the raw reply text for the given file names and instructions.
    async fn classify(&self, file_names: &[String], instructions: &str)
        -> Result<String, AppError>;
}

pub async fn apply_topic(
    root: &FileNode,
    classifier: &dyn TopicClassifier,
) -> Result<FileNode, AppError> {
    let files = root.flatten_files();
    if files.len() > MAX_TOPIC_FILES {
        return Err(AppError::Classification(format!(
            "too many files for topic organization: {} (limit {MAX_TOPIC_FILES})",
            files.len()
        )));
    }

    // Duplicate base names collapse to one prompt entry; every node sharing
    // the name follows the bucket that name is assigned to.
    let mut unique_names: Vec<String> = Vec::new();
    let mut by_name: HashMap<&str, Vec<&FileNode>> = HashMap::new();
    for file in &files {
        let entry = by_name.entry(file.name.as_str()).or_default();
        if entry.is_empty() {
            unique_names.push(file.name.clone());
        }
        entry.push(*file);
    }

    let instructions = build_instructions(&unique_names);
    let reply = classifier.classify(&unique_names, &instructions).await?;
    if reply.trim().is_empty() {
        return Err(AppError::Classification(
            "classifier returned an empty reply".to_string(),
        ));
    }

    let payload = extract_json_payload(&reply).ok_or_else(|| {
        AppError::Classification("classifier reply did not contain a JSON payload".to_string())
    })?;
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
        AppError::Classification(format!("classifier reply was not valid JSON: {e}"))
    })?;
    let buckets = value.as_object().ok_or_else(|| {
        AppError::Classification("classifier reply was not a topic-to-files object".to_string())
    })?;

    let mut placed: HashSet<String> = HashSet::new();
    let mut children = Vec::new();
    for (topic, names) in buckets {
        let topic = topic.trim();
        // A blank topic key must not claim its names; leaving them unplaced
        // routes them to Uncategorized below.
        if topic.is_empty() {
            continue;
        }
        let Some(names) = names.as_array() else {
            continue;
        };
        let mut bucket = Vec::new();
        for name in names.iter().filter_map(|v| v.as_str()) {
            if placed.contains(name) {
                continue;
            }
            // Names the model invented are dropped, not trusted.
            if let Some(nodes) = by_name.get(name) {
                bucket.extend(nodes.iter().map(|n| (*n).clone()));
                placed.insert(name.to_string());
            }
        }
        if !bucket.is_empty() {
            children.push(FileNode::directory(virtual_path(topic), topic, 0, bucket));
        }
    }

    let mut leftovers = Vec::new();
    for name in &unique_names {
        if !placed.contains(name) {
            if let Some(nodes) = by_name.get(name.as_str()) {
                leftovers.extend(nodes.iter().map(|n| (*n).clone()));
            }
        }
    }
    if !leftovers.is_empty() {
        children.push(FileNode::directory(
            virtual_path("Uncategorized"),
            "Uncategorized",
            0,
            leftovers,
        ));
    }

    Ok(proposed_root(root, children))
}

fn build_instructions(file_names: &[String]) -> String {
    let mut prompt = String::from(
        "You are organizing a folder. Partition the following file names into topic buckets.\n\
         Respond with a single JSON object mapping each topic name to an array of file names.\n\
         Use every input file name exactly as given, place each file in exactly one bucket,\n\
         and respond with JSON only, no commentary.\n\nFiles:\n",
    );
    for name in file_names {
        prompt.push_str("- ");
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt
}

/// Pull the JSON body out of a reply that may wrap it in a markdown fence,
/// with or without a `json` language tag.
fn extract_json_payload(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(open) = trimmed.find("```") {
        let rest = &trimmed[open + 3..];
        if let Some(close) = rest.find("```") {
            let body = rest[..close].trim_start_matches("json");
            return Some(body.trim());
        }
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    (first <= last).then(|| &trimmed[first..=last])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClassifier {
        reply: String,
    }

    #[async_trait]
    impl TopicClassifier for StubClassifier {
        async fn classify(
            &self,
            _file_names: &[String],
            _instructions: &str,
        ) -> Result<String, AppError> {
            Ok(self.reply.clone())
        }
    }

    fn snapshot() -> FileNode {
        FileNode::directory(
            "/data",
            "data",
            0,
            vec![
                FileNode::file("/data/tax_2023.pdf", "tax_2023.pdf", 1, 0),
                FileNode::file("/data/beach.jpg", "beach.jpg", 1, 0),
                FileNode::file("/data/notes.txt", "notes.txt", 1, 0),
            ],
        )
    }

    async fn run(reply: &str) -> Result<FileNode, AppError> {
        let classifier = StubClassifier {
            reply: reply.to_string(),
        };
        apply_topic(&snapshot(), &classifier).await
    }

    #[tokio::test]
    async fn buckets_fence_wrapped_reply() {
        let proposed = run(
            "Here you go:\n```json\n{\"Finances\": [\"tax_2023.pdf\"], \"Photos\": [\"beach.jpg\"], \"Writing\": [\"notes.txt\"]}\n```",
        )
        .await
        .unwrap();

        let topics: Vec<&str> = proposed
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(topics, vec!["Finances", "Photos", "Writing"]);
        assert_eq!(proposed.file_count(), 3);
    }

    #[tokio::test]
    async fn invented_names_are_dropped_and_leftovers_go_to_uncategorized() {
        let proposed = run("{\"Photos\": [\"beach.jpg\", \"ghost.png\"]}").await.unwrap();

        let topics: Vec<&str> = proposed
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(topics, vec!["Photos", "Uncategorized"]);
        assert!(proposed.find("ghost.png").is_none());

        let uncategorized = proposed.children.as_ref().unwrap().last().unwrap();
        let names: Vec<&str> = uncategorized
            .flatten_files()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["tax_2023.pdf", "notes.txt"]);
    }

    #[tokio::test]
    async fn blank_topic_keys_do_not_swallow_their_files() {
        let proposed = run("{\"\": [\"beach.jpg\"], \"Writing\": [\"notes.txt\"]}")
            .await
            .unwrap();

        assert_eq!(proposed.file_count(), 3);
        let topics: Vec<&str> = proposed
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(topics, vec!["Writing", "Uncategorized"]);

        let uncategorized = proposed.children.as_ref().unwrap().last().unwrap();
        assert!(uncategorized.find("/data/beach.jpg").is_some());
    }

    #[tokio::test]
    async fn each_input_lands_in_exactly_one_bucket() {
        // The same name listed under two topics only counts once.
        let proposed = run(
            "{\"A\": [\"beach.jpg\", \"notes.txt\"], \"B\": [\"beach.jpg\", \"tax_2023.pdf\"]}",
        )
        .await
        .unwrap();

        assert_eq!(proposed.file_count(), 3);
        let all_names: Vec<&str> = proposed
            .flatten_files()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(all_names.iter().filter(|n| **n == "beach.jpg").count(), 1);
    }

    #[tokio::test]
    async fn duplicate_base_names_follow_their_bucket_together() {
        let root = FileNode::directory(
            "/data",
            "data",
            0,
            vec![
                FileNode::file("/data/a/report.txt", "report.txt", 1, 0),
                FileNode::file("/data/b/report.txt", "report.txt", 1, 0),
            ],
        );
        let classifier = StubClassifier {
            reply: "{\"Reports\": [\"report.txt\"]}".to_string(),
        };
        let proposed = apply_topic(&root, &classifier).await.unwrap();

        assert_eq!(proposed.children.as_ref().unwrap().len(), 1);
        assert_eq!(proposed.file_count(), 2);
        assert!(proposed.find("/data/a/report.txt").is_some());
        assert!(proposed.find("/data/b/report.txt").is_some());
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let err = run("   ").await.unwrap_err();
        assert!(err.to_string().contains("empty reply"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_an_error() {
        let err = run("```json\n{not json at all]\n```").await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn non_object_reply_is_an_error() {
        let err = run("[\"beach.jpg\"]").await.unwrap_err();
        assert!(err.to_string().contains("JSON payload"));
    }

    #[tokio::test]
    async fn too_many_files_is_an_error() {
        let children = (0..=MAX_TOPIC_FILES)
            .map(|i| FileNode::file(format!("/data/f{i}.txt"), format!("f{i}.txt"), 1, 0))
            .collect();
        let root = FileNode::directory("/data", "data", 0, children);
        let classifier = StubClassifier {
            reply: "{}".to_string(),
        };
        let err = apply_topic(&root, &classifier).await.unwrap_err();
        assert!(err.to_string().contains("too many files"));
    }

    #[test]
    fn extract_json_payload_handles_codeblock() {
        let text = "hello\n```json\n{\"Photos\": []}\n```\n";
        assert_eq!(extract_json_payload(text).unwrap(), "{\"Photos\": []}");
    }

    #[test]
    fn extract_json_payload_handles_untagged_fence() {
        let text = "```\n{\"Photos\": []}\n```";
        assert_eq!(extract_json_payload(text).unwrap(), "{\"Photos\": []}");
    }

    #[test]
    fn extract_json_payload_handles_bare_braces() {
        let text = "Sure! {\"Photos\": []} hope that helps";
        assert_eq!(extract_json_payload(text).unwrap(), "{\"Photos\": []}");
    }
}
