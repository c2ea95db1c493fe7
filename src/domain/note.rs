/// Formats the release note for `tag` from a list of merge commit lines.
///
/// The same text is shown in dry-run previews and sent to the release tool,
/// so the preview always matches what gets published.
pub fn build_note(tag: &str, merge_commits: &str) -> String {
    format!("Release {tag}\n\n## {tag}\n{merge_commits}")
}
