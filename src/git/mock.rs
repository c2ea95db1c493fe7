use crate::error::GatewayError;
use crate::git::RepositoryGateway;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// A call received by [MockGateway], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    IsOnReleaseBranch,
    TagExistsLocally(String),
    TagExistsInRemote(String),
    MergeCommitsBetween(String, String),
    LatestTag,
    PreviousTag(String),
    Deploy(String),
    Publish(String, String),
}

impl GatewayCall {
    /// Whether this call changes the repository or the hosted releases.
    pub fn is_mutation(&self) -> bool {
        matches!(self, GatewayCall::Deploy(_) | GatewayCall::Publish(_, _))
    }

    /// Whether this call is one of the precondition queries.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GatewayCall::IsOnReleaseBranch
                | GatewayCall::TagExistsLocally(_)
                | GatewayCall::TagExistsInRemote(_)
        )
    }
}

/// Mock gateway for testing without actual git operations
pub struct MockGateway {
    on_release_branch: bool,
    local_tags: HashSet<String>,
    remote_tags: HashSet<String>,
    latest_tag: String,
    previous_tags: HashMap<String, String>,
    merge_commits: String,
    merge_commits_failure: Option<String>,
    deploy_failure: Option<String>,
    publish_failure: Option<String>,
    calls: RefCell<Vec<GatewayCall>>,
}

impl MockGateway {
    /// Create a mock on the release branch with no tags at all
    pub fn new() -> Self {
        MockGateway {
            on_release_branch: true,
            local_tags: HashSet::new(),
            remote_tags: HashSet::new(),
            latest_tag: String::new(),
            previous_tags: HashMap::new(),
            merge_commits: String::new(),
            merge_commits_failure: None,
            deploy_failure: None,
            publish_failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn set_on_release_branch(&mut self, on_release_branch: bool) {
        self.on_release_branch = on_release_branch;
    }

    pub fn add_local_tag(&mut self, tag: impl Into<String>) {
        self.local_tags.insert(tag.into());
    }

    pub fn add_remote_tag(&mut self, tag: impl Into<String>) {
        self.remote_tags.insert(tag.into());
    }

    pub fn set_latest_tag(&mut self, tag: impl Into<String>) {
        self.latest_tag = tag.into();
    }

    /// Set the tag reported as preceding `rev`
    pub fn set_previous_tag(&mut self, rev: impl Into<String>, tag: impl Into<String>) {
        self.previous_tags.insert(rev.into(), tag.into());
    }

    pub fn set_merge_commits(&mut self, merge_commits: impl Into<String>) {
        self.merge_commits = merge_commits.into();
    }

    pub fn fail_merge_commits(&mut self, message: impl Into<String>) {
        self.merge_commits_failure = Some(message.into());
    }

    pub fn fail_deploy(&mut self, message: impl Into<String>) {
        self.deploy_failure = Some(message.into());
    }

    pub fn fail_publish(&mut self, message: impl Into<String>) {
        self.publish_failure = Some(message.into());
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.borrow_mut().push(call);
    }

    fn outcome(failure: &Option<String>, program: &str) -> Result<(), GatewayError> {
        match failure {
            Some(output) => Err(GatewayError::Command {
                program: program.to_string(),
                output: output.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryGateway for MockGateway {
    fn is_on_release_branch(&self) -> bool {
        self.record(GatewayCall::IsOnReleaseBranch);
        self.on_release_branch
    }

    fn tag_exists_locally(&self, tag: &str) -> bool {
        self.record(GatewayCall::TagExistsLocally(tag.to_string()));
        self.local_tags.contains(tag)
    }

    fn tag_exists_in_remote(&self, tag: &str) -> bool {
        self.record(GatewayCall::TagExistsInRemote(tag.to_string()));
        self.remote_tags.contains(tag)
    }

    fn merge_commits_between(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
    ) -> Result<String, GatewayError> {
        self.record(GatewayCall::MergeCommitsBetween(
            from_exclusive.to_string(),
            to_inclusive.to_string(),
        ));
        Self::outcome(&self.merge_commits_failure, "git")?;
        Ok(self.merge_commits.clone())
    }

    fn latest_tag(&self) -> String {
        self.record(GatewayCall::LatestTag);
        self.latest_tag.clone()
    }

    fn previous_tag(&self, rev: &str) -> String {
        self.record(GatewayCall::PreviousTag(rev.to_string()));
        self.previous_tags.get(rev).cloned().unwrap_or_default()
    }

    fn deploy(&self, tag: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Deploy(tag.to_string()));
        Self::outcome(&self.deploy_failure, "git")
    }

    fn publish(&self, tag: &str, note: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Publish(tag.to_string(), note.to_string()));
        Self::outcome(&self.publish_failure, "hub")
    }
}
