use crate::config::{Config, ReleaseTool};
use crate::error::GatewayError;
use crate::git::RepositoryGateway;
use git2::{
    Commit, DescribeFormatOptions, DescribeOptions, Oid, RemoteCallbacks, Repository as Git2Repo,
    Sort,
};
use std::path::Path;
use std::process::Command;

/// Production gateway: `git2` for the repository, an external tool for releases.
pub struct Git2Gateway {
    repo: Git2Repo,
    release_branch: String,
    remote: String,
    tool: ReleaseTool,
}

impl Git2Gateway {
    /// Discover the repository containing `path` and check that the release
    /// tool is installed and authenticated.
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self, GatewayError> {
        let repo = Git2Repo::discover(path)?;

        ensure_available(config.publish.tool)?;
        ensure_credentials(config.publish.tool)?;

        Ok(Self::from_git2(repo, config))
    }

    /// Create from an existing git2::Repository, skipping the tool checks
    pub fn from_git2(repo: Git2Repo, config: &Config) -> Self {
        Git2Gateway {
            repo,
            release_branch: config.release_branch.clone(),
            remote: config.remote.clone(),
            tool: config.publish.tool,
        }
    }

    fn resolve_commit(&self, rev: &str) -> Result<Commit<'_>, git2::Error> {
        self.repo.revparse_single(rev)?.peel_to_commit()
    }

    /// Equivalent of `git describe --tags --abbrev=0 <rev>`.
    fn describe_tag(&self, rev: &str) -> Option<String> {
        let object = self.repo.revparse_single(rev).ok()?;

        let mut options = DescribeOptions::new();
        options.describe_tags();
        let mut format = DescribeFormatOptions::new();
        format.abbreviated_size(0);

        let described = object.describe(&options).ok()?.format(Some(&format)).ok();
        described
    }

    fn create_tag(&self, tag: &str) -> Result<Oid, GatewayError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let oid = self.repo.tag_lightweight(tag, head.as_object(), false)?;
        log::debug!("created tag {} at {}", tag, head.id());
        Ok(oid)
    }

    fn push_tag(&self, tag: &str) -> Result<(), GatewayError> {
        let mut remote = self.repo.find_remote(&self.remote)?;

        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        remote.push(&[refspec.as_str()], Some(&mut push_options))?;
        log::debug!("pushed {} to {}", refspec, self.remote);
        Ok(())
    }
}

impl RepositoryGateway for Git2Gateway {
    fn is_on_release_branch(&self) -> bool {
        match self.repo.head() {
            Ok(head) => head.is_branch() && head.shorthand() == Some(self.release_branch.as_str()),
            Err(e) => {
                log::debug!("cannot read HEAD: {}", e);
                false
            }
        }
    }

    fn tag_exists_locally(&self, tag: &str) -> bool {
        self.repo
            .find_reference(&format!("refs/tags/{}", tag))
            .is_ok()
    }

    fn tag_exists_in_remote(&self, tag: &str) -> bool {
        let reference = format!("refs/tags/{}", tag);
        let peeled = format!("{}^{{}}", reference);

        let mut cmd = Command::new("git");
        cmd.current_dir(self.repo.workdir().unwrap_or_else(|| self.repo.path()))
            .args(["ls-remote", "--tags", self.remote.as_str(), reference.as_str()]);

        match run(&mut cmd, "git") {
            Ok(listing) => listing.lines().any(|line| {
                line.split_whitespace()
                    .nth(1)
                    .is_some_and(|name| name == reference || name == peeled)
            }),
            Err(e) => {
                log::debug!("cannot list tags of '{}': {}", self.remote, e);
                false
            }
        }
    }

    fn merge_commits_between(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
    ) -> Result<String, GatewayError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.simplify_first_parent()?;
        revwalk.push(self.resolve_commit(to_inclusive)?.id())?;
        if !from_exclusive.is_empty() {
            revwalk.hide(self.resolve_commit(from_exclusive)?.id())?;
        }

        let mut lines = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.parent_count() < 2 {
                continue;
            }

            let author = commit.author();
            lines.push(format!(
                "- {}: {}",
                author.name().unwrap_or("unknown"),
                commit.body().unwrap_or("").trim_end()
            ));
        }

        log::debug!(
            "found {} merge commits in {}..{}",
            lines.len(),
            from_exclusive,
            to_inclusive
        );
        Ok(lines.join("\n"))
    }

    fn latest_tag(&self) -> String {
        self.describe_tag(crate::git::HEAD).unwrap_or_default()
    }

    fn previous_tag(&self, rev: &str) -> String {
        self.describe_tag(&format!("{}^", rev)).unwrap_or_default()
    }

    fn deploy(&self, tag: &str) -> Result<(), GatewayError> {
        self.create_tag(tag)?;
        self.push_tag(tag).inspect_err(|_| {
            log::warn!(
                "tag {} was created locally but not pushed to {}; remove it with `git tag -d {}` before retrying",
                tag,
                self.remote,
                tag
            );
        })
    }

    fn publish(&self, tag: &str, note: &str) -> Result<(), GatewayError> {
        let mut cmd = Command::new(self.tool.program());
        match self.tool {
            ReleaseTool::Hub => {
                cmd.args(["release", "create", "-m", note, tag]);
            }
            ReleaseTool::Gh => {
                let (title, body) = note.split_once('\n').unwrap_or((note, ""));
                cmd.args([
                    "release",
                    "create",
                    tag,
                    "--title",
                    title,
                    "--notes",
                    body.trim_start_matches('\n'),
                ]);
            }
        }

        run(&mut cmd, self.tool.program()).map(|_| ())
    }
}

/// SSH key, SSH agent, then default credentials.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        git2::Cred::default()
    });
    callbacks
}

/// Runs `cmd`, returning its combined output, or the output as the error on
/// a non-zero exit.
fn run(cmd: &mut Command, program: &str) -> Result<String, GatewayError> {
    log::debug!("running {:?}", cmd);
    let output = cmd.output().map_err(|e| {
        GatewayError::Unavailable(format!("failed to execute {}: {}", program, e))
    })?;

    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
    .trim_end()
    .to_string();

    if output.status.success() {
        Ok(combined)
    } else {
        Err(GatewayError::Command {
            program: program.to_string(),
            output: combined,
        })
    }
}

fn ensure_available(tool: ReleaseTool) -> Result<(), GatewayError> {
    run(Command::new(tool.program()).arg("--version"), tool.program()).map(|_| ())
}

fn ensure_credentials(tool: ReleaseTool) -> Result<(), GatewayError> {
    match tool {
        ReleaseTool::Hub => {
            let configured = std::env::var_os("GITHUB_TOKEN").is_some()
                || dirs::home_dir()
                    .map(|home| home.join(".config").join("hub").exists())
                    .unwrap_or(false);
            if configured {
                Ok(())
            } else {
                Err(GatewayError::Unavailable(
                    "please setup hub's credential file".to_string(),
                ))
            }
        }
        ReleaseTool::Gh => run(Command::new("gh").args(["auth", "status"]), "gh").map(|_| ()),
    }
}
