//! Repository gateway abstraction layer
//!
//! The release workflow never talks to git or to the hosting service directly.
//! It goes through the [RepositoryGateway] trait, which has two implementations:
//!
//! - [repository::Git2Gateway]: the real one, using the `git2` crate for
//!   repository access and an external release tool for publication
//! - [mock::MockGateway]: an in-memory double that records every call
//!
//! ```rust
//! # use gdp::git::RepositoryGateway;
//! # fn example<G: RepositoryGateway>(gateway: &G) -> Result<(), gdp::GatewayError> {
//! let previous = gateway.previous_tag("HEAD");
//! let merges = gateway.merge_commits_between(&previous, "HEAD")?;
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{GatewayCall, MockGateway};
pub use repository::Git2Gateway;

use crate::error::GatewayError;

/// Revision naming the working tree head.
pub const HEAD: &str = "HEAD";

/// Capabilities the release workflow needs from the repository.
///
/// The boolean queries never fail: a query that cannot be answered counts as
/// `false`, which makes the corresponding validation abort.
pub trait RepositoryGateway {
    /// Whether `HEAD` is on the designated release branch.
    fn is_on_release_branch(&self) -> bool;

    /// Whether `tag` exists in the local repository.
    fn tag_exists_locally(&self, tag: &str) -> bool;

    /// Whether `tag` exists in the remote repository.
    fn tag_exists_in_remote(&self, tag: &str) -> bool;

    /// Merge commits reachable from `to_inclusive` but not from
    /// `from_exclusive`, one `- <author>: <body>` line each.
    ///
    /// An empty `from_exclusive` means "from the first commit".
    fn merge_commits_between(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
    ) -> Result<String, GatewayError>;

    /// Most recent tag reachable from `HEAD`, or an empty string when the
    /// repository has no tags yet.
    fn latest_tag(&self) -> String;

    /// Most recent tag reachable from the first parent of `rev`, or an empty
    /// string. This is the lower bound of the release note for `rev`.
    fn previous_tag(&self, rev: &str) -> String;

    /// Creates `tag` on `HEAD` and pushes it to the remote.
    ///
    /// Creation and push are separate steps: if the push fails, the local tag
    /// stays in place.
    fn deploy(&self, tag: &str) -> Result<(), GatewayError>;

    /// Publishes a hosted release for the existing `tag` with `note` as body.
    fn publish(&self, tag: &str, note: &str) -> Result<(), GatewayError>;
}

impl<G: RepositoryGateway + ?Sized> RepositoryGateway for &G {
    fn is_on_release_branch(&self) -> bool {
        (**self).is_on_release_branch()
    }

    fn tag_exists_locally(&self, tag: &str) -> bool {
        (**self).tag_exists_locally(tag)
    }

    fn tag_exists_in_remote(&self, tag: &str) -> bool {
        (**self).tag_exists_in_remote(tag)
    }

    fn merge_commits_between(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
    ) -> Result<String, GatewayError> {
        (**self).merge_commits_between(from_exclusive, to_inclusive)
    }

    fn latest_tag(&self) -> String {
        (**self).latest_tag()
    }

    fn previous_tag(&self, rev: &str) -> String {
        (**self).previous_tag(rev)
    }

    fn deploy(&self, tag: &str) -> Result<(), GatewayError> {
        (**self).deploy(tag)
    }

    fn publish(&self, tag: &str, note: &str) -> Result<(), GatewayError> {
        (**self).publish(tag, note)
    }
}
