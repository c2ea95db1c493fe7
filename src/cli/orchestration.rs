//! Release workflow orchestration
//!
//! Both subcommands run through the same linear state machine:
//!
//! ```text
//! Start -> TagResolved -> Validated -> NoteBuilt -> [ConfirmedOrSkipped] -> Executed -> Reported
//! ```
//!
//! Any failure, including a declined confirmation, moves the workflow to
//! [WorkflowState::Aborted] and ends the invocation. Nothing is retried and
//! nothing is rolled back.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use chrono::Timelike;

use crate::clock::Clock;
use crate::config::SafetyWindow;
use crate::domain::{build_note, next_version};
use crate::error::{GdpError, Phase, Result, ValidationError};
use crate::git::{RepositoryGateway, HEAD};
use crate::ui::{Terminal, CLOSING_MESSAGE};

/// The two release subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    /// Cut a new tag from the release branch and push it.
    Deploy,
    /// Publish a hosted release for an existing remote tag.
    Publish,
}

impl FromStr for Subcommand {
    type Err = GdpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deploy" => Ok(Subcommand::Deploy),
            "publish" => Ok(Subcommand::Publish),
            _ => Err(GdpError::usage("Invalid sub command.")),
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subcommand::Deploy => write!(f, "deploy"),
            Subcommand::Publish => write!(f, "publish"),
        }
    }
}

/// Arguments for the release workflow
///
/// Mirrors the CLI arguments without depending on clap, so the workflow can
/// be driven programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowArgs {
    pub subcommand: Subcommand,

    /// Explicit tag, used verbatim when set
    pub tag: Option<String>,

    /// Build and show the note, change nothing
    pub dry_run: bool,

    /// Skip branch and tag-existence validation
    pub force: bool,
}

/// Per-invocation state, returned once the workflow has reported success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowContext {
    pub subcommand: Subcommand,
    pub tag: String,
    pub dry_run: bool,
    pub force: bool,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    TagResolved,
    Validated,
    NoteBuilt,
    /// Hot-fix confirmation given, or not needed.
    ConfirmedOrSkipped,
    Executed,
    Reported,
    Aborted,
}

/// Drives one `deploy` or `publish` invocation.
pub struct ReleaseWorkflow<'a, G: RepositoryGateway> {
    gateway: &'a G,
    clock: &'a dyn Clock,
    safety_window: SafetyWindow,
    state: WorkflowState,
    visited: Vec<WorkflowState>,
}

impl<'a, G: RepositoryGateway> ReleaseWorkflow<'a, G> {
    pub fn new(gateway: &'a G, clock: &'a dyn Clock, safety_window: SafetyWindow) -> Self {
        ReleaseWorkflow {
            gateway,
            clock,
            safety_window,
            state: WorkflowState::Start,
            visited: Vec::new(),
        }
    }

    /// Where the workflow stopped (or currently is).
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn visited(&self) -> &[WorkflowState] {
        &self.visited
    }

    /// Runs the whole workflow, writing progress to `terminal`.
    ///
    /// # Returns
    /// * `Ok(WorkflowContext)` - the release was executed, or previewed in dry-run mode
    /// * `Err` - the first failure; the workflow is left in [WorkflowState::Aborted]
    pub fn run<R: Read, O: Write, E: Write>(
        &mut self,
        args: WorkflowArgs,
        terminal: &mut Terminal<R, O, E>,
    ) -> Result<WorkflowContext> {
        let result = self.drive(args, terminal);
        if let Err(e) = &result {
            log::debug!("workflow aborted in state {:?}: {}", self.state, e);
            self.transition(WorkflowState::Aborted);
        }
        result
    }

    fn drive<R: Read, O: Write, E: Write>(
        &mut self,
        args: WorkflowArgs,
        terminal: &mut Terminal<R, O, E>,
    ) -> Result<WorkflowContext> {
        let tag = self.resolve_tag(args.subcommand, args.tag)?;
        self.transition(WorkflowState::TagResolved);

        let mut context = WorkflowContext {
            subcommand: args.subcommand,
            tag,
            dry_run: args.dry_run,
            force: args.force,
            note: String::new(),
        };

        if context.force {
            terminal.display_status("Force option set, skipping validation.")?;
        } else {
            self.validate(context.subcommand, &context.tag)?;
        }
        self.transition(WorkflowState::Validated);

        context.note = self.build_note(context.subcommand, &context.tag)?;
        terminal.display_release_note(&context.note)?;
        self.transition(WorkflowState::NoteBuilt);

        if context.dry_run {
            terminal.display_success(&format!("gdp {} done(dry-run mode).", context.subcommand))?;
            self.transition(WorkflowState::Reported);
            return Ok(context);
        }

        if context.subcommand == Subcommand::Deploy && !self.within_safety_window() {
            terminal.confirm_hotfix()?;
        }
        self.transition(WorkflowState::ConfirmedOrSkipped);

        self.execute(&context)?;
        self.transition(WorkflowState::Executed);

        terminal.display_success(&format!("gdp {} done.", context.subcommand))?;
        terminal.display_success(CLOSING_MESSAGE)?;
        self.transition(WorkflowState::Reported);

        Ok(context)
    }

    fn resolve_tag(&self, subcommand: Subcommand, explicit: Option<String>) -> Result<String> {
        if let Some(tag) = explicit {
            return Ok(tag);
        }

        let latest = self.gateway.latest_tag();
        match subcommand {
            Subcommand::Deploy => {
                let next = next_version(&latest, self.clock)?;
                log::debug!("next tag after '{}' is {}", latest, next);
                Ok(next)
            }
            Subcommand::Publish => Ok(latest),
        }
    }

    fn validate(&self, subcommand: Subcommand, tag: &str) -> Result<()> {
        match subcommand {
            Subcommand::Deploy => {
                if !self.gateway.is_on_release_branch() {
                    return Err(ValidationError::NotOnReleaseBranch.into());
                }
                if self.gateway.tag_exists_locally(tag) {
                    return Err(ValidationError::TagExistsLocally(tag.to_string()).into());
                }
            }
            Subcommand::Publish => {
                if !self.gateway.tag_exists_in_remote(tag) {
                    return Err(ValidationError::TagMissingInRemote(tag.to_string()).into());
                }
            }
        }
        Ok(())
    }

    fn build_note(&self, subcommand: Subcommand, tag: &str) -> Result<String> {
        let upper = match subcommand {
            Subcommand::Deploy => HEAD,
            Subcommand::Publish => tag,
        };
        let lower = self.gateway.previous_tag(upper);

        let merges = self
            .gateway
            .merge_commits_between(&lower, upper)
            .map_err(GdpError::NoteRetrieval)?;
        Ok(build_note(tag, &merges))
    }

    fn within_safety_window(&self) -> bool {
        let hour = self.clock.now().hour();
        let within = self.safety_window.contains(hour);
        log::debug!(
            "hour {} is {} the safety window {}-{}",
            hour,
            if within { "within" } else { "past" },
            self.safety_window.start,
            self.safety_window.end
        );
        within
    }

    fn execute(&self, context: &WorkflowContext) -> Result<()> {
        match context.subcommand {
            Subcommand::Deploy => {
                self.gateway
                    .deploy(&context.tag)
                    .map_err(|source| GdpError::Execution {
                        phase: Phase::Deploy,
                        source,
                    })
            }
            Subcommand::Publish => self
                .gateway
                .publish(&context.tag, &context.note)
                .map_err(|source| GdpError::Execution {
                    phase: Phase::Publish,
                    source,
                }),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        log::debug!("workflow {:?} -> {:?}", self.state, next);
        self.state = next;
        self.visited.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::DeclineReason;
    use crate::git::{GatewayCall, MockGateway};
    use chrono::NaiveDate;
    use std::io::Cursor;

    type TestTerminal = Terminal<Cursor<&'static [u8]>, Vec<u8>, Vec<u8>>;

    fn at_hour(hour: u32) -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2018, 5, 25)
                .unwrap()
                .and_hms_opt(hour, 30, 0)
                .unwrap(),
        )
    }

    fn args(subcommand: Subcommand) -> WorkflowArgs {
        WorkflowArgs {
            subcommand,
            tag: None,
            dry_run: false,
            force: false,
        }
    }

    fn terminal(input: &'static [u8]) -> TestTerminal {
        Terminal::new(Cursor::new(input), Vec::new(), Vec::new())
    }

    fn stdout(terminal: TestTerminal) -> String {
        let (_, out, _) = terminal.into_parts();
        console::strip_ansi_codes(&String::from_utf8(out).unwrap()).to_string()
    }

    #[test]
    fn test_subcommand_from_str() {
        assert_eq!("deploy".parse::<Subcommand>().unwrap(), Subcommand::Deploy);
        assert_eq!("publish".parse::<Subcommand>().unwrap(), Subcommand::Publish);

        let err = "release".parse::<Subcommand>().unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "Invalid sub command.");
    }

    #[test]
    fn test_deploy_resolves_next_semantic_tag() {
        let mut gateway = MockGateway::new();
        gateway.set_latest_tag("v1.2.3");
        gateway.set_previous_tag("HEAD", "v1.2.3");
        gateway.set_merge_commits("- alice: Add login");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let context = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap();

        assert_eq!(context.tag, "v1.2.4");
        assert_eq!(context.note, "Release v1.2.4\n\n## v1.2.4\n- alice: Add login");
        assert_eq!(workflow.state(), WorkflowState::Reported);
        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::LatestTag,
                GatewayCall::IsOnReleaseBranch,
                GatewayCall::TagExistsLocally("v1.2.4".to_string()),
                GatewayCall::PreviousTag("HEAD".to_string()),
                GatewayCall::MergeCommitsBetween("v1.2.3".to_string(), "HEAD".to_string()),
                GatewayCall::Deploy("v1.2.4".to_string()),
            ]
        );

        let out = stdout(terminal);
        assert!(out.contains("gdp deploy done."));
        assert!(out.contains(CLOSING_MESSAGE));
    }

    #[test]
    fn test_deploy_explicit_tag_skips_latest_tag_lookup() {
        let gateway = MockGateway::new();
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let context = workflow
            .run(
                WorkflowArgs {
                    tag: Some("hotfix-1".to_string()),
                    ..args(Subcommand::Deploy)
                },
                &mut terminal,
            )
            .unwrap();

        assert_eq!(context.tag, "hotfix-1");
        assert!(!gateway.calls().contains(&GatewayCall::LatestTag));
    }

    #[test]
    fn test_deploy_parse_error_aborts_before_validation() {
        let mut gateway = MockGateway::new();
        gateway.set_latest_tag("4.2.semantic");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert!(matches!(err, GdpError::Parse(_)));
        assert_eq!(workflow.state(), WorkflowState::Aborted);
        assert_eq!(gateway.calls(), vec![GatewayCall::LatestTag]);
    }

    #[test]
    fn test_deploy_off_release_branch() {
        let mut gateway = MockGateway::new();
        gateway.set_on_release_branch(false);
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert!(matches!(
            err,
            GdpError::Validation(ValidationError::NotOnReleaseBranch)
        ));
        assert!(!gateway.calls().iter().any(GatewayCall::is_mutation));
    }

    #[test]
    fn test_deploy_tag_already_exists_locally() {
        let mut gateway = MockGateway::new();
        gateway.add_local_tag("v1.0.0");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert_eq!(err.to_string(), "Tag v1.0.0 already exists in local.");
    }

    #[test]
    fn test_deploy_outside_window_declined() {
        let gateway = MockGateway::new();
        let clock = at_hour(19);
        let mut terminal = terminal(b"n");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert!(matches!(
            err,
            GdpError::UserDeclined(DeclineReason::Declined)
        ));
        assert_eq!(workflow.state(), WorkflowState::Aborted);
        assert!(!gateway.calls().iter().any(GatewayCall::is_mutation));
    }

    #[test]
    fn test_deploy_outside_window_confirmed() {
        let gateway = MockGateway::new();
        let clock = at_hour(8);
        let mut terminal = terminal(b"Y");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap();

        assert!(gateway
            .calls()
            .contains(&GatewayCall::Deploy("v1.0.0".to_string())));
        assert!(stdout(terminal).contains("OK. Take time."));
    }

    #[test]
    fn test_force_does_not_skip_confirmation() {
        let gateway = MockGateway::new();
        let clock = at_hour(23);
        let mut terminal = terminal(b"x");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(
                WorkflowArgs {
                    force: true,
                    ..args(Subcommand::Deploy)
                },
                &mut terminal,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            GdpError::UserDeclined(DeclineReason::Unrecognized)
        ));
    }

    #[test]
    fn test_publish_outside_window_needs_no_confirmation() {
        let mut gateway = MockGateway::new();
        gateway.set_latest_tag("v2.0.0");
        gateway.add_remote_tag("v2.0.0");
        let clock = at_hour(3);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let context = workflow
            .run(args(Subcommand::Publish), &mut terminal)
            .unwrap();

        assert_eq!(context.tag, "v2.0.0");
        assert!(gateway.calls().contains(&GatewayCall::Publish(
            "v2.0.0".to_string(),
            "Release v2.0.0\n\n## v2.0.0\n".to_string()
        )));
    }

    #[test]
    fn test_publish_uses_tag_as_note_upper_bound() {
        let mut gateway = MockGateway::new();
        gateway.add_remote_tag("20180525.2");
        gateway.set_previous_tag("20180525.2", "20180525.1");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        workflow
            .run(
                WorkflowArgs {
                    tag: Some("20180525.2".to_string()),
                    ..args(Subcommand::Publish)
                },
                &mut terminal,
            )
            .unwrap();

        assert!(gateway.calls().contains(&GatewayCall::MergeCommitsBetween(
            "20180525.1".to_string(),
            "20180525.2".to_string()
        )));
    }

    #[test]
    fn test_note_retrieval_failure() {
        let mut gateway = MockGateway::new();
        gateway.fail_merge_commits("fatal: ambiguous argument");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Getting merge commit error: fatal: ambiguous argument."
        );
        assert!(stdout(terminal).is_empty());
    }

    #[test]
    fn test_deploy_failure_is_prefixed() {
        let mut gateway = MockGateway::new();
        gateway.fail_deploy("rejected: non-fast-forward");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        let err = workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Deploy execution error: rejected: non-fast-forward."
        );
        assert_eq!(workflow.state(), WorkflowState::Aborted);
    }

    #[test]
    fn test_publish_in_window_visits_every_state() {
        let mut gateway = MockGateway::new();
        gateway.add_remote_tag("v2.0.0");
        let clock = at_hour(10);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        workflow
            .run(
                WorkflowArgs {
                    tag: Some("v2.0.0".to_string()),
                    ..args(Subcommand::Publish)
                },
                &mut terminal,
            )
            .unwrap();

        assert_eq!(
            workflow.visited(),
            [
                WorkflowState::TagResolved,
                WorkflowState::Validated,
                WorkflowState::NoteBuilt,
                WorkflowState::ConfirmedOrSkipped,
                WorkflowState::Executed,
                WorkflowState::Reported,
            ]
        );
    }

    #[test]
    fn test_dry_run_skips_confirmation_state() {
        let gateway = MockGateway::new();
        let clock = at_hour(23);
        let mut terminal = terminal(b"");

        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, SafetyWindow::default());
        workflow
            .run(
                WorkflowArgs {
                    dry_run: true,
                    ..args(Subcommand::Deploy)
                },
                &mut terminal,
            )
            .unwrap();

        assert!(!workflow.visited().contains(&WorkflowState::ConfirmedOrSkipped));
        assert_eq!(workflow.state(), WorkflowState::Reported);
    }

    #[test]
    fn test_custom_safety_window() {
        let gateway = MockGateway::new();
        let clock = at_hour(21);
        let mut terminal = terminal(b"");

        let window = SafetyWindow { start: 6, end: 22 };
        let mut workflow = ReleaseWorkflow::new(&gateway, &clock, window);
        workflow
            .run(args(Subcommand::Deploy), &mut terminal)
            .unwrap();

        assert!(!stdout(terminal).contains("hot-fix"));
    }
}
