//! One complete statement run.
//!
//! The run is a fixed sequence of fallible phases:
//!
//! 1. load the login page and extract tokens
//! 2. log in
//! 3. list statements
//! 4. select statements by age
//! 5. download the selected statements
//! 6. mail them
//! 7. log out
//!
//! The first fatal error stops the sequence. Once step 2 has succeeded,
//! step 7 runs no matter how steps 3 to 6 ended, and its result is kept
//! separately from theirs.

use std::fmt;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::credentials::Credentials;
use crate::error::Error;
use crate::notify::Notifier;
use crate::portal::{
    AgePolicy, AuthenticatedPortal, Portal, Selection, StatementDocument, StatementRef,
};

/// What happened to one listed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    Included(StatementDocument),
    SkippedStale { date_token: String },
    SkippedUnparseable { date_token: String, reason: String },
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<StatementOutcome>,
    /// Whether a message was handed to the mail transport.
    pub mailed: bool,
}

impl RunReport {
    pub fn included(&self) -> impl Iterator<Item = &StatementDocument> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            StatementOutcome::Included(document) => Some(document),
            _ => None,
        })
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    pub fn stale_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StatementOutcome::SkippedStale { .. }))
            .count()
    }

    pub fn unparseable_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StatementOutcome::SkippedUnparseable { .. }))
            .count()
    }
}

/// A failed run.
///
/// `primary` is the error that stopped the run. `logout` is the error from
/// the closing logout, when that was attempted and failed. At least one of
/// the two is set.
#[derive(Debug)]
pub struct RunError {
    pub primary: Option<Error>,
    pub logout: Option<Error>,
}

impl RunError {
    fn before_login(error: Error) -> Self {
        Self {
            primary: Some(error),
            logout: None,
        }
    }

    /// Combine the statement phases with the logout that followed them.
    fn settle(
        work: Result<RunReport, Error>,
        logout: Result<(), Error>,
    ) -> Result<RunReport, Self> {
        match (work, logout) {
            (Ok(report), Ok(())) => Ok(report),
            (work, logout) => Err(Self {
                primary: work.err(),
                logout: logout.err(),
            }),
        }
    }

    /// The error to report first: the primary one if any, else the logout one.
    pub fn cause(&self) -> &Error {
        match (&self.primary, &self.logout) {
            (Some(primary), _) => primary,
            (None, Some(logout)) => logout,
            (None, None) => unreachable!("RunError always carries an error"),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.primary, &self.logout) {
            (Some(primary), Some(logout)) => {
                write!(f, "{primary} (logout also failed: {logout})")
            }
            (Some(primary), None) => write!(f, "{primary}"),
            (None, Some(logout)) => write!(f, "logout failed: {logout}"),
            (None, None) => f.write_str("run failed"),
        }
    }
}

// Display covers both slots.
impl std::error::Error for RunError {}

/// Inputs of a run other than the portal connection itself.
pub struct RunContext<'a> {
    pub credentials: &'a Credentials,
    pub policy: AgePolicy,
    pub clock: &'a dyn Clock,
    pub notifier: &'a Notifier,
}

/// Run every phase against `portal`.
pub async fn run(portal: Portal, ctx: &RunContext<'_>) -> Result<RunReport, RunError> {
    let tokens = portal
        .fetch_login_tokens()
        .await
        .map_err(RunError::before_login)?;
    let portal = portal
        .login(ctx.credentials, tokens)
        .await
        .map_err(RunError::before_login)?;

    let work = process_statements(&portal, ctx).await;
    if let Err(err) = &work {
        warn!(error = %err, "Statement processing failed; logging out");
    }
    let logout = portal.logout().await;
    if let Err(err) = &logout {
        warn!(error = %err, "Logout failed");
    }

    RunError::settle(work, logout)
}

async fn process_statements(
    portal: &AuthenticatedPortal,
    ctx: &RunContext<'_>,
) -> Result<RunReport, Error> {
    let refs = portal.list_statements().await?;
    let now = ctx.clock.now();

    let mut outcomes = Vec::with_capacity(refs.len());
    for statement in &refs {
        outcomes.push(process_one(portal, statement, ctx.policy.select(statement, now)).await?);
    }

    let documents: Vec<StatementDocument> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            StatementOutcome::Included(document) => Some(document.clone()),
            _ => None,
        })
        .collect();
    let mailed = ctx.notifier.notify(documents).await?;

    let report = RunReport { outcomes, mailed };
    info!(
        included = report.included_count(),
        stale = report.stale_count(),
        unparseable = report.unparseable_count(),
        mailed = report.mailed,
        "Statements processed"
    );
    Ok(report)
}

/// Act on the selection for one statement. Only a download can fail.
async fn process_one(
    portal: &AuthenticatedPortal,
    statement: &StatementRef,
    selection: Selection,
) -> Result<StatementOutcome, Error> {
    let date_token = statement.date_token.clone();
    match selection {
        Selection::Download => Ok(StatementOutcome::Included(portal.download(statement).await?)),
        Selection::Stale { age } => {
            info!(date = %date_token, age_days = age.num_days(), "Statement too old, skipping");
            Ok(StatementOutcome::SkippedStale { date_token })
        }
        Selection::Unparseable { reason } => {
            warn!(date = %date_token, %reason, "Unable to parse statement date, skipping");
            Ok(StatementOutcome::SkippedUnparseable { date_token, reason })
        }
    }
}
