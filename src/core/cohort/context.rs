//! Per-run context: scoped logging, cancellation, deadline and diagnostics

use crate::core::error::AnalyticsError;
use crate::logger::ScopedLogger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between a caller and its runs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; runs stop at their next term boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a tracking run needs besides the store.
///
/// Child contexts share the cancellation token, the deadline and the issue
/// list with their parent, so a batch collects diagnostics in one place.
#[derive(Debug, Clone)]
pub struct RunContext {
    logger: ScopedLogger,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    issues: Arc<Mutex<Vec<AnalyticsError>>>,
}

impl RunContext {
    /// Unbounded context with a new cancellation token
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            logger: ScopedLogger::new(scope),
            deadline: None,
            cancellation: CancellationToken::new(),
            issues: Arc::default(),
        }
    }

    /// Bound the run by a wall-clock budget starting now
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Bound the run by an absolute deadline
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Context for a nested unit of work (a program, a generation)
    #[must_use]
    pub fn child(&self, scope: &str) -> Self {
        Self {
            logger: self.logger.child(scope),
            ..self.clone()
        }
    }

    /// The run's logging handle
    #[must_use]
    pub const fn logger(&self) -> &ScopedLogger {
        &self.logger
    }

    /// The shared cancellation token
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fail if the run was cancelled or its deadline has passed.
    ///
    /// `next` names the work about to start and ends up in the marker.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::Cancelled`] or [`AnalyticsError::DeadlineExceeded`].
    pub fn checkpoint(&self, next: &str) -> Result<(), AnalyticsError> {
        if self.cancellation.is_cancelled() {
            return Err(AnalyticsError::Cancelled(next.to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AnalyticsError::DeadlineExceeded(next.to_string()));
        }
        Ok(())
    }

    /// Record a non-fatal data problem; it is logged and kept for the report.
    ///
    /// An issue already recorded by this run (or a context sharing it) is
    /// dropped, so a bad record seen at every term is listed once.
    pub fn report_issue(&self, issue: AnalyticsError) {
        let mut issues = self.issues.lock().unwrap_or_else(PoisonError::into_inner);
        if issues.contains(&issue) {
            return;
        }
        self.logger.warn(format_args!("{issue}"));
        issues.push(issue);
    }

    /// Issues recorded so far by this context and every context sharing it
    #[must_use]
    pub fn issues(&self) -> Vec<AnalyticsError> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded issues
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
