//! Agent runner
//!
//! Drives one agent run through `Idle -> Running -> {Completed, Failed}`.
//! Entering `Running` applies the configured log level and announces the
//! agent; the work itself is a fixed placeholder loop of [`TASK_ITERATIONS`]
//! tasks separated by the configured interval.

use std::fmt;
use std::time::Duration;

use agent_utils::{SeverityThreshold, parse_level};
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::error::{Error, Result};

/// Number of placeholder tasks executed per run
pub const TASK_ITERATIONS: u32 = 3;

/// Lifecycle state of an [`AgentRunner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunnerState {
    /// Completed and failed runners cannot be driven any further
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Pause between placeholder tasks
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub agent: String,
    pub tasks_completed: u32,
    pub total_delay: Duration,
}

/// Runs a single agent from its configuration
///
/// # Example
///
/// ```no_run
/// use agent_core::{AgentRunner, load_config};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = agent_utils::init_tracing()?;
/// let config = load_config("agent.json")?;
///
/// let mut runner = AgentRunner::new(config);
/// let report = runner.run(&log)?;
/// assert_eq!(report.tasks_completed, 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AgentRunner<S = ThreadSleeper> {
    config: AgentConfig,
    state: RunnerState,
    sleeper: S,
}

impl AgentRunner<ThreadSleeper> {
    /// Create an idle runner that sleeps on the current thread
    pub fn new(config: AgentConfig) -> Self {
        Self::with_sleeper(config, ThreadSleeper)
    }
}

impl<S: Sleeper> AgentRunner<S> {
    /// Create an idle runner with a custom pause strategy
    pub fn with_sleeper(config: AgentConfig, sleeper: S) -> Self {
        Self {
            config,
            state: RunnerState::Idle,
            sleeper,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Start the agent and run every task to completion
    ///
    /// On failure the runner ends up `Failed`, the error is reported through
    /// [`AgentRunner::fail`] and then returned.
    pub fn run(&mut self, threshold: &impl SeverityThreshold) -> Result<RunReport> {
        match self.start(threshold).and_then(|()| self.run_tasks()) {
            Err(err) if !self.state.is_terminal() => {
                self.fail(&err)?;
                Err(err)
            }
            outcome => outcome,
        }
    }

    /// Move from `Idle` to `Running`
    ///
    /// Applies the configured log level first, so the announcement lines
    /// already honour it. An unrecognised level keeps the current threshold.
    pub fn start(&mut self, threshold: &impl SeverityThreshold) -> Result<()> {
        self.expect_state(RunnerState::Idle, "start")?;

        if let Err(err) = self.apply_log_level(threshold) {
            self.fail(&err)?;
            return Err(err);
        }

        self.state = RunnerState::Running;
        info!(
            "Agent '{}' (version {}) started",
            self.config.name(),
            self.config.version()
        );
        info!("Configuration parameters: {}", self.config.parameters());
        Ok(())
    }

    /// Execute the placeholder tasks and move to `Completed`
    pub fn run_tasks(&mut self) -> Result<RunReport> {
        self.expect_state(RunnerState::Running, "run tasks")?;

        let interval = self.config.interval();
        let mut total_delay = Duration::ZERO;

        for task in 1..=TASK_ITERATIONS {
            info!(
                "Agent '{}' is performing task {task}...",
                self.config.name()
            );
            self.sleeper.sleep(interval);
            total_delay += interval;
        }

        info!("Agent '{}' finished work", self.config.name());
        self.state = RunnerState::Completed;

        Ok(RunReport {
            agent: self.config.name().to_string(),
            tasks_completed: TASK_ITERATIONS,
            total_delay,
        })
    }

    /// Abort the run because of `error`
    ///
    /// Moves any non-terminal state to `Failed` and logs the error at critical
    /// severity. A runner that already finished is left untouched.
    pub fn fail(&mut self, error: &Error) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidTransition {
                from: self.state,
                action: "fail",
            });
        }

        error!(
            "CRITICAL: Agent '{}' failed while {}: {error}",
            self.config.name(),
            self.state
        );
        self.state = RunnerState::Failed;
        Ok(())
    }

    fn apply_log_level(&self, threshold: &impl SeverityThreshold) -> Result<()> {
        match parse_level(self.config.log_level()) {
            Some(level) => threshold.set_threshold(level)?,
            None => warn!(
                "Unknown log level '{}', keeping the current threshold",
                self.config.log_level()
            ),
        }
        Ok(())
    }

    fn expect_state(&self, expected: RunnerState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }
}
