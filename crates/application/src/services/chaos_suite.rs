//! Chaos suite
//!
//! Drives short GETs through the engine under test for a fixed duration,
//! optionally while a chaos scheduler injects faults in front of the target.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use domain::{DomainError, FaultKind, FaultSpec, ScenarioId};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::chaos_scheduler::{DEFAULT_HOLD, DEFAULT_INTERVAL};
use super::{ChaosScheduler, ExerciseConfig, ExerciseController, ExerciseSummary, FaultControlPlane, Workload};
use crate::error::ApplicationError;

/// One exercise of the chaos suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosExercise {
    /// No faults
    Normal,
    /// Periodic network failures
    NetworkFailures,
    /// Periodic service failures
    ServiceFailure,
}

impl ChaosExercise {
    /// Every exercise in run order
    pub const ALL: [Self; 3] = [Self::Normal, Self::NetworkFailures, Self::ServiceFailure];

    /// Method name used in metric keys
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::NetworkFailures => "with_network_failures",
            Self::ServiceFailure => "with_service_failure",
        }
    }

    /// Fault injected during this exercise
    pub const fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Normal => None,
            Self::NetworkFailures => Some(FaultKind::NetworkFailure),
            Self::ServiceFailure => Some(FaultKind::ServiceFailure),
        }
    }
}

impl fmt::Display for ChaosExercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl FromStr for ChaosExercise {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" | "none" => Ok(Self::Normal),
            "with_network_failures" | "network" => Ok(Self::NetworkFailures),
            "with_service_failure" | "service" => Ok(Self::ServiceFailure),
            other => Err(DomainError::UnknownScenario(other.to_string())),
        }
    }
}

/// Timing of the chaos suite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaosSuiteConfig {
    /// Workers and rate of every exercise
    pub exercise: ExerciseConfig,
    /// Length of each exercise
    pub duration: Duration,
    /// Length of the warm-up exercise
    pub warm_up: Duration,
    /// How long each injected fault is held
    pub hold: Duration,
    /// Period between fault injections
    pub interval: Duration,
    /// Port the proxy should disrupt
    pub target_port: u16,
}

impl Default for ChaosSuiteConfig {
    fn default() -> Self {
        Self {
            exercise: ExerciseConfig::default(),
            duration: Duration::from_secs(60),
            warm_up: Duration::from_secs(5),
            hold: DEFAULT_HOLD,
            interval: DEFAULT_INTERVAL,
            target_port: 8080,
        }
    }
}

/// Chaos exercises against one engine
#[derive(Debug)]
pub struct ChaosSuite {
    workload: Workload,
    control: FaultControlPlane,
    controller: ExerciseController,
    config: ChaosSuiteConfig,
    class: String,
}

impl ChaosSuite {
    /// Create a suite
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise configuration is invalid.
    pub fn new(
        workload: Workload,
        control: FaultControlPlane,
        config: ChaosSuiteConfig,
    ) -> Result<Self, ApplicationError> {
        let class = format!("chaos.{}", workload.engine().name());
        let controller = ExerciseController::new(class.clone(), &config.exercise)?;
        Ok(Self {
            workload,
            control,
            controller,
            config,
            class,
        })
    }

    /// Metric key of `method`
    pub fn scenario_id(&self, method: &str) -> ScenarioId {
        ScenarioId::new(self.class.clone(), method)
    }

    /// Prime the engine's connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise cannot be started.
    pub fn warm_up(&self) -> Result<ExerciseSummary, ApplicationError> {
        let task = self.workload.exercise_task(self.scenario_id("warm_up"));
        let summary = self.controller.warm_up(self.config.warm_up, task)?;
        info!(class = %self.class, "Done with warm up");
        Ok(summary)
    }

    /// Exercise without faults
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise cannot be started.
    pub fn normal(&self) -> Result<ExerciseSummary, ApplicationError> {
        self.exercise(ChaosExercise::Normal)
    }

    /// Exercise with periodic network failures
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or the scheduler cannot be started.
    pub fn with_network_failures(&self) -> Result<ExerciseSummary, ApplicationError> {
        self.exercise(ChaosExercise::NetworkFailures)
    }

    /// Exercise with periodic service failures
    ///
    /// # Errors
    ///
    /// Returns an error if the exercise or the scheduler cannot be started.
    pub fn with_service_failure(&self) -> Result<ExerciseSummary, ApplicationError> {
        self.exercise(ChaosExercise::ServiceFailure)
    }

    /// Warm up, then run `selection` in order
    ///
    /// # Errors
    ///
    /// Stops at the first exercise that cannot be started.
    pub fn run(
        &self,
        selection: &[ChaosExercise],
    ) -> Result<Vec<(ChaosExercise, ExerciseSummary)>, ApplicationError> {
        self.warm_up()?;
        selection
            .iter()
            .map(|exercise| Ok((*exercise, self.exercise(*exercise)?)))
            .collect()
    }

    fn exercise(&self, exercise: ChaosExercise) -> Result<ExerciseSummary, ApplicationError> {
        let task = self.workload.exercise_task(self.scenario_id(exercise.method()));

        let Some(kind) = exercise.fault_kind() else {
            return self.controller.run(self.config.duration, task);
        };

        let fault = FaultSpec::new(kind, self.config.target_port, self.config.hold);
        let scheduler = ChaosScheduler::new(self.control.clone(), fault, self.config.interval)?;
        info!(exercise = %exercise, "Starting chaos");
        let summary = scheduler.around(|| self.controller.run(self.config.duration, task));
        info!(exercise = %exercise, stats = ?scheduler.stats(), "Chaos stopped");
        summary
    }
}
