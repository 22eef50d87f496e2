//! Multi-step registry mutations with compensation.
//!
//! A registry mutation touches two places, the metadata collection and
//! the physical collection, with no transaction spanning both. A [`Saga`]
//! runs the steps in order; when a required step fails, every step that
//! already completed is compensated in reverse order and the original
//! error is returned. Best-effort steps may fail without aborting.

use std::fmt;

use tracing::{debug, warn};

use crate::definitions::DefinitionTable;
use crate::error::{EngineError, EngineResult};
use crate::schema::CollectionDefinition;
use crate::sync::Synchronizer;

/// One unit of work in a registry mutation.
#[derive(Debug, Clone)]
pub enum SagaStep {
    InsertDefinition(CollectionDefinition),
    ReplaceDefinition {
        previous: CollectionDefinition,
        next: CollectionDefinition,
    },
    DeleteDefinition(CollectionDefinition),
    CreateStorage(String),
    RenameStorage { from: String, to: String },
    DropStorage(String),
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SagaStep::InsertDefinition(def) => write!(f, "insert definition {:?}", def.path),
            SagaStep::ReplaceDefinition { next, .. } => {
                write!(f, "replace definition {:?}", next.path)
            }
            SagaStep::DeleteDefinition(def) => write!(f, "delete definition {:?}", def.path),
            SagaStep::CreateStorage(path) => write!(f, "create storage {path:?}"),
            SagaStep::RenameStorage { from, to } => write!(f, "rename storage {from:?} -> {to:?}"),
            SagaStep::DropStorage(path) => write!(f, "drop storage {path:?}"),
        }
    }
}

/// What a saga touches.
#[derive(Clone, Copy)]
pub struct Participants<'a> {
    pub definitions: &'a DefinitionTable,
    pub sync: &'a Synchronizer,
}

impl SagaStep {
    async fn apply(&self, with: Participants<'_>) -> EngineResult<()> {
        match self {
            SagaStep::InsertDefinition(def) => with.definitions.insert(def).await,
            SagaStep::ReplaceDefinition { next, .. } => {
                if with.definitions.replace(next).await? {
                    Ok(())
                } else {
                    Err(EngineError::collection_not_found())
                }
            }
            SagaStep::DeleteDefinition(def) => {
                if with.definitions.delete(def).await? {
                    Ok(())
                } else {
                    Err(EngineError::collection_not_found())
                }
            }
            SagaStep::CreateStorage(path) => with.sync.create(path).await,
            SagaStep::RenameStorage { from, to } => with.sync.rename(from, to).await,
            SagaStep::DropStorage(path) => with.sync.drop(path).await.map(|_| ()),
        }
    }

    async fn compensate(&self, with: Participants<'_>) -> EngineResult<()> {
        match self {
            SagaStep::InsertDefinition(def) => with.definitions.delete(def).await.map(|_| ()),
            SagaStep::ReplaceDefinition { previous, .. } => {
                with.definitions.replace(previous).await.map(|_| ())
            }
            SagaStep::DeleteDefinition(def) => with.definitions.insert(def).await,
            SagaStep::CreateStorage(path) => with.sync.drop(path).await.map(|_| ()),
            SagaStep::RenameStorage { from, to } => with.sync.rename(to, from).await,
            // Dropped data cannot be brought back.
            SagaStep::DropStorage(_) => Ok(()),
        }
    }
}

struct PlannedStep {
    step: SagaStep,
    best_effort: bool,
}

/// Result of a saga that ran to completion.
#[derive(Debug, Default)]
pub struct SagaReport {
    /// Best-effort steps that failed, with their errors.
    pub skipped: Vec<(String, String)>,
}

/// An ordered list of steps, executed by [`Saga::execute`].
pub struct Saga {
    name: &'static str,
    steps: Vec<PlannedStep>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a required step.
    pub fn then(mut self, step: SagaStep) -> Self {
        self.steps.push(PlannedStep {
            step,
            best_effort: false,
        });
        self
    }

    /// Append a step whose failure is logged and otherwise ignored.
    pub fn then_best_effort(mut self, step: SagaStep) -> Self {
        self.steps.push(PlannedStep {
            step,
            best_effort: true,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn execute(self, with: Participants<'_>) -> EngineResult<SagaReport> {
        let mut report = SagaReport::default();
        let mut completed: Vec<&SagaStep> = Vec::with_capacity(self.steps.len());

        for planned in &self.steps {
            match planned.step.apply(with).await {
                Ok(()) => {
                    debug!(saga = self.name, step = %planned.step, "saga step done");
                    completed.push(&planned.step);
                }
                Err(e) if planned.best_effort => {
                    warn!(saga = self.name, step = %planned.step, error = %e, "best-effort step failed");
                    report.skipped.push((planned.step.to_string(), e.to_string()));
                }
                Err(e) => {
                    warn!(saga = self.name, step = %planned.step, error = %e, "saga step failed, compensating");
                    for done in completed.iter().rev() {
                        if let Err(comp) = done.compensate(with).await {
                            warn!(saga = self.name, step = %done, error = %comp, "compensation failed");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(report)
    }
}
