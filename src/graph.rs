//! Explicit task graph with sequential and parallel composition.
//!
//! Steps are registered once with their dependency ids; the scheduler then
//! runs the graph in waves: every pending step whose dependencies have all
//! completed is started, the wave is awaited as a whole, and the next wave
//! begins. Independent branches therefore run concurrently while a step never
//! starts before its predecessors succeeded.
//!
//! Failure semantics: a failing step prevents its dependents from running,
//! but siblings already started in the same wave run to completion; the first
//! failure is surfaced as [`GraphError::Step`] carrying the step name and the
//! untransformed underlying error.

use crate::config::RunContext;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// A named unit of build work.
#[async_trait]
pub trait Step: Send + Sync {
    fn id(&self) -> &str;
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()>;
}

struct Node {
    step: Arc<dyn Step>,
    deps: Vec<String>,
}

/// Static graph of build steps: nodes are step ids, edges are "depends on".
#[derive(Default)]
pub struct TaskGraph {
    nodes: Vec<Node>,
}

#[derive(Debug)]
pub enum GraphError {
    UnknownStep(String),
    MissingDependency { step: String, dependency: String },
    Cycle(Vec<String>),
    Step { id: String, source: anyhow::Error },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownStep(name) => write!(f, "unknown task: {name}"),
            GraphError::MissingDependency { step, dependency } => {
                write!(f, "task {step} depends on undeclared task {dependency}")
            }
            GraphError::Cycle(ids) => {
                write!(f, "dependency cycle between tasks: {}", ids.join(", "))
            }
            GraphError::Step { id, source } => write!(f, "task {id} failed: {source:#}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step with its direct dependencies.
    pub fn add(&mut self, step: Arc<dyn Step>, deps: &[&str]) {
        self.nodes.push(Node {
            step,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        });
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.step.id()).collect()
    }

    fn validate(&self) -> Result<(), GraphError> {
        let ids: BTreeSet<&str> = self.nodes.iter().map(|n| n.step.id()).collect();
        for node in &self.nodes {
            for dep in &node.deps {
                if !ids.contains(dep.as_str()) {
                    return Err(GraphError::MissingDependency {
                        step: node.step.id().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The transitive dependency closure of `target`, including itself.
    fn closure(&self, target: &str) -> Result<BTreeSet<String>, GraphError> {
        if !self.nodes.iter().any(|n| n.step.id() == target) {
            return Err(GraphError::UnknownStep(target.to_string()));
        }
        let mut wanted = BTreeSet::new();
        let mut stack = vec![target.to_string()];
        while let Some(id) = stack.pop() {
            if !wanted.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.iter().find(|n| n.step.id() == id) {
                stack.extend(node.deps.iter().cloned());
            }
        }
        Ok(wanted)
    }

    /// Run `target` and everything it transitively depends on.
    pub async fn run_target(&self, target: &str, ctx: &RunContext) -> Result<(), GraphError> {
        self.validate()?;
        let wanted = self.closure(target)?;
        info!(target, tasks = wanted.len(), "Executing task graph");

        let mut done: BTreeSet<String> = BTreeSet::new();
        let mut pending: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|n| wanted.contains(n.step.id()))
            .collect();

        while !pending.is_empty() {
            let (ready, rest): (Vec<&Node>, Vec<&Node>) = pending
                .into_iter()
                .partition(|n| n.deps.iter().all(|d| done.contains(d)));
            if ready.is_empty() {
                let stuck = rest.iter().map(|n| n.step.id().to_string()).collect();
                return Err(GraphError::Cycle(stuck));
            }

            let wave: Vec<&str> = ready.iter().map(|n| n.step.id()).collect();
            info!(?wave, "Starting task wave");
            let results = join_all(ready.iter().map(|node| async move {
                let id = node.step.id().to_string();
                let result = node.step.run(ctx).await;
                (id, result)
            }))
            .await;

            let mut failure = None;
            for (id, result) in results {
                match result {
                    Ok(()) => {
                        info!(task = %id, "Task completed");
                        done.insert(id);
                    }
                    Err(source) => {
                        error!(task = %id, error = ?source, "Task failed");
                        if failure.is_none() {
                            failure = Some(GraphError::Step { id, source });
                        }
                    }
                }
            }
            if let Some(err) = failure {
                return Err(err);
            }
            pending = rest;
        }
        Ok(())
    }
}
