#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::time::Instant;

use execwatch::errors::GatewayError;
use execwatch::gateway::{ExecutionGateway, GatewayFuture};
use execwatch::model::{Execution, ExecutionId, Task};

/// One scripted answer to a poll (execution + tasks).
#[derive(Debug, Clone)]
pub enum Step {
    Respond { execution: Execution, tasks: Vec<Task> },
    Fail(String),
}

impl Step {
    pub fn respond(execution: Execution, tasks: Vec<Task>) -> Self {
        Step::Respond { execution, tasks }
    }

    pub fn fail(msg: &str) -> Self {
        Step::Fail(msg.to_string())
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    /// Step picked by the last `fetch_execution`; `fetch_tasks` answers
    /// from it.
    current: Option<Step>,
    after_stop: Option<Vec<Step>>,
    stop_failure: Option<String>,
    stop_gate: Option<Arc<Notify>>,
    execution_calls: usize,
    task_calls: usize,
    stop_calls: usize,
    fetched_at: Vec<Instant>,
}

/// A fake gateway that:
/// - answers each poll with the next scripted [`Step`] (the last one repeats)
/// - records how often and when it was called
/// - optionally swaps in a new script once `stop_execution` is called.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(Script {
                steps: steps.into(),
                ..Script::default()
            }),
        }
    }

    /// Replace the script with `steps` after a successful stop request.
    pub fn after_stop(self, steps: Vec<Step>) -> Self {
        self.script.lock().unwrap().after_stop = Some(steps);
        self
    }

    /// Make every stop request fail with `msg`.
    pub fn failing_stop(self, msg: &str) -> Self {
        self.script.lock().unwrap().stop_failure = Some(msg.to_string());
        self
    }

    /// Hold every stop request until the returned `Notify` is signalled
    /// with `notify_one()`.
    pub fn hold_stop(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().unwrap().stop_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn execution_calls(&self) -> usize {
        self.script.lock().unwrap().execution_calls
    }

    pub fn task_calls(&self) -> usize {
        self.script.lock().unwrap().task_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.script.lock().unwrap().stop_calls
    }

    /// Instants at which `fetch_execution` was called.
    pub fn fetch_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().fetched_at.clone()
    }

    fn next_step(&self) -> Step {
        let mut script = self.script.lock().unwrap();
        script.execution_calls += 1;
        script.fetched_at.push(Instant::now());

        let step = if script.steps.len() > 1 {
            script.steps.pop_front()
        } else {
            script.steps.front().cloned()
        }
        .unwrap_or_else(|| Step::fail("no scripted response"));

        script.current = Some(step.clone());
        step
    }

    fn current_tasks(&self) -> Vec<Task> {
        let mut script = self.script.lock().unwrap();
        script.task_calls += 1;
        match &script.current {
            Some(Step::Respond { tasks, .. }) => tasks.clone(),
            _ => Vec::new(),
        }
    }

    fn record_stop(&self) -> (Option<Arc<Notify>>, Result<(), GatewayError>) {
        let mut script = self.script.lock().unwrap();
        script.stop_calls += 1;
        let gate = script.stop_gate.clone();
        (gate, script.apply_stop())
    }
}

impl Script {
    fn apply_stop(&mut self) -> Result<(), GatewayError> {
        if let Some(msg) = &self.stop_failure {
            return Err(GatewayError::Other(msg.clone()));
        }
        if let Some(steps) = self.after_stop.take() {
            self.steps = steps.into();
        }
        Ok(())
    }
}

impl ExecutionGateway for ScriptedGateway {
    fn fetch_execution<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, Execution> {
        let step = self.next_step();
        Box::pin(async move {
            match step {
                Step::Respond { execution, .. } => Ok(execution),
                Step::Fail(msg) => Err(GatewayError::Other(msg)),
            }
        })
    }

    fn fetch_tasks<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, Vec<Task>> {
        let tasks = self.current_tasks();
        Box::pin(async move { Ok(tasks) })
    }

    fn stop_execution<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, ()> {
        let (gate, result) = self.record_stop();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            result
        })
    }
}

/// A fake gateway whose responses are picked by call index, and whose
/// `fetch_tasks` call `k` can be held back until the test releases it.
///
/// Used to force responses to complete out of order.
pub struct GatedGateway {
    responses: Vec<(Execution, Vec<Task>)>,
    execution_calls: Mutex<usize>,
    task_calls: Mutex<usize>,
    gates: Mutex<HashMap<usize, Arc<Notify>>>,
}

impl GatedGateway {
    /// `responses[k]` answers the `k`-th poll; the last entry repeats.
    pub fn new(responses: Vec<(Execution, Vec<Task>)>) -> Self {
        assert!(!responses.is_empty(), "GatedGateway needs at least one response");
        Self {
            responses,
            execution_calls: Mutex::new(0),
            task_calls: Mutex::new(0),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Hold the `call`-th (0-based) `fetch_tasks` until the returned
    /// `Notify` is signalled with `notify_one()`.
    pub fn hold(&self, call: usize) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(call, Arc::clone(&gate));
        gate
    }

    fn response(&self, index: usize) -> &(Execution, Vec<Task>) {
        let last = self.responses.len() - 1;
        &self.responses[index.min(last)]
    }

    fn claim(counter: &Mutex<usize>) -> usize {
        let mut n = counter.lock().unwrap();
        let index = *n;
        *n += 1;
        index
    }
}

impl ExecutionGateway for GatedGateway {
    fn fetch_execution<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, Execution> {
        let index = Self::claim(&self.execution_calls);
        let execution = self.response(index).0.clone();
        Box::pin(async move { Ok(execution) })
    }

    fn fetch_tasks<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, Vec<Task>> {
        let index = Self::claim(&self.task_calls);
        let tasks = self.response(index).1.clone();
        let gate = self.gates.lock().unwrap().get(&index).cloned();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(tasks)
        })
    }

    fn stop_execution<'a>(&'a self, _id: &'a ExecutionId) -> GatewayFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}
