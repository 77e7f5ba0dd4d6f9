//! Scripted executor for unit tests

use std::sync::Mutex;

use async_trait::async_trait;

use super::executor::{Execution, Executor, Invocation};
use crate::common::Result;

type Responder = Box<dyn Fn(&Invocation) -> Execution + Send + Sync>;

/// Answers every invocation from a closure and records what it was asked
pub(crate) struct ScriptedExecutor {
    responder: Responder,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&Invocation) -> Execution + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<Execution> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok((self.responder)(invocation))
    }
}

pub(crate) fn succeeded(stdout: &str) -> Execution {
    Execution {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub(crate) fn failed(code: i32, stderr: &str) -> Execution {
    Execution {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
