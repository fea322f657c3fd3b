use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::automation::{ActionOutput, ActionRequest, PageAutomation};

#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub executed: Vec<ActionRequest>,
    pub viewports: Vec<(u32, u32)>,
    pub closed: u32,
}

/// Scripted automation; every call is recorded in the shared log.
pub(crate) struct FakeAutomation {
    pub log: Arc<Mutex<FakeLog>>,
    pub output: ActionOutput,
    pub execute_failure: Option<String>,
    pub viewport_failure: Option<String>,
}

impl FakeAutomation {
    pub fn new(output: ActionOutput) -> (Self, Arc<Mutex<FakeLog>>) {
        let log = Arc::new(Mutex::new(FakeLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                output,
                execute_failure: None,
                viewport_failure: None,
            },
            log,
        )
    }
}

#[async_trait]
impl PageAutomation for FakeAutomation {
    async fn execute(&mut self, request: &ActionRequest) -> Result<ActionOutput> {
        self.log.lock().unwrap().executed.push(request.clone());
        if let Some(msg) = &self.execute_failure {
            bail!(msg.clone());
        }
        Ok(self.output.clone())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        if let Some(msg) = &self.viewport_failure {
            bail!(msg.clone());
        }
        self.log.lock().unwrap().viewports.push((width, height));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
