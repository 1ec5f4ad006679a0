//! Shared test helpers: a wiremock server usable from blocking tests and a
//! progress reporter that remembers what it was told.
#![allow(dead_code)]

use cat_backup::api::ProgressReporter;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// A mock HTTP server plus the runtime used to drive its async API.
/// The clients under test are blocking, so they are called from the test
/// thread while the server runs in the background.
pub struct TestServer {
    // Dropped before the runtime.
    server: MockServer,
    rt: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let rt = Runtime::new().expect("failed to build tokio runtime");
        let server = rt.block_on(MockServer::start());
        TestServer { server, rt }
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Base URL of the fake disk API on this server.
    pub fn disk_url(&self) -> String {
        format!("{}/v1/disk", self.server.uri())
    }

    /// Panics if any mounted expectation was not met.
    pub fn verify(&self) {
        self.rt.block_on(self.server.verify());
    }
}

/// Progress reporter that records every call.
#[derive(Default, Clone)]
pub struct RecordingProgress {
    pub started: Arc<Mutex<Vec<String>>>,
    pub deltas: Arc<Mutex<Vec<u64>>>,
    pub finished: Arc<Mutex<u32>>,
}

impl RecordingProgress {
    pub fn deltas(&self) -> Vec<u64> {
        self.deltas.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> u32 {
        *self.finished.lock().unwrap()
    }
}

impl ProgressReporter for RecordingProgress {
    fn start(&self, label: &str) {
        self.started.lock().unwrap().push(label.to_string());
    }

    fn advance(&self, delta: u64) {
        self.deltas.lock().unwrap().push(delta);
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() += 1;
    }
}

pub fn recording_progress() -> (RecordingProgress, Arc<dyn ProgressReporter>) {
    let progress = RecordingProgress::default();
    let shared: Arc<dyn ProgressReporter> = Arc::new(progress.clone());
    (progress, shared)
}
