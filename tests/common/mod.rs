// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides a scripted runtime, a package directory builder and a fake package fetcher

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use xscaffold::engine::{
    AcquisitionReport, PackageFetcher, PackageRequest, ParameterDeclaration, Result,
    ScaffoldError, ScaffoldRuntime,
};

/// Runtime answering prompts from a queue and recording every status line
#[derive(Default)]
pub struct TestRuntime {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
    logs: Mutex<Vec<String>>,
}

impl TestRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: &[&str]) -> Self {
        let runtime = Self::new();
        runtime
            .answers
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| a.to_string()));
        runtime
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }
}

impl ScaffoldRuntime for TestRuntime {
    fn log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn ask(&self, parameter: &ParameterDeclaration) -> Result<String> {
        self.asked.lock().unwrap().push(parameter.name.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScaffoldError::InputClosed(parameter.name.clone()))
    }
}

/// Writes a package directory: a manifest plus arbitrary files
pub struct PackageBuilder {
    dir: TempDir,
    manifest_name: String,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            manifest_name: "xscaffold".to_string(),
        }
    }

    pub fn with_manifest_name(mut self, name: &str) -> Self {
        self.manifest_name = name.to_string();
        self
    }

    pub fn manifest(self, yaml: &str) -> Self {
        let path = self.dir.path().join(format!("{}.yaml", self.manifest_name));
        std::fs::write(path, yaml).unwrap();
        self
    }

    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn package(&self) -> String {
        self.dir.path().to_string_lossy().to_string()
    }
}

/// Fetcher resolving every request to a prepared directory, optionally reporting failures
pub struct FakeFetcher {
    pub path: PathBuf,
    pub failures: Vec<String>,
    pub requests: Mutex<Vec<PackageRequest>>,
}

impl FakeFetcher {
    pub fn serving(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            failures: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(path: &Path, failure: &str) -> Self {
        Self {
            failures: vec![failure.to_string()],
            ..Self::serving(path)
        }
    }

    pub fn requests(&self) -> Vec<PackageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageFetcher for FakeFetcher {
    async fn fetch(
        &self,
        request: &PackageRequest,
        runtime: &dyn ScaffoldRuntime,
    ) -> AcquisitionReport {
        self.requests.lock().unwrap().push(request.clone());
        runtime.log(&format!("[fake] serving {}", request.package));
        AcquisitionReport {
            path: self.path.clone(),
            failures: self.failures.clone(),
        }
    }
}
