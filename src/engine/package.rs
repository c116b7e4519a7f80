// ABOUTME: Package acquisition collaborator resolving remote packages to local directories
// ABOUTME: Implements clone, pull-with-repair and checkout against a per-version cache using git

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::runtime::ScaffoldRuntime;

/// What to fetch and where to cache it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub url_base: String,
    pub package: String,
    pub version: String,
    pub cache_root: PathBuf,
}

impl PackageRequest {
    /// Deterministic cache location: `<cache_root>/<package>@<version>`
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root
            .join(format!("{}@{}", self.package, self.version))
    }

    pub fn clone_url(&self) -> String {
        format!("{}/{}", self.url_base.trim_end_matches('/'), self.package)
    }
}

/// Outcome of an acquisition; failures are reported, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    pub path: PathBuf,
    pub failures: Vec<String>,
}

impl AcquisitionReport {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, message: String) {
        warn!("{}", message);
        self.failures.push(message);
    }
}

#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Make `request.cache_dir()` hold the requested version, logging progress through the runtime
    async fn fetch(&self, request: &PackageRequest, runtime: &dyn ScaffoldRuntime)
        -> AcquisitionReport;
}

/// Fetcher shelling out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitPackageFetcher {
    program: String,
}

impl GitPackageFetcher {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a different git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn git(&self, args: &[&str], cwd: Option<&Path>) -> bool {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        match command.status().await {
            Ok(status) => {
                debug!("git {:?} exited with {}", args, status);
                status.success()
            }
            Err(e) => {
                debug!("git {:?} could not start: {}", args, e);
                false
            }
        }
    }
}

impl Default for GitPackageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageFetcher for GitPackageFetcher {
    async fn fetch(
        &self,
        request: &PackageRequest,
        runtime: &dyn ScaffoldRuntime,
    ) -> AcquisitionReport {
        let dir = request.cache_dir();
        let mut report = AcquisitionReport::new(dir.clone());
        let dir_arg = dir.to_string_lossy().to_string();

        let mut ready = false;
        if dir.exists() {
            runtime.log(&format!("[git] updating {} package...", request.package));
            ready = self.git(&["pull"], Some(&dir)).await;
            if !ready {
                runtime.log(&format!(
                    "[error] package {} is having issues, repairing...",
                    request.package
                ));
                if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                    debug!("Failed to remove {}: {}", dir.display(), e);
                }
            }
        }

        if !ready {
            if let Some(parent) = dir.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    debug!("Failed to create {}: {}", parent.display(), e);
                }
            }
            runtime.log(&format!("[git] pulling {} package...", request.package));
            let url = request.clone_url();
            if !self.git(&["clone", &url, &dir_arg], None).await {
                let message = format!("Failed to pull scaffold package {}", request.package);
                runtime.log(&message);
                report.fail(message);
            }
        }

        if !self.git(&["checkout", "-f", &request.version], Some(&dir)).await {
            let message = format!("Failed to load version {}", request.version);
            runtime.log(&message);
            report.fail(message);
        }

        report
    }
}
