//! Landmark model running as a helper subprocess
//!
//! The helper is any program that reads one JSON request per line on stdin
//! and answers one JSON response per line on stdout:
//!
//! - request:  `{"image_path": "...", "width": 640, "height": 480}`
//! - response: `{"status": "success", "faces": [[[x, y, z], ...], ...]}`
//!   or `{"status": "error", "error": "..."}`
//!
//! Responses are read on a dedicated thread so a stalled helper costs at most
//! one timeout. A helper that times out is killed and stays unavailable.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::DetectionError;
use crate::facs::landmarks::FaceLandmarks;
use crate::facs::tracker::LandmarkProvider;

#[derive(Serialize)]
struct HelperRequest<'a> {
    image_path: &'a str,
    width: u32,
    height: u32,
}

#[derive(Deserialize, Debug)]
pub(crate) struct HelperResponse {
    status: String,
    #[serde(default)]
    faces: Vec<FaceLandmarks>,
    error: Option<String>,
}

impl HelperResponse {
    pub(crate) fn into_faces(self) -> Result<Vec<FaceLandmarks>, DetectionError> {
        if self.status == "success" {
            Ok(self.faces)
        } else {
            Err(DetectionError::SourceUnavailable(
                self.error.unwrap_or_else(|| format!("helper status {}", self.status)),
            ))
        }
    }
}

/// Spawned landmark helper process
pub struct LandmarkHelper {
    command: String,
    process: Child,
    stdin: ChildStdin,
    responses: Receiver<io::Result<String>>,
    timeout: Duration,
    dead: bool,
    frame_path: PathBuf,
}

/// Forward every stdout line until the helper closes it
fn read_responses(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
        debug!("landmark helper output closed");
    });
    rx
}

impl LandmarkHelper {
    /// Spawn `program args...`; failure here is a startup error
    ///
    /// Each `detect` waits at most `timeout` for its response.
    pub fn spawn(program: &str, args: &[String], timeout: Duration) -> Result<Self, DetectionError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                DetectionError::SourceUnavailable(format!("failed to spawn {}: {}", program, e))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DetectionError::SourceUnavailable("helper stdin unavailable".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DetectionError::SourceUnavailable("helper stdout unavailable".to_string())
        })?;

        static NEXT_HELPER: AtomicUsize = AtomicUsize::new(0);
        let frame_path = std::env::temp_dir().join(format!(
            "mood-blaster-frame-{}-{}.png",
            std::process::id(),
            NEXT_HELPER.fetch_add(1, Ordering::Relaxed)
        ));

        info!(program, timeout_ms = timeout.as_millis() as u64, "landmark helper started");
        Ok(Self {
            command: program.to_string(),
            process: child,
            stdin,
            responses: read_responses(stdout),
            timeout,
            dead: false,
            frame_path,
        })
    }

    /// Stop the process; later calls fail fast
    fn retire(&mut self, reason: &str) {
        warn!(command = %self.command, reason, "landmark helper retired");
        self.dead = true;
        let _ = self.process.kill();
    }
}

impl LandmarkProvider for LandmarkHelper {
    fn name(&self) -> String {
        format!("helper ({})", self.command)
    }

    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceLandmarks>, DetectionError> {
        if self.dead {
            return Err(DetectionError::SourceUnavailable(
                "landmark helper is not running".to_string(),
            ));
        }
        image
            .save(&self.frame_path)
            .map_err(|e| DetectionError::SourceUnavailable(format!("failed to stage frame: {}", e)))?;

        let path = self.frame_path.to_string_lossy();
        let request = HelperRequest {
            image_path: &path,
            width: image.width(),
            height: image.height(),
        };
        let line = serde_json::to_string(&request)
            .map_err(|e| DetectionError::InvalidInput(e.to_string()))?;

        let unavailable = |e: io::Error| DetectionError::SourceUnavailable(e.to_string());
        writeln!(self.stdin, "{}", line).map_err(unavailable)?;
        self.stdin.flush().map_err(unavailable)?;

        let response_line = match self.responses.recv_timeout(self.timeout) {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                self.retire("read failed");
                return Err(unavailable(e));
            }
            Err(RecvTimeoutError::Timeout) => {
                self.retire("timed out");
                return Err(DetectionError::SourceUnavailable(format!(
                    "helper gave no answer within {} ms",
                    self.timeout.as_millis()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.retire("output closed");
                return Err(DetectionError::SourceUnavailable(
                    "helper closed its output".to_string(),
                ));
            }
        };

        let response: HelperResponse = serde_json::from_str(&response_line).map_err(|e| {
            DetectionError::SourceUnavailable(format!("unreadable helper response: {}", e))
        })?;
        response.into_faces()
    }
}

impl Drop for LandmarkHelper {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            if !self.dead {
                warn!("failed to stop landmark helper: {}", e);
            }
        }
        // Reap the child so it does not linger as a zombie
        if let Err(e) = self.process.wait() {
            warn!("failed to reap landmark helper: {}", e);
        }
        let _ = std::fs::remove_file(&self.frame_path);
    }
}
