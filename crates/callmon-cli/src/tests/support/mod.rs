//! Shared fixtures for CLI tests.

mod fake_device;

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use callmon_config::Config;
use rstest::fixture;
use tempfile::TempDir;

use crate::config::ConfigLoader;
use crate::{AppError, IoStreams, run_with_loader};

pub(super) use fake_device::{FakeDevice, unused_port};

pub(super) const RING_AND_HANG_UP: &[u8] = b"01.02.23 10:11:12;RING;5;+491701234567;01234567;\r\n\
01.02.23 10:11:20;CONNECT;5;1;+491701234567;\r\n\
01.02.23 10:12:02;DISCONNECT;5;42;\r\n";

/// A config loader that returns a fixed configuration for tests.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Test world holding configuration, the fake device and captured output.
#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub device: Option<FakeDevice>,
    pub temp_dir: Option<TempDir>,
    pub capture: Option<PathBuf>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub fn start_device(&mut self, payload: &[u8], chunk_size: usize) -> Result<()> {
        let device = FakeDevice::spawn(payload.to_vec(), chunk_size)?;
        self.point_at(device.port());
        self.device = Some(device);
        Ok(())
    }

    pub fn point_at(&mut self, port: u16) {
        self.config.host = String::from("127.0.0.1");
        self.config.port = port;
        self.config.connect_timeout_secs = 2;
    }

    pub fn write_capture(&mut self, payload: &[u8]) -> Result<PathBuf> {
        let dir = match self.temp_dir.take() {
            Some(dir) => dir,
            None => TempDir::new().context("create temp dir")?,
        };
        let path = dir.path().join("monitor.capture");
        fs::write(&path, payload).context("write capture")?;
        self.temp_dir = Some(dir);
        self.capture = Some(path.clone());
        Ok(path)
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        let capture = self
            .capture
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let args = build_args(&command.replace("{capture}", &capture));
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr, false);
        self.exit_code = Some(run_with_loader(args, &mut io, &loader));
        if let Some(device) = self.device.as_mut() {
            device.finish()?;
        }
        self.device = None;
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    /// Kind tags of the JSON lines written to stdout, in order.
    pub fn stdout_kinds(&self) -> Result<Vec<String>> {
        self.stdout_text()?
            .lines()
            .map(|line| {
                let value: serde_json::Value =
                    serde_json::from_str(line).with_context(|| format!("parse {line}"))?;
                value
                    .get("kind")
                    .and_then(serde_json::Value::as_str)
                    .map(String::from)
                    .with_context(|| format!("kind missing in {line}"))
            })
            .collect()
    }

    pub fn assert_exit_code(&self, expected: ExitCode) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(exit == expected, "expected exit code {expected:?}, got {exit:?}");
        Ok(())
    }
}

pub(super) fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("callmon")];
    args.extend(command.split_whitespace().map(OsString::from));
    args
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
