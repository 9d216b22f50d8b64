//! Identity resolvers: probe in, [`MatchResult`] out.
//!
//! [`EngineResolver`] scores the probe against the enrollment directory with
//! the built-in [`MatchEngine`]. [`CommandResolver`] hands the probe to an
//! external classifier program instead. The pipeline cannot tell them apart.

use crate::config::{ResolverKind, TerminalConfig};
use facegate_biometric::{Gallery, MatchEngine};
use facegate_core::constants::{SENTINEL_NO_PERSONS_FOUND, SENTINEL_UNKNOWN_PERSON};
use facegate_core::{Identity, MatchResult};
use image::{ImageFormat, RgbImage};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

/// Decides who, if anyone, a probe shows.
pub trait IdentityResolver: Send + Sync {
    /// `None` means no probe could be captured.
    fn resolve(&self, probe: Option<&RgbImage>) -> MatchResult;
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for Box<R> {
    fn resolve(&self, probe: Option<&RgbImage>) -> MatchResult {
        (**self).resolve(probe)
    }
}

/// Built-in matching against the enrollment gallery.
///
/// The gallery is re-read on every attempt so fresh registrations count
/// immediately.
#[derive(Debug, Clone)]
pub struct EngineResolver {
    engine: MatchEngine,
    gallery: Gallery,
}

impl EngineResolver {
    pub fn new(engine: MatchEngine, gallery: Gallery) -> Self {
        Self { engine, gallery }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }
}

impl IdentityResolver for EngineResolver {
    fn resolve(&self, probe: Option<&RgbImage>) -> MatchResult {
        let Some(probe) = probe else {
            return MatchResult::no_probe();
        };

        let references = self.gallery.load().unwrap_or_else(|e| {
            warn!(
                "Cannot read enrollment directory {}: {}",
                self.gallery.dir().display(),
                e
            );
            Vec::new()
        });

        let result = self.engine.evaluate(Some(probe), &references);
        info!(
            "{} references, strategy {}: {}",
            references.len(),
            self.engine.strategy(),
            result
        );
        result
    }
}

/// Runs an external classifier.
///
/// The program is invoked as `<program> [args...] <enrollment_dir> <probe>`
/// with the probe written to a temporary JPEG. The second comma-separated
/// field of its output is the verdict: an identity, `unknown_person` or
/// `no_persons_found`. Anything else, including a failed run, counts as
/// unknown. Matches score 1.0 and misses 0.0.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    enrollment_dir: PathBuf,
}

impl CommandResolver {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        enrollment_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            enrollment_dir: enrollment_dir.into(),
        }
    }

    fn run(&self, probe: &RgbImage) -> Option<String> {
        let probe_file = tempfile::Builder::new()
            .prefix(".probe-")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| warn!("Cannot create probe file: {}", e))
            .ok()?;

        probe
            .save_with_format(probe_file.path(), ImageFormat::Jpeg)
            .map_err(|e| warn!("Cannot write probe file: {}", e))
            .ok()?;

        debug!("Running {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.enrollment_dir)
            .arg(probe_file.path())
            .output()
            .map_err(|e| warn!("Cannot run {}: {}", self.program, e))
            .ok()?;

        if !output.status.success() {
            warn!("{} exited with {}", self.program, output.status);
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl IdentityResolver for CommandResolver {
    fn resolve(&self, probe: Option<&RgbImage>) -> MatchResult {
        let Some(probe) = probe.filter(|p| p.width() > 0 && p.height() > 0) else {
            return MatchResult::no_probe();
        };

        match self.run(probe) {
            Some(output) => parse_verdict(&output),
            None => MatchResult::unknown(0.0),
        }
    }
}

/// Interpret classifier output such as `probe.jpg,bob`.
pub fn parse_verdict(output: &str) -> MatchResult {
    let verdict = output
        .lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split(',').nth(1))
        .map(str::trim);

    match verdict {
        Some(SENTINEL_NO_PERSONS_FOUND) => MatchResult::no_probe(),
        Some(SENTINEL_UNKNOWN_PERSON) | None => MatchResult::unknown(0.0),
        Some(name) => match Identity::new(name) {
            Ok(identity) => MatchResult::identity(identity, 1.0),
            Err(e) => {
                warn!("Classifier returned unusable name {:?}: {}", name, e);
                MatchResult::unknown(0.0)
            }
        },
    }
}

/// Build the resolver selected by `config`.
pub fn from_config(config: &TerminalConfig) -> Box<dyn IdentityResolver> {
    match config.resolver.kind {
        ResolverKind::Engine => Box::new(EngineResolver::new(
            config.matching.engine(),
            Gallery::new(&config.storage.enrollment_dir),
        )),
        ResolverKind::Command => Box::new(CommandResolver::new(
            config.resolver.program.clone(),
            config.resolver.args.clone(),
            &config.storage.enrollment_dir,
        )),
    }
}
