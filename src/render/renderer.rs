//! Render pipeline
//!
//! Validating → PreparingScratch → per fragment {EnsureTranscoded →
//! MaybeFlush → AppendToBatch} → FinalFlush → Finalize → Cleanup.
//!
//! Validation finishes before any process is spawned or any scratch state
//! exists. From the moment the scratch directory is created it is owned by
//! a drop guard, so cleanup happens however the render ends. Validation also
//! bounds the total duration, so the running mix position cannot overflow.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, dispatcher, info, info_span, warn, Dispatch};
use uuid::Uuid;

use super::batch::{flush_before, MixBatch, MixTrack};
use super::command::{CancelToken, CommandRunner, SystemRunner, ToolCommand};
use super::config::{RenderConfig, RenderOptions};
use super::scratch::ScratchDir;
use crate::error::{Result, TapecutError};
use crate::probe::{FileProbe, SourceFormat, SourceProbe};
use crate::time::Timecode;
use crate::timeline::{write_silence_clip, Source, Timeline};

/// Accumulation file inside the scratch directory
pub const MIX_FILE_NAME: &str = "mix.wav";
/// Materialized built-in silence inside the scratch directory
pub const SILENCE_FILE_NAME: &str = "silence.wav";

/// Turns timelines into audio files by driving external tools
///
/// Log events go to the renderer's own [`Dispatch`], which is a no-op
/// unless one is injected with [`Renderer::with_logger`].
pub struct Renderer {
    config: RenderConfig,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn SourceProbe>,
    logger: Dispatch,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with default tools, real processes and header probing
    pub fn new() -> Self {
        Self {
            config: RenderConfig::default(),
            runner: Arc::new(SystemRunner::new()),
            probe: Arc::new(FileProbe),
            logger: Dispatch::none(),
        }
    }

    /// Like [`Renderer::new`] with configuration read from the environment
    pub fn from_env() -> Self {
        Self::new().with_config(RenderConfig::from_env())
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn with_probe(mut self, probe: impl SourceProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Send this renderer's log events to `logger`
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `timeline` into `dest` and return a timeline over the result.
    ///
    /// # Errors
    /// * `EmptyFragment` - If the timeline has no fragments
    /// * `InvalidArgument` - If the total duration overflows
    /// * `UnknownFormat` - If `dest` has an unsupported extension
    /// * `MissingDependency` - If the mixer or transcoder cannot be found
    /// * `FileExists` - If `dest` exists and overwrite was not requested
    /// * `CommandFailed` - If any external tool exits non-zero
    pub fn render(
        &self,
        timeline: &Timeline,
        dest: impl AsRef<Path>,
        options: RenderOptions,
    ) -> Result<Timeline> {
        self.render_with_cancel(timeline, dest, options, &CancelToken::new())
    }

    /// [`Renderer::render`] that stops with `Cancelled` once `cancel` fires
    pub fn render_with_cancel(
        &self,
        timeline: &Timeline,
        dest: impl AsRef<Path>,
        options: RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Timeline> {
        let dest = dest.as_ref();
        dispatcher::with_default(&self.logger, || {
            let render_id = Uuid::new_v4();
            let span = info_span!(
                "render",
                %render_id,
                dest = %dest.display(),
                fragments = timeline.len()
            );
            let _entered = span.enter();

            let result = self.render_inner(timeline, dest, options, cancel);
            if let Err(e) = &result {
                warn!(error = %e, code = e.error_code(), "render failed");
            }
            result
        })
    }

    fn render_inner(
        &self,
        timeline: &Timeline,
        dest: &Path,
        options: RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Timeline> {
        let dest_format = self.validate(timeline, dest, options)?;

        let scratch = ScratchDir::create(&self.config.scratch_root)?;
        let mix_path = scratch.join(MIX_FILE_NAME);

        self.mix(timeline, &scratch, &mix_path, cancel)?;
        self.finalize(&mix_path, dest, dest_format, cancel)?;
        drop(scratch);

        info!(duration = %timeline.duration(), "render complete");
        Timeline::open_with(dest, self.probe.as_ref())
    }

    fn validate(
        &self,
        timeline: &Timeline,
        dest: &Path,
        options: RenderOptions,
    ) -> Result<SourceFormat> {
        if timeline.is_empty() {
            return Err(TapecutError::EmptyFragment);
        }
        if timeline.checked_duration().is_none() {
            return Err(TapecutError::invalid_argument(
                "timeline is longer than the largest representable time",
            ));
        }

        let dest_format = SourceFormat::from_path(dest)?;

        for program in [&self.config.mixer, &self.config.transcoder] {
            if !self.runner.resolve(program) {
                return Err(TapecutError::MissingDependency {
                    program: program.clone(),
                });
            }
        }

        if dest.exists() {
            if !options.overwrite {
                return Err(TapecutError::FileExists {
                    path: dest.to_path_buf(),
                });
            }
            fs::remove_file(dest)?;
            debug!(dest = %dest.display(), "removed existing destination");
        }

        Ok(dest_format)
    }

    fn mix(
        &self,
        timeline: &Timeline,
        scratch: &ScratchDir,
        mix_path: &Path,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut prepared: HashMap<&Source, PathBuf> = HashMap::new();
        let mut batch = MixBatch::new(self.config.mixer.clone(), mix_path);
        let mut position = Timecode::ZERO;

        for (index, fragment) in timeline.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(TapecutError::Cancelled { command: None });
            }

            let input = match prepared.get(fragment.source()) {
                Some(path) => path.clone(),
                None => {
                    let path = self.prepare_source(fragment.source(), scratch, cancel)?;
                    prepared.insert(fragment.source(), path.clone());
                    path
                }
            };

            if flush_before(index) {
                self.run(&batch.take(), cancel)?;
            }

            batch.push(MixTrack {
                index,
                input,
                start: fragment.start(),
                duration: fragment.duration(),
                reversed: fragment.is_reversed(),
                position,
            });
            position += fragment.duration();
        }

        if !batch.is_empty() {
            self.run(&batch.take(), cancel)?;
        }

        Ok(())
    }

    /// Path of an intermediate-format file holding `source`'s audio
    fn prepare_source(
        &self,
        source: &Source,
        scratch: &ScratchDir,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        match source {
            Source::Silence => {
                let path = scratch.join(SILENCE_FILE_NAME);
                write_silence_clip(&path)?;
                Ok(path)
            }
            Source::File(path) if is_intermediate(path) => Ok(path.clone()),
            Source::File(path) => {
                let cached = scratch.join(format!("{}.wav", cache_key(path)));
                if !cached.exists() {
                    debug!(source = %path.display(), "transcoding source");
                    self.run(
                        &ToolCommand::transcode(&self.config.transcoder, path, &cached),
                        cancel,
                    )?;
                }
                Ok(cached)
            }
        }
    }

    fn finalize(
        &self,
        mix_path: &Path,
        dest: &Path,
        dest_format: SourceFormat,
        cancel: &CancelToken,
    ) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if dest_format.is_intermediate() {
            if let Err(e) = fs::rename(mix_path, dest) {
                debug!(error = %e, "rename failed, copying mix instead");
                fs::copy(mix_path, dest)?;
            }
            Ok(())
        } else {
            self.run(
                &ToolCommand::transcode(&self.config.transcoder, mix_path, dest),
                cancel,
            )
        }
    }

    fn run(&self, command: &ToolCommand, cancel: &CancelToken) -> Result<()> {
        debug!(command = %command, "run_command");
        self.runner.run(command, cancel)
    }
}

impl Timeline {
    /// Render with a renderer configured from the environment.
    ///
    /// See [`Renderer::render`].
    pub fn render(&self, dest: impl AsRef<Path>, options: RenderOptions) -> Result<Timeline> {
        Renderer::from_env().render(self, dest, options)
    }
}

fn is_intermediate(path: &Path) -> bool {
    SourceFormat::from_path(path)
        .map(SourceFormat::is_intermediate)
        .unwrap_or(false)
}

/// Deterministic scratch file stem for a transcoded source
pub fn cache_key(path: &Path) -> String {
    let hash = Sha256::digest(path.to_string_lossy().as_bytes());
    format!("{:x}", hash)
}
