//! Dialog script processing.
//!
//! A script describes one simulated phone call:
//!
//! ```text
//! <ringback>
//! IVA:Thank you for calling. How can I help?
//! Caller:3:I'd like to check my balance.
//! <backend>
//! IVA:Your balance is 42 dollars.
//! <hangup>
//! ```
//!
//! Lines outside a `<ringback>` ... `<hangup>` block are ignored. Inside a
//! block, tags insert fixed sound clips and `IVA:` / `Caller:` lines are
//! synthesized with the provider's voice for that role. The generator writes
//! every segment into a per-run temporary directory and concatenates them
//! into one WAV file, converting segments to the format of the first one.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::core::tts::{BoxedTTS, SpeakerRole, TTSError};

/// Default directory for intermediate audio segments
pub const DEFAULT_TEMP_DIR: &str = ".temp";

/// Default directory holding the sound clips
pub const DEFAULT_SOUNDS_DIR: &str = "audio";

/// Prefix of the per-run directory created inside the temp directory
pub const RUN_DIR_PREFIX: &str = "vision-clip-";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tts(#[from] TTSError),

    #[error("WAV error in {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error(
        "{provider} wrote {} in a format other than WAV; choose a provider with WAV output",
        .path.display()
    )]
    NotWav { provider: String, path: PathBuf },

    #[error("Could not resample {}: {source}", .path.display())]
    Resample {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("output {} is inside the temporary directory", .output.display())]
    OutputInTempDir { output: PathBuf },

    #[error("dialog script contains no audio segments")]
    Empty,
}

impl DialogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn wav(path: &Path, source: hound::Error) -> Self {
        Self::Wav {
            path: path.to_path_buf(),
            source,
        }
    }

    fn resample<E>(path: &Path, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Resample {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }
}

// =============================================================================
// Script model
// =============================================================================

/// Fixed sound clip inserted by a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Ringback,
    Backend,
    Sendmail,
    Transfer,
    TextReceived,
}

impl SoundCue {
    /// Clip file name inside the sounds directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Ringback | Self::Transfer => "ringback.wav",
            Self::Backend => "backend.wav",
            Self::Sendmail => "swoosh.wav",
            Self::TextReceived => "text-received.wav",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        [
            ("<backend>", Self::Backend),
            ("<sendmail>", Self::Sendmail),
            ("<transfer>", Self::Transfer),
            ("<text>", Self::TextReceived),
        ]
        .into_iter()
        .find_map(|(tag, cue)| line.starts_with(tag).then_some(cue))
    }
}

/// One audio segment of the call.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    Sound(SoundCue),
    /// Line spoken by the virtual agent.
    Agent { text: String },
    /// Line spoken by the caller. `record_secs` is the recording length used
    /// when the line is captured live.
    Caller {
        text: String,
        record_secs: Option<u32>,
    },
}

/// Parse a dialog script into its audio segments.
pub fn parse_script(script: &str) -> Vec<DialogEvent> {
    let mut events = Vec::new();
    let mut in_call = false;

    for line in script.lines() {
        if !in_call {
            if line.starts_with("<ringback>") {
                in_call = true;
                events.push(DialogEvent::Sound(SoundCue::Ringback));
            }
            continue;
        }

        if line.starts_with("<hangup>") {
            in_call = false;
        } else if let Some(cue) = SoundCue::from_line(line) {
            events.push(DialogEvent::Sound(cue));
        } else if line.starts_with("IVA") {
            if let Some((_, text)) = line.split_once(':') {
                events.push(DialogEvent::Agent {
                    text: text.trim().to_string(),
                });
            }
        } else if line.starts_with("Caller") {
            if let Some(event) = parse_caller(line) {
                events.push(event);
            }
        }
    }

    events
}

/// `Caller:<seconds>:<text>` or `Caller:<text>`.
fn parse_caller(line: &str) -> Option<DialogEvent> {
    let (_, rest) = line.split_once(':')?;

    let (record_secs, text) = match rest.split_once(':') {
        Some((secs, text)) => match secs.trim().parse::<u32>() {
            Ok(secs) => (Some(secs), text),
            Err(_) => (None, rest),
        },
        None => (None, rest),
    };

    Some(DialogEvent::Caller {
        text: text.trim().to_string(),
        record_secs,
    })
}

// =============================================================================
// Generator
// =============================================================================

/// Where intermediate files and sound clips live.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Parent of the per-run segment directory. Never removed itself.
    pub temp_dir: PathBuf,
    pub sounds_dir: PathBuf,
    /// Keep the synthesized segments after concatenation
    pub keep_temp: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            sounds_dir: PathBuf::from(DEFAULT_SOUNDS_DIR),
            keep_temp: false,
        }
    }
}

/// Turns dialog scripts into a single call recording.
pub struct VisionClipGenerator {
    provider: BoxedTTS,
    options: GeneratorOptions,
}

impl VisionClipGenerator {
    pub fn new(provider: BoxedTTS, options: GeneratorOptions) -> Self {
        info!(provider = provider.name(), "Using TTS provider");
        Self { provider, options }
    }

    pub fn provider(&self) -> &BoxedTTS {
        &self.provider
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Read a script file and generate its recording.
    pub async fn generate_file(&self, script_path: &Path, output: &Path) -> Result<PathBuf, DialogError> {
        info!(path = %script_path.display(), "Processing dialog file");
        let script = tokio::fs::read_to_string(script_path)
            .await
            .map_err(|e| DialogError::io(script_path, e))?;
        self.generate(&script, output).await
    }

    /// Synthesize every line of `script` and concatenate the call into `output`.
    ///
    /// Segments go into a fresh `vision-clip-*` directory under `temp_dir`;
    /// only that directory is removed afterwards. Lines are processed one at
    /// a time, in script order.
    pub async fn generate(&self, script: &str, output: &Path) -> Result<PathBuf, DialogError> {
        let events = parse_script(script);
        if events.is_empty() {
            return Err(DialogError::Empty);
        }

        let temp_root = &self.options.temp_dir;
        tokio::fs::create_dir_all(temp_root)
            .await
            .map_err(|e| DialogError::io(temp_root, e))?;
        let run_dir = tempfile::Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(temp_root)
            .map_err(|e| DialogError::io(temp_root, e))?;
        debug!(run_dir = %run_dir.path().display(), "Created temp directory");

        if !self.options.keep_temp && is_within(output, run_dir.path()) {
            return Err(DialogError::OutputInTempDir {
                output: output.to_path_buf(),
            });
        }

        let result = self.render(&events, run_dir.path(), output).await;
        self.cleanup(run_dir);
        result?;

        info!(output = %output.display(), "Generated vision clip");
        Ok(output.to_path_buf())
    }

    async fn render(&self, events: &[DialogEvent], run_dir: &Path, output: &Path) -> Result<(), DialogError> {
        let mut segments = Vec::with_capacity(events.len());
        let mut line_number = 1usize;

        for event in events {
            let segment = match event {
                DialogEvent::Sound(cue) => {
                    debug!(cue = ?cue, "Adding sound clip");
                    self.options.sounds_dir.join(cue.file_name())
                }
                DialogEvent::Agent { text } => {
                    info!(role = "IVA", text = %text, "Synthesizing line");
                    let path = segment_path(run_dir, line_number, "va");
                    self.speak(SpeakerRole::VirtualAgent, text, &path).await?;
                    line_number += 1;
                    path
                }
                DialogEvent::Caller { text, record_secs } => {
                    info!(role = "Caller", text = %text, record_secs = ?record_secs, "Synthesizing line");
                    let path = segment_path(run_dir, line_number, "caller");
                    self.speak(SpeakerRole::Caller, text, &path).await?;
                    line_number += 1;
                    path
                }
            };
            segments.push(segment);
        }

        info!(
            segments = segments.len(),
            output = %output.display(),
            "Concatenating audio segments"
        );
        concatenate_wav(&segments, output)
    }

    async fn speak(&self, role: SpeakerRole, text: &str, path: &Path) -> Result<(), DialogError> {
        let profile = self.provider.voice_profile(role);
        self.provider
            .synthesize(text, &profile.voice, &profile.locale, 1.0, Some(path))
            .await?;

        if !is_wav_file(path).await? {
            return Err(DialogError::NotWav {
                provider: self.provider.name().to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn cleanup(&self, run_dir: TempDir) {
        if self.options.keep_temp {
            let kept = run_dir.keep();
            info!(temp_dir = %kept.display(), "Temporary files preserved");
            return;
        }

        let path = run_dir.path().to_path_buf();
        match run_dir.close() {
            Ok(()) => debug!(temp_dir = %path.display(), "Removed temp directory"),
            Err(e) => warn!(temp_dir = %path.display(), error = %e, "Could not clean up temp directory"),
        }
    }
}

fn segment_path(run_dir: &Path, line_number: usize, suffix: &str) -> PathBuf {
    run_dir.join(format!("{line_number:03}_{suffix}.wav"))
}

fn is_within(path: &Path, dir: &Path) -> bool {
    match (std::path::absolute(path), std::path::absolute(dir)) {
        (Ok(path), Ok(dir)) => path.starts_with(dir),
        _ => false,
    }
}

/// `RIFF....WAVE` at the start of the file.
async fn is_wav_file(path: &Path) -> Result<bool, DialogError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| DialogError::io(path, e))?;

    let mut header = [0u8; 12];
    match file.read_exact(&mut header).await {
        Ok(_) => Ok(&header[0..4] == b"RIFF" && &header[8..12] == b"WAVE"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(DialogError::io(path, e)),
    }
}

// =============================================================================
// WAV concatenation
// =============================================================================

/// Append the samples of every segment into one WAV file.
///
/// The output takes the format of the first segment. Later segments with a
/// different sample rate, channel count or sample format are converted.
pub fn concatenate_wav(segments: &[PathBuf], output: &Path) -> Result<(), DialogError> {
    let Some(first) = segments.first() else {
        return Err(DialogError::Empty);
    };
    let spec = open_wav(first)?.spec();

    let mut writer = hound::WavWriter::create(output, spec).map_err(|e| DialogError::wav(output, e))?;

    for segment in segments {
        let reader = open_wav(segment)?;
        let found = reader.spec();
        if found == spec {
            copy_samples(reader, &mut writer, segment, output)?;
            continue;
        }

        debug!(
            path = %segment.display(),
            from = ?found,
            to = ?spec,
            "Converting segment format"
        );
        let channels = decode(reader, segment)?;
        let channels = remix(channels, spec.channels);
        let channels = resample(channels, found.sample_rate, spec.sample_rate, segment)?;
        write_planar(&mut writer, &channels, spec, output)?;
    }

    writer.finalize().map_err(|e| DialogError::wav(output, e))
}

type WavFileWriter = hound::WavWriter<BufWriter<File>>;

fn open_wav(path: &Path) -> Result<hound::WavReader<BufReader<File>>, DialogError> {
    hound::WavReader::open(path).map_err(|e| DialogError::wav(path, e))
}

fn copy_samples(
    reader: hound::WavReader<BufReader<File>>,
    writer: &mut WavFileWriter,
    segment: &Path,
    output: &Path,
) -> Result<(), DialogError> {
    match reader.spec().sample_format {
        hound::SampleFormat::Int => {
            for sample in reader.into_samples::<i32>() {
                let sample = sample.map_err(|e| DialogError::wav(segment, e))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| DialogError::wav(output, e))?;
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.into_samples::<f32>() {
                let sample = sample.map_err(|e| DialogError::wav(segment, e))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| DialogError::wav(output, e))?;
            }
        }
    }
    Ok(())
}

/// Samples in [-1.0, 1.0], one vector per channel.
fn decode(reader: hound::WavReader<BufReader<File>>, segment: &Path) -> Result<Vec<Vec<f32>>, DialogError> {
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>(),
    }
    .map_err(|e| DialogError::wav(segment, e))?;

    let count = usize::from(spec.channels.max(1));
    let mut channels = vec![Vec::with_capacity(interleaved.len() / count); count];
    for frame in interleaved.chunks_exact(count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    Ok(channels)
}

/// Downmix to mono by averaging, otherwise map channels round-robin.
fn remix(channels: Vec<Vec<f32>>, target: u16) -> Vec<Vec<f32>> {
    let source = channels.len();
    let target = usize::from(target.max(1));
    if source == target || source == 0 {
        return channels;
    }

    if target == 1 {
        let frames = channels[0].len();
        let mono = (0..frames)
            .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / source as f32)
            .collect();
        return vec![mono];
    }

    (0..target).map(|c| channels[c % source].clone()).collect()
}

fn resample(
    channels: Vec<Vec<f32>>,
    from: u32,
    to: u32,
    segment: &Path,
) -> Result<Vec<Vec<f32>>, DialogError> {
    let frames = channels.first().map_or(0, Vec::len);
    if from == to || frames == 0 {
        return Ok(channels);
    }

    let ratio = f64::from(to) / f64::from(from);
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, params, frames, channels.len())
        .map_err(|e| DialogError::resample(segment, e))?;
    let mut resampled = resampler
        .process(&channels[..], None)
        .map_err(|e| DialogError::resample(segment, e))?;

    let expected = (frames as f64 * ratio).round() as usize;
    for channel in &mut resampled {
        channel.resize(expected, 0.0);
    }
    Ok(resampled)
}

fn write_planar(
    writer: &mut WavFileWriter,
    channels: &[Vec<f32>],
    spec: hound::WavSpec,
    output: &Path,
) -> Result<(), DialogError> {
    let frames = channels.first().map_or(0, Vec::len);
    let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;

    for i in 0..frames {
        for channel in channels {
            let sample = channel[i].clamp(-1.0, 1.0);
            let written = match spec.sample_format {
                hound::SampleFormat::Int => writer.write_sample((sample * max).round() as i32),
                hound::SampleFormat::Float => writer.write_sample(sample),
            };
            written.map_err(|e| DialogError::wav(output, e))?;
        }
    }
    Ok(())
}
