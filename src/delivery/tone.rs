use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use super::{Alert, AlertChannel, TonePattern};

pub type ToneId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Running,
    Suspended,
    Unavailable,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output is available")]
    Unavailable,

    #[error("Could not open audio output: {0}")]
    Open(String),

    #[error("Could not resume audio output: {0}")]
    Resume(String),

    #[error("Could not play tone: {0}")]
    Play(String),

    #[error("Audio output thread has shut down")]
    Closed,
}

/// Device the tone engine plays through.
///
/// `play` must signal `on_complete` exactly once for every tone it accepts,
/// whether the tone ran to its end or was stopped.
#[async_trait]
pub trait AudioOutput: Send + Sync + 'static {
    fn state(&self) -> OutputState;

    async fn resume(&self) -> Result<(), AudioError>;

    fn play(&self, pattern: TonePattern, on_complete: oneshot::Sender<()>) -> Result<ToneId, AudioError>;

    /// Stopping a tone that already finished is not an error.
    fn stop(&self, tone: ToneId) -> Result<(), AudioError>;
}

/// Output used when the crate is built without a sound backend.
#[derive(Debug, Default)]
pub struct UnavailableAudioOutput;

#[async_trait]
impl AudioOutput for UnavailableAudioOutput {
    fn state(&self) -> OutputState {
        OutputState::Unavailable
    }

    async fn resume(&self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn play(&self, _: TonePattern, _: oneshot::Sender<()>) -> Result<ToneId, AudioError> {
        Err(AudioError::Unavailable)
    }

    fn stop(&self, _: ToneId) -> Result<(), AudioError> {
        Ok(())
    }
}

type OutputFactory = Arc<dyn Fn() -> Result<Arc<dyn AudioOutput>, AudioError> + Send + Sync>;

enum ToneState {
    Idle,
    /// `tone` is `None` while the output is still being acquired or resumed.
    Playing {
        generation: u64,
        tone: Option<ToneId>,
    },
}

struct ToneEngineState {
    tone: ToneState,
    generation: u64,
    output: Option<Arc<dyn AudioOutput>>,
}

impl ToneEngineState {
    fn is_current(&self, generation: u64) -> bool {
        matches!(self.tone, ToneState::Playing { generation: playing, .. } if playing == generation)
    }

    fn stop_active(&mut self) {
        let ToneState::Playing { generation, tone } =
            std::mem::replace(&mut self.tone, ToneState::Idle)
        else {
            return;
        };

        if let (Some(tone), Some(output)) = (tone, &self.output) {
            if let Err(e) = output.stop(tone) {
                log::debug!("Ignoring failure to stop tone {tone} of generation {generation}: {e}");
            }
        }
    }
}

/// Plays the alert tone, at most one at a time.
///
/// Starting a tone while another is playing cuts the previous one off. Audio
/// failures are logged and leave the engine idle; they never reach the
/// caller.
pub struct ToneEngine {
    pattern: TonePattern,
    factory: OutputFactory,
    state: Arc<Mutex<ToneEngineState>>,
}

impl ToneEngine {
    /// `factory` is called on a blocking thread for the first tone. Its output
    /// is reused until it reports [`OutputState::Unavailable`].
    pub fn new(
        factory: impl Fn() -> Result<Arc<dyn AudioOutput>, AudioError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            pattern: TonePattern::ALERT,
            factory: Arc::new(factory),
            state: Arc::new(Mutex::new(ToneEngineState {
                tone: ToneState::Idle,
                generation: 0,
                output: None,
            })),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(|| Ok(Arc::new(UnavailableAudioOutput)))
    }

    pub fn is_playing(&self) -> bool {
        matches!(lock(&self.state).tone, ToneState::Playing { .. })
    }

    pub async fn start(&self) {
        let generation = {
            let mut state = lock(&self.state);
            state.stop_active();
            let generation = state.generation + 1;
            state.generation = generation;
            state.tone = ToneState::Playing {
                generation,
                tone: None,
            };
            generation
        };

        if let Err(e) = self.play(generation).await {
            log::error!("Could not play alert tone: {e}");
            let mut state = lock(&self.state);
            if state.is_current(generation) {
                state.tone = ToneState::Idle;
            }
        }
    }

    pub fn cancel(&self) {
        lock(&self.state).stop_active();
    }

    async fn acquire_output(&self) -> Result<Arc<dyn AudioOutput>, AudioError> {
        {
            let mut state = lock(&self.state);
            if let Some(output) = &state.output {
                if output.state() != OutputState::Unavailable {
                    return Ok(Arc::clone(output));
                }
            }
            if state.output.take().is_some() {
                log::info!("Audio output is unavailable, opening it again");
            }
        }

        let factory = Arc::clone(&self.factory);
        let output = tokio::task::spawn_blocking(move || factory())
            .await
            .map_err(|e| AudioError::Open(e.to_string()))??;

        let mut state = lock(&self.state);
        if let Some(existing) = &state.output {
            return Ok(Arc::clone(existing));
        }
        log::info!("Opened audio output");
        state.output = Some(Arc::clone(&output));
        Ok(output)
    }

    async fn play(&self, generation: u64) -> Result<(), AudioError> {
        let output = self.acquire_output().await?;
        match output.state() {
            OutputState::Unavailable => return Err(AudioError::Unavailable),
            OutputState::Suspended => output.resume().await?,
            OutputState::Running => {}
        }

        let (on_complete, completed) = oneshot::channel();
        {
            let mut state = lock(&self.state);
            if !state.is_current(generation) {
                log::debug!("Tone of generation {generation} was superseded before it started");
                return Ok(());
            }

            let tone = output.play(self.pattern, on_complete)?;
            state.tone = ToneState::Playing {
                generation,
                tone: Some(tone),
            };
        }

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // A dropped sender also counts as completion.
            let _ = completed.await;
            let mut state = lock(&state);
            if state.is_current(generation) {
                state.tone = ToneState::Idle;
                log::debug!("Tone of generation {generation} finished");
            }
        });

        Ok(())
    }
}

fn lock(state: &Mutex<ToneEngineState>) -> MutexGuard<'_, ToneEngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AlertChannel for ToneEngine {
    fn name(&self) -> &'static str {
        "tone"
    }

    async fn deliver(&self, _alert: &Alert) -> anyhow::Result<()> {
        self.start().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
