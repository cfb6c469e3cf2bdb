use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{ChannelCount, OutputStreamBuilder, SampleRate, Sink, Source};
use tokio::sync::oneshot;

use super::{AudioError, AudioOutput, OutputState, ToneId, TonePattern};

const SAMPLE_RATE: SampleRate = 44_100;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mono samples of a [`TonePattern`].
struct ToneSource {
    pattern: TonePattern,
    position: u64,
    total: u64,
}

impl ToneSource {
    fn new(pattern: TonePattern) -> Self {
        Self {
            pattern,
            position: 0,
            total: pattern.total_samples(SAMPLE_RATE),
        }
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total {
            return None;
        }
        let elapsed = Duration::from_secs_f64(self.position as f64 / f64::from(SAMPLE_RATE));
        self.position += 1;
        Some(self.pattern.sample_at(elapsed))
    }
}

impl Source for ToneSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> ChannelCount {
        1
    }

    fn sample_rate(&self) -> SampleRate {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.pattern.duration)
    }
}

enum AudioCommand {
    Play {
        tone: ToneId,
        pattern: TonePattern,
        on_complete: oneshot::Sender<()>,
    },
    Stop {
        tone: ToneId,
    },
}

/// Plays tones on the default output device.
///
/// The output stream lives on a dedicated thread; tones are sent to it as
/// commands and the thread polls each sink to report completion.
pub struct RodioAudioOutput {
    commands: Mutex<mpsc::Sender<AudioCommand>>,
    next_tone: AtomicU64,
    closed: Arc<AtomicBool>,
}

impl RodioAudioOutput {
    pub fn open() -> Result<Self, AudioError> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let closed = Arc::new(AtomicBool::new(false));
        let thread_closed = Arc::clone(&closed);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Open(e.to_string())));
                        return;
                    }
                };
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(()));

                run_output_loop(&stream, receiver);
                thread_closed.store(true, Ordering::SeqCst);
                log::info!("Audio output thread finished");
            })
            .map_err(|e| AudioError::Open(e.to_string()))?;

        ready_rx.recv().map_err(|_| AudioError::Closed)??;

        Ok(Self {
            commands: Mutex::new(commands),
            next_tone: AtomicU64::new(1),
            closed,
        })
    }

    fn send(&self, command: AudioCommand) -> Result<(), AudioError> {
        self.commands
            .lock()
            .map_err(|_| AudioError::Closed)?
            .send(command)
            .map_err(|_| AudioError::Closed)
    }
}

fn run_output_loop(stream: &rodio::OutputStream, receiver: mpsc::Receiver<AudioCommand>) {
    let mut playing: HashMap<ToneId, (Sink, oneshot::Sender<()>)> = HashMap::new();

    loop {
        let finished: Vec<ToneId> = playing
            .iter()
            .filter(|(_, (sink, _))| sink.empty())
            .map(|(tone, _)| *tone)
            .collect();
        for tone in finished {
            if let Some((_, on_complete)) = playing.remove(&tone) {
                log::debug!("Tone {tone} finished");
                let _ = on_complete.send(());
            }
        }

        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(AudioCommand::Play {
                tone,
                pattern,
                on_complete,
            }) => {
                let sink = Sink::connect_new(stream.mixer());
                sink.append(ToneSource::new(pattern));
                sink.play();
                playing.insert(tone, (sink, on_complete));
            }
            Ok(AudioCommand::Stop { tone }) => {
                if let Some((sink, on_complete)) = playing.remove(&tone) {
                    sink.stop();
                    let _ = on_complete.send(());
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    fn state(&self) -> OutputState {
        if self.closed.load(Ordering::SeqCst) {
            OutputState::Unavailable
        } else {
            OutputState::Running
        }
    }

    async fn resume(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&self, pattern: TonePattern, on_complete: oneshot::Sender<()>) -> Result<ToneId, AudioError> {
        let tone = self.next_tone.fetch_add(1, Ordering::SeqCst);
        self.send(AudioCommand::Play {
            tone,
            pattern,
            on_complete,
        })?;
        Ok(tone)
    }

    fn stop(&self, tone: ToneId) -> Result<(), AudioError> {
        self.send(AudioCommand::Stop { tone })
    }
}
