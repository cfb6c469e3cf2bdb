use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

use super::*;

#[derive(Default)]
struct Recorded {
    next_id: ToneId,
    played: Vec<ToneId>,
    stopped: Vec<ToneId>,
    completions: HashMap<ToneId, oneshot::Sender<()>>,
    resumes: usize,
}

struct FakeOutput {
    recorded: Mutex<Recorded>,
    output_state: Mutex<OutputState>,
    fail_play: AtomicBool,
    resume_gate: Option<Arc<Notify>>,
}

impl FakeOutput {
    fn new(output_state: OutputState) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::default(),
            output_state: Mutex::new(output_state),
            fail_play: AtomicBool::new(false),
            resume_gate: None,
        })
    }

    fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::default(),
            output_state: Mutex::new(OutputState::Suspended),
            fail_play: AtomicBool::new(false),
            resume_gate: Some(gate),
        })
    }

    fn finish(&self, tone: ToneId) {
        if let Some(completion) = self.recorded.lock().unwrap().completions.remove(&tone) {
            let _ = completion.send(());
        }
    }

    fn played(&self) -> Vec<ToneId> {
        self.recorded.lock().unwrap().played.clone()
    }

    fn stopped(&self) -> Vec<ToneId> {
        self.recorded.lock().unwrap().stopped.clone()
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    fn state(&self) -> OutputState {
        *self.output_state.lock().unwrap()
    }

    async fn resume(&self) -> Result<(), AudioError> {
        self.recorded.lock().unwrap().resumes += 1;
        if let Some(gate) = &self.resume_gate {
            gate.notified().await;
        }
        *self.output_state.lock().unwrap() = OutputState::Running;
        Ok(())
    }

    fn play(&self, _: TonePattern, on_complete: oneshot::Sender<()>) -> Result<ToneId, AudioError> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(AudioError::Play("device busy".to_string()));
        }

        let mut recorded = self.recorded.lock().unwrap();
        recorded.next_id += 1;
        let id = recorded.next_id;
        recorded.played.push(id);
        recorded.completions.insert(id, on_complete);
        Ok(id)
    }

    fn stop(&self, tone: ToneId) -> Result<(), AudioError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.stopped.push(tone);
        match recorded.completions.remove(&tone) {
            Some(completion) => {
                let _ = completion.send(());
                Ok(())
            }
            None => Err(AudioError::Play("tone already stopped".to_string())),
        }
    }
}

fn engine_for(output: &Arc<FakeOutput>) -> ToneEngine {
    let output = Arc::clone(output);
    ToneEngine::new(move || Ok(Arc::clone(&output) as Arc<dyn AudioOutput>))
}

async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn tone_returns_to_idle_when_it_finishes() {
    let output = FakeOutput::new(OutputState::Running);
    let engine = engine_for(&output);

    engine.start().await;
    assert!(engine.is_playing());
    assert_eq!(output.played(), [1]);

    output.finish(1);
    settle().await;

    assert!(!engine.is_playing());
}

#[tokio::test]
async fn starting_again_cuts_off_the_previous_tone() {
    let output = FakeOutput::new(OutputState::Running);
    let engine = engine_for(&output);

    engine.start().await;
    engine.start().await;
    settle().await;

    assert_eq!(output.played(), [1, 2]);
    assert_eq!(output.stopped(), [1], "The first tone should be stopped, not queued.");
    assert!(
        engine.is_playing(),
        "Completion of the pre-empted tone must not end the new one."
    );

    output.finish(2);
    settle().await;
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn play_failure_leaves_engine_idle() {
    let output = FakeOutput::new(OutputState::Running);
    output.fail_play.store(true, Ordering::SeqCst);
    let engine = engine_for(&output);

    engine.start().await;

    assert!(!engine.is_playing());
    assert!(output.played().is_empty());
}

#[tokio::test]
async fn suspended_output_is_resumed_before_playing() {
    let output = FakeOutput::new(OutputState::Suspended);
    let engine = engine_for(&output);

    engine.start().await;

    assert_eq!(output.recorded.lock().unwrap().resumes, 1);
    assert_eq!(output.played(), [1]);
}

#[tokio::test]
async fn output_is_opened_once_and_reused() {
    let output = FakeOutput::new(OutputState::Running);
    let opened = Arc::new(AtomicUsize::new(0));
    let engine = {
        let output = Arc::clone(&output);
        let opened = Arc::clone(&opened);
        ToneEngine::new(move || {
            opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&output) as Arc<dyn AudioOutput>)
        })
    };

    engine.start().await;
    engine.start().await;
    engine.start().await;

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(output.played().len(), 3);
}

#[tokio::test]
async fn failing_to_open_output_is_retried_on_next_start() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let engine = {
        let attempts = Arc::clone(&attempts);
        ToneEngine::new(move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(AudioError::Open("no device".to_string()))
        })
    };

    engine.start().await;
    assert!(!engine.is_playing());

    engine.start().await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn output_that_became_unavailable_is_opened_again() {
    let first = FakeOutput::new(OutputState::Running);
    let second = FakeOutput::new(OutputState::Running);
    let opened = Arc::new(AtomicUsize::new(0));
    let engine = {
        let outputs = [Arc::clone(&first), Arc::clone(&second)];
        let opened = Arc::clone(&opened);
        ToneEngine::new(move || {
            let index = opened.fetch_add(1, Ordering::SeqCst).min(1);
            Ok(Arc::clone(&outputs[index]) as Arc<dyn AudioOutput>)
        })
    };

    engine.start().await;
    first.finish(1);
    settle().await;
    *first.output_state.lock().unwrap() = OutputState::Unavailable;

    engine.start().await;

    assert_eq!(opened.load(Ordering::SeqCst), 2);
    assert_eq!(first.played(), [1]);
    assert_eq!(second.played(), [1]);
    assert!(engine.is_playing());
}

#[tokio::test]
async fn opening_the_output_does_not_hold_the_engine() {
    let output = FakeOutput::new(OutputState::Running);
    let (release, released) = mpsc::channel::<()>();
    let engine = {
        let output = Arc::clone(&output);
        let released = Mutex::new(released);
        Arc::new(ToneEngine::new(move || {
            let _ = released.lock().unwrap().recv();
            Ok(Arc::clone(&output) as Arc<dyn AudioOutput>)
        }))
    };

    let starting = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.start().await }
    });
    settle().await;

    assert!(engine.is_playing(), "State is readable while the device opens.");
    assert!(output.played().is_empty());

    release.send(()).unwrap();
    starting.await.unwrap();
    assert_eq!(output.played(), [1]);
}

#[tokio::test]
async fn cancel_while_resuming_prevents_playback() {
    let gate = Arc::new(Notify::new());
    let output = FakeOutput::gated(Arc::clone(&gate));
    let engine = Arc::new(engine_for(&output));

    let starting = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.start().await }
    });
    settle().await;
    assert!(engine.is_playing());

    engine.cancel();
    gate.notify_one();
    starting.await.unwrap();

    assert!(output.played().is_empty());
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn cancel_stops_the_active_tone() {
    let output = FakeOutput::new(OutputState::Running);
    let engine = engine_for(&output);

    engine.start().await;
    engine.cancel();
    settle().await;

    assert_eq!(output.stopped(), [1]);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn cancel_ignores_stop_errors_and_idle_engine() {
    let output = FakeOutput::new(OutputState::Running);
    let engine = engine_for(&output);

    engine.cancel();

    engine.start().await;
    output.recorded.lock().unwrap().completions.clear();
    engine.cancel();

    assert!(!engine.is_playing());
}

#[tokio::test]
async fn unavailable_output_never_plays() {
    let engine = ToneEngine::unavailable();

    engine.start().await;

    assert!(!engine.is_playing());
}
