use futures::channel::mpsc::{channel, Sender};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::detection::calibrate::ThresholdCalibrator;
use crate::detection::types::{GestureEvent, Sample, Thresholds};
use crate::detection::session::SessionHandle;
use crate::detection::stats::SessionStats;
use crate::pipeline::constants::MAX_SUMMARY_GESTURES;
use crate::pipeline::types::{GestureLog, PipelineCommand, PipelineEvent, PipelineOptions, SessionSummary};
use crate::sensor::constants::SAMPLE_CHANNEL_CAPACITY;
use crate::sensor::types::SensorEvent;

struct EventSink {
    sender: Sender<PipelineEvent>,
    closed: bool,
}

impl EventSink {
    async fn emit(&mut self, event: PipelineEvent) {
        if self.closed {
            return;
        }

        if let Err(err) = self.sender.send(event).await {
            warn!("Pipeline event receiver went away, events are dropped from now on: {:?}", err);
            self.closed = true;
        }
    }
}

struct Pipeline {
    // created on the first sample so that its timers start at the sensor's clock
    session: Option<SessionHandle>,
    thresholds: Thresholds,
    calibrator: ThresholdCalibrator,
    calibrating: bool,
    samples: usize,
    last_timestamp: Option<u64>,
    gestures: GestureLog,
    events: EventSink,
}

impl Pipeline {
    async fn handle_sample(&mut self, sample: Sample) {
        let now = sample.timestamp;
        let thresholds = self.thresholds;
        let session = self.session.get_or_insert_with(|| SessionHandle::init(thresholds, now));
        let output = session.tick(sample);
        let breath_count = session.breath_count();
        let average_ms = session.average_breath_duration_ms();
        let breath_start_time = session.breath_start_time();
        self.samples += 1;
        self.last_timestamp = Some(now);

        if output.info.transitioned {
            self.events.emit(PipelineEvent::StateChange {
                from: output.info.previous_state,
                to: output.state,
                at: now,
                normalized: output.normalized,
            }).await;
        }

        if let Some(duration_ms) = output.info.completed_cycle_ms {
            self.events.emit(PipelineEvent::BreathCompleted {
                count: breath_count,
                duration_ms,
                average_ms,
            }).await;
        }

        if self.calibrating {
            self.calibrator.observe(sample.pressure_delta);

            if let Some(thresholds) = self.calibrator.poll(output.state, breath_start_time, now) {
                self.apply_thresholds(thresholds);
                self.calibrating = false;
                self.events.emit(PipelineEvent::CalibrationSaved(thresholds)).await;
            }
        }

        match output.gesture {
            GestureEvent::None => {},
            gesture => {
                self.gestures.push(now, gesture);
                self.events.emit(PipelineEvent::Gesture { gesture, at: now }).await;

                if gesture == GestureEvent::ResetSession {
                    if let Some(session) = self.session.as_mut() {
                        session.reset_session(now);
                    }
                }
            },
        }
    }

    fn apply_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
        if let Some(session) = self.session.as_mut() {
            session.set_thresholds(thresholds);
        }
    }

    fn handle_command(&mut self, command: PipelineCommand) {
        debug!("Pipeline command {:?}", command);

        match command {
            PipelineCommand::SetThresholds(thresholds) => {
                self.apply_thresholds(thresholds);
            },
            PipelineCommand::ResetSession => {
                if let (Some(session), Some(now)) = (self.session.as_mut(), self.last_timestamp) {
                    session.reset_session(now);
                }
            },
            PipelineCommand::ResetCalibration => {
                if let Some(session) = self.session.as_mut() {
                    session.reset_calibration();
                }
            },
            PipelineCommand::StartCalibration => {
                info!("Calibration started: take a few deep breaths, then hold your breath to save");
                self.calibrator.reset();
                self.calibrating = true;
            },
        }
    }

    fn summary(&self) -> SessionSummary {
        let stats = match (&self.session, self.last_timestamp) {
            (Some(session), Some(now)) => session.stats(now),
            _ => SessionStats {
                breath_count: 0,
                session_duration_secs: 0,
                breaths_per_minute: None,
                average_breath_duration_ms: None,
            },
        };

        let calibration_bounds = self.session.as_ref()
            .map(|session| session.calibration_bounds())
            .unwrap_or_default();

        SessionSummary {
            samples: self.samples,
            stats,
            thresholds: self.thresholds,
            calibration_bounds,
            gesture_count: self.gestures.total(),
            gestures: self.gestures.recent(),
        }
    }
}

/// Spawns the task that runs each sensor sample through the breath session.
///
/// The task stops when `cancel` fires or when every sample sender has been
/// dropped, and resolves to a summary of the session.
pub fn breath_pipeline(
    cancel: CancellationToken,
    thresholds: Thresholds,
    options: PipelineOptions,
    events: Sender<PipelineEvent>,
) -> (Sender<SensorEvent>, Sender<PipelineCommand>, JoinHandle<SessionSummary>) {
    let (sample_sender, mut sample_receiver) = channel::<SensorEvent>(SAMPLE_CHANNEL_CAPACITY);
    let (command_sender, mut command_receiver) = channel::<PipelineCommand>(8);

    let handle = spawn(async move {
        let mut pipeline = Pipeline {
            session: None,
            thresholds,
            calibrator: ThresholdCalibrator::new(),
            calibrating: false,
            samples: 0,
            last_timestamp: None,
            gestures: GestureLog::new(MAX_SUMMARY_GESTURES),
            events: EventSink { sender: events, closed: false },
        };

        if options.calibrate {
            pipeline.handle_command(PipelineCommand::StartCalibration);
        }

        'mainloop: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(command) = command_receiver.next() => {
                    pipeline.handle_command(command);
                },
                event = sample_receiver.next() => match event {
                    Some(SensorEvent::Sample(sample)) => pipeline.handle_sample(sample).await,
                    None => break 'mainloop,
                },
            }
        }

        let summary = pipeline.summary();
        info!("Session finished after {} samples: {}", summary.samples, summary.stats);
        summary
    });

    (sample_sender, command_sender, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::{BreathState, CalibrationBounds};

    async fn run_samples(
        options: PipelineOptions,
        commands: Vec<PipelineCommand>,
        samples: Vec<Sample>,
    ) -> (Vec<PipelineEvent>, SessionSummary) {
        let (event_sender, event_receiver) = channel::<PipelineEvent>(1024);
        let (mut sample_sender, mut command_sender, handle) =
            breath_pipeline(CancellationToken::new(), Thresholds::default(), options, event_sender);

        for command in commands {
            command_sender.send(command).await.unwrap();
        }
        for sample in samples {
            sample_sender.send(SensorEvent::Sample(sample)).await.unwrap();
        }
        drop(sample_sender);

        let summary = handle.await.unwrap();
        let events = event_receiver.collect().await;
        (events, summary)
    }

    fn samples_every(step: usize, until: u64, delta: impl Fn(u64) -> f32) -> Vec<Sample> {
        (0..=until).step_by(step).map(|t| Sample::new(delta(t), t)).collect()
    }

    #[tokio::test]
    async fn reports_transitions_and_breaths() {
        let samples = vec![
            Sample::new(6.0, 0),
            Sample::new(-6.0, 200),
            Sample::new(6.0, 400),
            Sample::new(-6.0, 600),
        ];
        let (events, summary) = run_samples(PipelineOptions::default(), vec![], samples).await;

        assert_eq!(events[0], PipelineEvent::StateChange {
            from: BreathState::Idle,
            to: BreathState::Exhale,
            at: 0,
            normalized: 0.6,
        });
        let completed: Vec<_> = events.iter()
            .filter(|event| matches!(event, PipelineEvent::BreathCompleted { .. }))
            .collect();
        assert_eq!(completed.len(), 2);
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.stats.breath_count, 2);
        assert!(summary.gestures.is_empty());
        assert_eq!(summary.gesture_count, 0);
    }

    #[tokio::test]
    async fn hold_gesture_resets_session() {
        let mut samples = vec![
            Sample::new(6.0, 0),
            Sample::new(-6.0, 200),
            Sample::new(0.0, 400),
        ];
        samples.extend(samples_every(100, 10_000, |_| 0.0).into_iter().filter(|s| s.timestamp > 400));

        let (events, summary) = run_samples(PipelineOptions::default(), vec![], samples).await;

        // hold starts 3 s after the last transition (400 ms), and fires 5 s later
        assert_eq!(summary.gestures, vec![(8600, GestureEvent::ResetSession)]);
        assert_eq!(summary.gesture_count, 1);
        assert_eq!(summary.stats.breath_count, 0);
        assert!(events.contains(&PipelineEvent::Gesture {
            gesture: GestureEvent::ResetSession,
            at: 8600,
        }));
    }

    #[tokio::test]
    async fn calibration_saves_thresholds_on_hold() {
        let mut samples = vec![
            Sample::new(-20.0, 0),
            Sample::new(0.0, 300),
            Sample::new(30.0, 600),
            Sample::new(0.0, 900),
        ];
        samples.extend(samples_every(100, 10_000, |_| 0.0).into_iter().filter(|s| s.timestamp > 900));

        let options = PipelineOptions { calibrate: true };
        let (events, summary) = run_samples(options, vec![], samples).await;

        let saved = events.iter().find_map(|event| match event {
            PipelineEvent::CalibrationSaved(thresholds) => Some(*thresholds),
            _ => None,
        }).unwrap();
        assert!((saved.inhale + 14.0).abs() < 1e-4);
        assert!((saved.exhale - 21.0).abs() < 1e-4);
        assert_eq!(summary.thresholds, saved);
    }

    #[tokio::test]
    async fn commands_apply_before_queued_samples() {
        let samples = vec![Sample::new(-3.0, 0)];
        let commands = vec![PipelineCommand::SetThresholds(Thresholds::new(-2.0, 2.0))];
        let (events, summary) = run_samples(PipelineOptions::default(), commands, samples).await;

        assert_eq!(summary.thresholds, Thresholds::new(-2.0, 2.0));
        assert!(matches!(events[0], PipelineEvent::StateChange { to: BreathState::Inhale, .. }));
    }

    #[tokio::test]
    async fn reset_session_command_clears_breaths_mid_stream() {
        let (event_sender, mut event_receiver) = channel::<PipelineEvent>(1024);
        let (mut sample_sender, mut command_sender, handle) =
            breath_pipeline(CancellationToken::new(), Thresholds::default(), PipelineOptions::default(), event_sender);

        sample_sender.send(SensorEvent::Sample(Sample::new(6.0, 0))).await.unwrap();
        sample_sender.send(SensorEvent::Sample(Sample::new(-6.0, 200))).await.unwrap();
        loop {
            let event = event_receiver.next().await.unwrap();
            if matches!(event, PipelineEvent::BreathCompleted { count: 1, .. }) {
                break;
            }
        }

        // the reset happens at the last sample seen, 200 ms
        command_sender.send(PipelineCommand::ResetSession).await.unwrap();
        sample_sender.send(SensorEvent::Sample(Sample::new(-6.0, 1100))).await.unwrap();
        drop(sample_sender);

        let summary = handle.await.unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.stats.breath_count, 0);
        // 900 ms since the reset, where 1100 ms since the start would round to 1 s
        assert_eq!(summary.stats.session_duration_secs, 0);
    }

    #[tokio::test]
    async fn reset_calibration_command_restores_initial_bounds() {
        let (event_sender, mut event_receiver) = channel::<PipelineEvent>(1024);
        let (mut sample_sender, mut command_sender, handle) =
            breath_pipeline(CancellationToken::new(), Thresholds::default(), PipelineOptions::default(), event_sender);

        sample_sender.send(SensorEvent::Sample(Sample::new(-40.0, 0))).await.unwrap();
        assert!(matches!(
            event_receiver.next().await,
            Some(PipelineEvent::StateChange { to: BreathState::Inhale, .. })
        ));

        command_sender.send(PipelineCommand::ResetCalibration).await.unwrap();
        sample_sender.send(SensorEvent::Sample(Sample::new(0.0, 100))).await.unwrap();
        drop(sample_sender);

        let summary = handle.await.unwrap();
        assert_eq!(summary.calibration_bounds, CalibrationBounds::default());
        assert_eq!(summary.calibration_bounds.min, -10.0);
        assert_eq!(summary.calibration_bounds.max, 10.0);
    }

    #[tokio::test]
    async fn envelope_is_reported_without_reset() {
        let samples = vec![Sample::new(-40.0, 0), Sample::new(25.0, 100)];
        let (_, summary) = run_samples(PipelineOptions::default(), vec![], samples).await;

        assert_eq!(summary.calibration_bounds, CalibrationBounds { min: -40.0, max: 25.0 });
    }

    #[tokio::test]
    async fn session_clock_starts_at_first_sample() {
        let samples = vec![Sample::new(0.0, 100_000), Sample::new(0.0, 100_100)];
        let (events, summary) = run_samples(PipelineOptions::default(), vec![], samples).await;

        // no hold, even though the sensor clock is far past the hold timeout
        assert!(events.is_empty());
        assert_eq!(summary.stats.session_duration_secs, 0);
    }

    #[tokio::test]
    async fn cancel_stops_the_task() {
        let cancel = CancellationToken::new();
        let (event_sender, _event_receiver) = channel::<PipelineEvent>(8);
        let (_samples, _commands, handle) =
            breath_pipeline(cancel.clone(), Thresholds::default(), PipelineOptions::default(), event_sender);

        cancel.cancel();
        let summary = handle.await.unwrap();
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.stats.session_duration_secs, 0);
    }
}
