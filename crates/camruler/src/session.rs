//! The live measurement loop.
//!
//! One [`Session::step`] pulls a frame, undistorts it when a lens model is
//! known, draws the following crosshair while uncalibrated or measures objects
//! once calibrated, presents the result and reacts to the input returned by
//! the sink. Manual calibration freezes the current frame and feeds pointer
//! events to a [`PointCollector`] until two points are clicked or the cancel
//! key is pressed.

use camruler_calib::{
    CalibrationEngine, CalibrationState, ChessCornerDetector, CollectorPhase, CornerDetector,
    PointCollector,
};
use camruler_core::{Frame, OverlayRenderer, PixelPoint};
use camruler_measure::{ContourDetector, MeasuredObject, MeasurementEngine};
use log::{debug, info, warn};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::input::InputEvent;

/// Supplies raw frames. `Ok(None)` means the stream has ended; live cameras
/// never return it.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SessionError>;
}

/// Shows annotated frames and returns the input gathered while doing so.
pub trait DisplaySink {
    fn present(&mut self, frame: &Frame) -> Result<Vec<InputEvent>, SessionError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Continue,
    /// The confirm key was pressed; carries the measurements of the last
    /// processed frame.
    Confirmed(Vec<MeasuredObject>),
    Quit,
    EndOfStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Live,
    CollectingPoints,
}

enum Phase {
    Live,
    Collecting {
        frozen: Frame,
        collector: PointCollector,
    },
}

pub struct Session<S, D, C = ChessCornerDetector> {
    source: S,
    sink: D,
    config: SessionConfig,
    calibration: CalibrationEngine<C>,
    contours: ContourDetector,
    measurement: MeasurementEngine,
    phase: Phase,
    cursor: PixelPoint,
    last: Vec<MeasuredObject>,
    frames: usize,
}

impl<S: FrameSource, D: DisplaySink> Session<S, D> {
    /// Session with the ChESS corner detector; loads the overlay font if one
    /// is configured.
    pub fn new(source: S, sink: D, config: SessionConfig) -> Result<Self, SessionError> {
        let overlay = OverlayRenderer::new(config.overlay.clone())?;
        let calibration = CalibrationEngine::new(config.calibration.clone());
        Ok(Self::with_parts(source, sink, config, calibration, overlay))
    }
}

impl<S: FrameSource, D: DisplaySink, C: CornerDetector> Session<S, D, C> {
    pub fn with_parts(
        source: S,
        sink: D,
        config: SessionConfig,
        calibration: CalibrationEngine<C>,
        overlay: OverlayRenderer,
    ) -> Self {
        let contours = ContourDetector::new(config.contours.clone());
        let measurement = MeasurementEngine::new(config.measure.clone(), overlay);
        Self {
            source,
            sink,
            config,
            calibration,
            contours,
            measurement,
            phase: Phase::Live,
            cursor: PixelPoint::default(),
            last: Vec::new(),
            frames: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn calibration(&self) -> &CalibrationState {
        self.calibration.state()
    }

    pub fn restore_calibration(&mut self, state: CalibrationState) {
        self.calibration.restore(state);
    }

    pub fn mode(&self) -> SessionMode {
        match self.phase {
            Phase::Live => SessionMode::Live,
            Phase::Collecting { .. } => SessionMode::CollectingPoints,
        }
    }

    /// Measurements of the most recent live frame.
    pub fn last_measurements(&self) -> &[MeasuredObject] {
        &self.last
    }

    pub fn frames_processed(&self) -> usize {
        self.frames
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn into_parts(self) -> (S, D) {
        (self.source, self.sink)
    }

    /// Run until quit or end of stream; returns the number of frames pulled.
    pub fn run<F>(&mut self, mut on_confirm: F) -> Result<usize, SessionError>
    where
        F: FnMut(&[MeasuredObject]),
    {
        loop {
            match self.step()? {
                StepOutcome::Continue => {}
                StepOutcome::Confirmed(objects) => on_confirm(&objects),
                StepOutcome::Quit | StepOutcome::EndOfStream => break,
            }
        }
        info!("session finished after {} frames", self.frames);
        Ok(self.frames)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn step(&mut self) -> Result<StepOutcome, SessionError> {
        let outcome = if matches!(self.phase, Phase::Live) {
            self.step_live()?
        } else {
            self.step_collecting()?
        };
        self.finish_collection();
        Ok(outcome)
    }

    fn step_live(&mut self) -> Result<StepOutcome, SessionError> {
        let Some(source) = self.source.next_frame()? else {
            return Ok(StepOutcome::EndOfStream);
        };
        self.frames += 1;
        // Checkerboard calibration fits the lens, so it needs the source frame.
        let corrected = if self.config.undistort {
            self.calibration.undistort(&source)
        } else {
            None
        };
        let frame = corrected.as_ref().unwrap_or(&source);

        let mut shown = frame.clone();
        let overlay = self.measurement.overlay();
        if self.calibration.is_calibrated() {
            let contours = self.contours.find_contours(frame);
            match self
                .measurement
                .measure_object(self.calibration.state(), &mut shown, contours)
            {
                Ok(objects) => self.last = objects,
                Err(e) => {
                    warn!("measurement failed: {e}");
                    self.last.clear();
                }
            }
            overlay.add_text_top_left(&mut shown, &format!("{} object(s)", self.last.len()));
        } else {
            overlay.dynamic_crosshair(&mut shown, self.cursor);
            let keys = &self.config.keys;
            overlay.add_text_top_left(
                &mut shown,
                &format!(
                    "Not calibrated\n'{}': reference points  '{}': checkerboard",
                    keys.manual_calibration, keys.checkerboard_calibration
                ),
            );
            self.last.clear();
        }

        let events = self.sink.present(&shown)?;
        let frozen = corrected.unwrap_or_else(|| source.clone());
        Ok(self.handle_live_events(events, source, frozen))
    }

    /// `source` is the frame as captured; `frozen` is what was displayed
    /// (undistorted when a lens model applies).
    fn handle_live_events(
        &mut self,
        events: Vec<InputEvent>,
        source: Frame,
        frozen: Frame,
    ) -> StepOutcome {
        let keys = self.config.keys.clone();
        let mut frozen = Some(frozen);
        let mut outcome = StepOutcome::Continue;

        for event in events {
            if matches!(self.phase, Phase::Collecting { .. }) {
                if let Some(quit) = self.handle_collect_event(event) {
                    return quit;
                }
                continue;
            }
            match event {
                InputEvent::PointerMove { x, y } | InputEvent::PointerDown { x, y } => {
                    self.cursor = PixelPoint::new(x, y);
                }
                InputEvent::Key(k) if k == keys.quit => return StepOutcome::Quit,
                InputEvent::Key(k) if k == keys.confirm => {
                    info!("confirmed {} measurement(s)", self.last.len());
                    outcome = StepOutcome::Confirmed(self.last.clone());
                }
                InputEvent::Key(k) if k == keys.manual_calibration => {
                    if let Some(frozen) = frozen.take() {
                        info!(
                            "manual calibration: click two points {} cm apart",
                            self.config.known_distance_cm
                        );
                        let mut collector = PointCollector::new();
                        collector.pointer_move(self.cursor);
                        self.phase = Phase::Collecting { frozen, collector };
                    }
                }
                InputEvent::Key(k) if k == keys.checkerboard_calibration => {
                    let spec = self.config.checkerboard;
                    match self.calibration.calibrate_checkerboard(&source, &spec) {
                        Ok(c) => info!(
                            "checkerboard calibration done: {:.6} cm/px",
                            c.pixel_to_cm
                        ),
                        Err(e) => warn!("checkerboard calibration failed: {e}"),
                    }
                }
                InputEvent::Key(k) => debug!("unbound key {k}"),
            }
        }
        outcome
    }

    fn step_collecting(&mut self) -> Result<StepOutcome, SessionError> {
        let Phase::Collecting { frozen, collector } = &self.phase else {
            return Ok(StepOutcome::Continue);
        };
        let shown = collector.render(frozen, self.measurement.overlay());
        let events = self.sink.present(&shown)?;
        for event in events {
            if let Some(quit) = self.handle_collect_event(event) {
                return Ok(quit);
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn handle_collect_event(&mut self, event: InputEvent) -> Option<StepOutcome> {
        let keys = &self.config.keys;
        let Phase::Collecting { collector, .. } = &mut self.phase else {
            return None;
        };
        match event {
            InputEvent::PointerMove { x, y } => collector.pointer_move(PixelPoint::new(x, y)),
            InputEvent::PointerDown { x, y } => {
                collector.pointer_down(PixelPoint::new(x, y));
            }
            InputEvent::Key(k) if k == keys.cancel => collector.cancel(),
            InputEvent::Key(k) if k == keys.quit => return Some(StepOutcome::Quit),
            InputEvent::Key(_) => {}
        }
        None
    }

    /// Leave point collection once it is done (apply the ratio) or cancelled.
    fn finish_collection(&mut self) {
        let phase = match &self.phase {
            Phase::Collecting { collector, .. } => collector.phase(),
            Phase::Live => return,
        };
        match phase {
            CollectorPhase::Done(pair) => {
                match self
                    .calibration
                    .calibrate_manual(&pair, self.config.known_distance_cm)
                {
                    Ok(ratio) => info!("calibrated: {ratio:.4} cm/px"),
                    Err(e) => warn!("manual calibration failed: {e}"),
                }
                self.cursor = pair.second;
                self.phase = Phase::Live;
            }
            CollectorPhase::Cancelled => {
                info!("manual calibration cancelled");
                self.phase = Phase::Live;
            }
            CollectorPhase::AwaitingFirst | CollectorPhase::AwaitingSecond { .. } => {}
        }
    }
}
