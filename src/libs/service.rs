//! Contact-frequency and distance map services.
//!
//! A service owns one aggregation worker, the last aggregate it received and
//! the RGBA buffer it paints into. The contact flavor also owns the distance
//! threshold and its paired input control.

use crate::libs::canvas::{present, DisplaySurface};
use crate::libs::channel::{
    BusyGuard, BusyIndicator, ComputeRequestChannel, PendingJob, Resolution,
};
use crate::libs::color::{
    paint_into, ColorScale, ContactColorScale, DistanceColorScale, Palette, RgbaMatrix,
};
use crate::libs::ensemble::{Bounds, EnsembleSource};
use crate::libs::error::LiveMapError;
use crate::libs::locus::Genome;
use crate::libs::record::{extract_records, ContactRecord};
use crate::libs::viewer::Dataset;
use crate::libs::worker::{max_distance, Job, Mode, MAX_THRESHOLD};

pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 256.0;
pub const MAX_DISTANCE_THRESHOLD: f64 = MAX_THRESHOLD;

pub fn clamp_threshold(threshold: f64) -> f64 {
    num_traits::clamp(threshold, 0.0, MAX_DISTANCE_THRESHOLD)
}

/// `floor(2 * radius / 4)`. Assumes a roughly spherical trace.
pub fn distance_threshold_estimate(bounds: &Bounds) -> f64 {
    clamp_threshold((2.0 * bounds.radius / 4.0).floor())
}

/// The numeric threshold control, holding its text the way an input box does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdInput {
    text: String,
}

impl ThresholdInput {
    pub fn new(value: f64) -> Self {
        Self {
            text: value.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// User typing
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_value(&mut self, value: f64) {
        self.text = value.to_string();
    }

    /// Parses the text as an integer clamped to `[0, 10000]`, rewriting the
    /// text to the clamped value.
    pub fn commit(&mut self) -> Option<f64> {
        match self.text.trim().parse::<i64>() {
            Ok(v) => {
                let v = clamp_threshold(v as f64);
                self.set_value(v);
                Some(v)
            }
            Err(_) => {
                log::warn!("Ignoring distance threshold [{}], not an integer", self.text);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceSource {
    #[default]
    Ensemble,
    /// Only the current trace
    Trace,
}

/// The last aggregate a service received
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBuffer {
    pub trace_length: usize,
    pub values: Vec<f64>,
}

/// What a service needs to read before it can compute.
pub struct ComputeContext<'a> {
    pub source: &'a dyn EnsembleSource,
    pub genome: &'a Genome,
    pub busy: &'a dyn BusyIndicator,
}

/// Where and how a finished aggregate gets drawn.
pub struct RenderTarget<'a> {
    pub surface: &'a mut DisplaySurface,
    pub palette: &'a Palette,
    /// The active live-map dataset, whose record store follows each contact map
    pub live_dataset: Option<&'a Dataset>,
}

#[derive(Debug, PartialEq)]
pub enum RenderOutcome {
    Presented,
    /// Dispatched; the result lands on a later poll
    Pending,
    /// Nothing to do: no ensemble, no locus, or no genome mapping for it
    Skipped,
    /// A newer job was dispatched while this one ran
    Superseded,
    /// Logged; the previous frame stays up
    Failed(LiveMapError),
}

/// A job on its way through the worker
#[derive(Debug)]
pub struct PendingCompute {
    job: PendingJob,
    trace_length: usize,
    bin_size: f64,
}

impl PendingCompute {
    pub fn job(&self) -> &PendingJob {
        &self.job
    }
}

pub struct MapComputeService {
    mode: Mode,
    channel: ComputeRequestChannel,
    threshold: Option<f64>,
    input: ThresholdInput,
    distance_source: DistanceSource,
    buffer: Option<AggregateBuffer>,
    rgba: RgbaMatrix,
    records: Vec<ContactRecord>,
    max_distance: f64,
}

impl MapComputeService {
    /// Contact-frequency service. Without a starting threshold the first
    /// computation estimates one from the current trace.
    pub fn contact(threshold: Option<f64>) -> anyhow::Result<Self> {
        let threshold = threshold.map(clamp_threshold);
        Self::spawn(Mode::Contact, threshold)
    }

    pub fn distance() -> anyhow::Result<Self> {
        Self::spawn(Mode::Distance, None)
    }

    fn spawn(mode: Mode, threshold: Option<f64>) -> anyhow::Result<Self> {
        let channel = ComputeRequestChannel::spawn(match mode {
            Mode::Contact => "live-contact",
            Mode::Distance => "live-distance",
        })?;

        Ok(Self {
            mode,
            channel,
            threshold,
            input: ThresholdInput::new(threshold.unwrap_or(DEFAULT_DISTANCE_THRESHOLD)),
            distance_source: DistanceSource::default(),
            buffer: None,
            rgba: RgbaMatrix::default(),
            records: vec![],
            max_distance: 0.0,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn label(&self) -> &'static str {
        match self.mode {
            Mode::Contact => "Live Contact Map",
            Mode::Distance => "Live Distance Map",
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn input(&self) -> &ThresholdInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut ThresholdInput {
        &mut self.input
    }

    /// Stores `threshold`, clamped, and mirrors it into the input control.
    pub fn set_state(&mut self, threshold: f64) {
        let threshold = clamp_threshold(threshold);
        self.threshold = Some(threshold);
        self.input.set_value(threshold);
    }

    pub fn distance_source(&self) -> DistanceSource {
        self.distance_source
    }

    pub fn set_distance_source(&mut self, source: DistanceSource) {
        self.distance_source = source;
    }

    pub fn buffer(&self) -> Option<&AggregateBuffer> {
        self.buffer.as_ref()
    }

    pub fn records(&self) -> &[ContactRecord] {
        &self.records
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn rgba(&self) -> &RgbaMatrix {
        &self.rgba
    }

    pub fn channel(&self) -> &ComputeRequestChannel {
        &self.channel
    }

    /// A new ensemble invalidates everything derived from the old one.
    pub fn on_ensemble_loaded(&mut self, source: &dyn EnsembleSource, target: RenderTarget<'_>) {
        self.buffer = None;
        self.rgba = RgbaMatrix::default();
        self.records.clear();
        self.max_distance = 0.0;

        if self.mode == Mode::Contact {
            let estimate = source
                .current_trace()
                .map(|trace| distance_threshold_estimate(&source.bounds(trace)))
                .unwrap_or(DEFAULT_DISTANCE_THRESHOLD);
            self.set_state(estimate);
        }

        target.surface.clear_to(target.palette.background);
    }

    /// Builds and dispatches a job. `None` when the ensemble, the locus or a
    /// genome mapping for it is missing; no job is sent then.
    pub fn begin(
        &mut self,
        ctx: &ComputeContext<'_>,
        threshold: Option<f64>,
    ) -> Result<Option<PendingCompute>, LiveMapError> {
        let source = ctx.source;
        let trace_length = source.live_map_trace_length();
        let (Some(locus), Some(current)) = (source.locus(), source.current_trace()) else {
            log::debug!("{}: no ensemble or locus, skipping", self.label());
            return Ok(None);
        };
        if trace_length == 0 {
            log::debug!("{}: empty ensemble, skipping", self.label());
            return Ok(None);
        }
        if let Err(e) = ctx.genome.ensure_supported(locus) {
            log::debug!("{}: {}", self.label(), e);
            return Ok(None);
        }

        let job = match self.mode {
            Mode::Contact => {
                let resolved = threshold
                    .map(clamp_threshold)
                    .or(self.threshold)
                    .unwrap_or_else(|| distance_threshold_estimate(&source.bounds(current)));
                self.set_state(resolved);
                Job::new(
                    Mode::Contact,
                    trace_length,
                    &source.live_map_vertex_lists(),
                    resolved,
                )?
            }
            Mode::Distance => {
                let lists = match self.distance_source {
                    DistanceSource::Ensemble => source.live_map_vertex_lists(),
                    DistanceSource::Trace => vec![current.vertex_list()],
                };
                Job::new(Mode::Distance, trace_length, &lists, 0.0)?
            }
        };

        log::info!(
            "{}: {} payload sent to worker",
            self.label(),
            match (self.mode, self.distance_source) {
                (Mode::Distance, DistanceSource::Trace) => "trace",
                _ => "ensemble",
            }
        );
        let job = self.channel.dispatch(job)?;

        Ok(Some(PendingCompute {
            job,
            trace_length,
            bin_size: locus.bin_size(trace_length),
        }))
    }

    /// Non-blocking check on a job started with [`begin`](Self::begin).
    pub fn poll(&self, pending: &PendingCompute) -> Option<Result<Resolution, LiveMapError>> {
        self.channel.try_resolve(&pending.job)
    }

    /// Blocks until a job started with [`begin`](Self::begin) comes back.
    pub fn resolve(&self, pending: &PendingCompute) -> Result<Resolution, LiveMapError> {
        self.channel.resolve(&pending.job)
    }

    /// Applies a resolved job: caches the aggregate, refreshes derived data and
    /// draws it.
    pub fn finish(
        &mut self,
        pending: PendingCompute,
        resolution: Result<Resolution, LiveMapError>,
        target: RenderTarget<'_>,
    ) -> RenderOutcome {
        let values = match resolution {
            Ok(Resolution::Fresh(values)) => values,
            Ok(Resolution::Stale) => return RenderOutcome::Superseded,
            Err(e) => {
                log::warn!("{}: {}", self.label(), e);
                return RenderOutcome::Failed(e);
            }
        };

        let trace_length = pending.trace_length;
        match self.mode {
            Mode::Contact => {
                self.records = extract_records(&values, trace_length);
                if let Some(dataset) = target.live_dataset.filter(|d| d.is_live_map()) {
                    dataset.update_records(&self.records, pending.bin_size);
                }
            }
            Mode::Distance => {
                self.max_distance = max_distance(&values);
            }
        }
        self.buffer = Some(AggregateBuffer {
            trace_length,
            values,
        });

        self.repaint(target)
    }

    /// Blocking convenience over `begin`, resolve and `finish`, with the busy
    /// indicator up while the worker runs.
    pub fn compute_and_render(
        &mut self,
        threshold: Option<f64>,
        ctx: &ComputeContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderOutcome {
        let pending = match self.begin(ctx, threshold) {
            Ok(Some(pending)) => pending,
            Ok(None) => return RenderOutcome::Skipped,
            Err(e) => {
                log::warn!("{}: {}", self.label(), e);
                return RenderOutcome::Failed(e);
            }
        };

        let resolution = {
            let _busy = BusyGuard::new(ctx.busy);
            self.resolve(&pending)
        };
        self.finish(pending, resolution, target)
    }

    fn color_scale(&self, palette: &Palette) -> Box<dyn ColorScale> {
        match self.mode {
            Mode::Contact => {
                let threshold = palette.contact_threshold.unwrap_or_else(|| {
                    self.buffer
                        .as_ref()
                        .map(|b| b.values.iter().copied().fold(0.0, f64::max))
                        .unwrap_or(0.0)
                });
                Box::new(ContactColorScale::new(threshold, palette.contact_color))
            }
            Mode::Distance => Box::new(DistanceColorScale::new(
                self.max_distance,
                palette.distance_color,
            )),
        }
    }

    /// Re-draws the cached aggregate, e.g. after a color change. No worker job.
    pub fn repaint(&mut self, target: RenderTarget<'_>) -> RenderOutcome {
        let Some(buffer) = &self.buffer else {
            return RenderOutcome::Skipped;
        };

        let scale = self.color_scale(target.palette);
        paint_into(
            &mut self.rgba,
            &buffer.values,
            buffer.trace_length,
            scale.as_ref(),
            target.palette.background,
        );

        match present(&self.rgba, target.surface) {
            Ok(()) => RenderOutcome::Presented,
            Err(e) => {
                log::warn!("{}: {}", self.label(), e);
                RenderOutcome::Failed(e)
            }
        }
    }
}
