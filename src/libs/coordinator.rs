//! Which map is on screen, and keeping the viewer's active dataset in step.
//!
//! The coordinator owns both compute services, their display surfaces and two
//! remembered dataset/state slots. Switching to a live surface activates the
//! live-map pair; switching back restores the Hi-C pair that was active before,
//! the same objects, so its zoom and pan are kept.
//!
//! Renders never block. A render dispatches a job and returns
//! [`RenderOutcome::Pending`]; [`pump`](LiveMapCoordinator::pump) picks up
//! finished jobs from the event loop and [`wait`](LiveMapCoordinator::wait)
//! blocks until all of them are back.

use crate::libs::canvas::DisplaySurface;
use crate::libs::channel::{BusyIndicator, LogBusy};
use crate::libs::color::Palette;
use crate::libs::ensemble::{Ensemble, EnsembleSource};
use crate::libs::error::LiveMapError;
use crate::libs::locus::Genome;
use crate::libs::service::{
    ComputeContext, DistanceSource, MapComputeService, PendingCompute, RenderOutcome,
    RenderTarget,
};
use crate::libs::viewer::{
    live_map_dataset, ActivePair, Dataset, DatasetConfig, MapViewer, ViewState,
};
use crate::libs::worker::Mode;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    HiC,
    #[default]
    LiveContact,
    LiveDistance,
}

/// User-facing failure reporting.
pub trait Notifier {
    /// Background failures
    fn warn(&self, msg: &str);

    /// Failures of an action the user started
    fn alert(&self, msg: &str);
}

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn alert(&self, msg: &str) {
        log::warn!("{}", msg);
        eprintln!("{}", msg);
    }
}

/// Outcomes of the jobs one `pump` or `wait` completed, in dispatch order.
#[derive(Debug, Default, PartialEq)]
pub struct Settled {
    pub contact: Vec<RenderOutcome>,
    pub distance: Vec<RenderOutcome>,
}

impl Settled {
    pub fn is_empty(&self) -> bool {
        self.contact.is_empty() && self.distance.is_empty()
    }
}

pub struct LiveMapCoordinator<V: MapViewer> {
    viewer: V,
    genome: Genome,
    source: Rc<dyn EnsembleSource>,
    palette: Palette,
    contact: MapComputeService,
    distance: MapComputeService,
    contact_surface: DisplaySurface,
    distance_surface: DisplaySurface,
    contact_jobs: Vec<PendingCompute>,
    distance_jobs: Vec<PendingCompute>,
    hic_pair: Option<ActivePair>,
    live_pair: Option<ActivePair>,
    surface: Surface,
    notifier: Box<dyn Notifier>,
    busy: Box<dyn BusyIndicator>,
}

impl<V: MapViewer> LiveMapCoordinator<V> {
    /// Both surfaces start at `width x height`.
    pub fn new(viewer: V, genome: Genome, width: u32, height: u32) -> anyhow::Result<Self> {
        Ok(Self {
            viewer,
            genome,
            source: Rc::new(Ensemble::default()),
            palette: Palette::default(),
            contact: MapComputeService::contact(None)?,
            distance: MapComputeService::distance()?,
            contact_surface: DisplaySurface::new(width, height),
            distance_surface: DisplaySurface::new(width, height),
            contact_jobs: vec![],
            distance_jobs: vec![],
            hic_pair: None,
            live_pair: None,
            surface: Surface::default(),
            notifier: Box::new(ConsoleNotifier),
            busy: Box::new(LogBusy),
        })
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_busy(mut self, busy: Box<dyn BusyIndicator>) -> Self {
        self.busy = busy;
        self
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn source(&self) -> &dyn EnsembleSource {
        self.source.as_ref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn contact(&self) -> &MapComputeService {
        &self.contact
    }

    pub fn distance(&self) -> &MapComputeService {
        &self.distance
    }

    pub fn contact_surface(&self) -> &DisplaySurface {
        &self.contact_surface
    }

    pub fn distance_surface(&self) -> &DisplaySurface {
        &self.distance_surface
    }

    pub fn hic_pair(&self) -> Option<&ActivePair> {
        self.hic_pair.as_ref()
    }

    pub fn live_pair(&self) -> Option<&ActivePair> {
        self.live_pair.as_ref()
    }

    /// Whether any job is still out with a worker
    pub fn is_computing(&self) -> bool {
        !self.contact_jobs.is_empty() || !self.distance_jobs.is_empty()
    }

    /// Resizes both live surfaces. A zero dimension is refused and the old
    /// size kept.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.notifier.warn(&format!(
                "Viewport dimensions are invalid: {}x{}. Surface sizes not updated.",
                width, height
            ));
            return;
        }
        self.contact_surface.set_size(width, height);
        self.distance_surface.set_size(width, height);
    }

    fn remember_hic(&mut self) {
        if let Some(active) = self.viewer.active().filter(|p| !p.is_live_map()) {
            self.hic_pair = Some(active);
        }
    }

    fn load_live_dataset(&mut self) -> Option<ActivePair> {
        let locus = self.source.locus()?.clone();
        let trace_length = self.source.live_map_trace_length();
        if trace_length == 0 {
            return None;
        }

        let (config, state) = match live_map_dataset(&self.genome, &locus, trace_length) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };

        self.remember_hic();
        match self.viewer.load_dataset(config, state) {
            Ok(pair) => {
                log::debug!("Loaded live map dataset for {}", locus);
                self.live_pair = Some(pair.clone());
                Some(pair)
            }
            Err(e) => {
                self.notifier.warn(&format!("Error loading live map dataset: {}", e));
                None
            }
        }
    }

    /// Forgets the live pair. A viewer still showing a live map gets the Hi-C
    /// pair back when there is one.
    fn drop_live_pair(&mut self) {
        self.live_pair = None;
        if self.viewer.active().is_some_and(|p| p.is_live_map()) {
            if let Some(hic) = self.hic_pair.clone() {
                self.viewer.set_active_dataset(&hic);
            }
        }
    }

    /// Makes the live-map pair the active one, loading it on first use.
    /// `None` when the current locus has no genome mapping.
    ///
    /// Only the pair this coordinator loaded for the current locus is ever
    /// activated; any other live dataset left in the viewer is ignored.
    pub fn ensure_live_dataset(&mut self) -> Option<ActivePair> {
        let Some(live) = self.live_pair.clone() else {
            return self.load_live_dataset();
        };

        if !self.viewer.active().is_some_and(|p| p.same_as(&live)) {
            self.remember_hic();
            self.viewer.set_active_dataset(&live);
        }
        Some(live)
    }

    /// Tab selection.
    pub fn select_surface(&mut self, surface: Surface) -> RenderOutcome {
        log::debug!("Surface {:?} -> {:?}", self.surface, surface);
        self.surface = surface;

        match surface {
            Surface::HiC => {
                if let Some(hic) = self.hic_pair.clone() {
                    self.viewer.set_active_dataset(&hic);
                }
                RenderOutcome::Skipped
            }
            Surface::LiveContact => {
                self.ensure_live_dataset();
                RenderOutcome::Skipped
            }
            Surface::LiveDistance => {
                self.ensure_live_dataset();
                if self.distance.distance_source() == DistanceSource::Trace {
                    self.render_distance()
                } else {
                    RenderOutcome::Skipped
                }
            }
        }
    }

    fn goto_current_locus(&mut self) {
        let Some(locus) = self.source.locus() else {
            return;
        };
        let trace_length = self.source.live_map_trace_length();
        if let Err(e) = self.viewer.goto_locus(locus, trace_length) {
            self.notifier.warn(&e.to_string());
        }
    }

    fn track(
        &mut self,
        mode: Mode,
        begun: Result<Option<PendingCompute>, LiveMapError>,
    ) -> RenderOutcome {
        let pending = match begun {
            Ok(Some(pending)) => pending,
            Ok(None) => return RenderOutcome::Skipped,
            Err(e) => {
                self.notifier.warn(&e.to_string());
                return RenderOutcome::Failed(e);
            }
        };

        if !self.is_computing() {
            self.busy.show();
        }
        match mode {
            Mode::Contact => self.contact_jobs.push(pending),
            Mode::Distance => self.distance_jobs.push(pending),
        }
        RenderOutcome::Pending
    }

    /// Dispatches the contact map, `threshold` overriding the stored one.
    ///
    /// The live-map pair is activated unless the Hi-C surface is showing; the
    /// records still reach the remembered live dataset then.
    pub fn render_contact(&mut self, threshold: Option<f64>) -> RenderOutcome {
        if self.surface != Surface::HiC && self.ensure_live_dataset().is_some() {
            self.goto_current_locus();
        }

        let ctx = ComputeContext {
            source: self.source.as_ref(),
            genome: &self.genome,
            busy: self.busy.as_ref(),
        };
        let begun = self.contact.begin(&ctx, threshold);
        self.track(Mode::Contact, begun)
    }

    pub fn render_distance(&mut self) -> RenderOutcome {
        let ctx = ComputeContext {
            source: self.source.as_ref(),
            genome: &self.genome,
            busy: self.busy.as_ref(),
        };
        let begun = self.distance.begin(&ctx, None);
        self.track(Mode::Distance, begun)
    }

    /// Recomputes whichever live surface is showing.
    pub fn render(&mut self) -> RenderOutcome {
        match self.surface {
            Surface::HiC => RenderOutcome::Skipped,
            Surface::LiveContact => self.render_contact(None),
            Surface::LiveDistance => self.render_distance(),
        }
    }

    /// Finishes the jobs that are back, without waiting for the rest.
    pub fn pump(&mut self) -> Settled {
        self.settle(false)
    }

    /// Blocks until every dispatched job is back.
    pub fn wait(&mut self) -> Settled {
        self.settle(true)
    }

    fn settle(&mut self, block: bool) -> Settled {
        if !self.is_computing() {
            return Settled::default();
        }

        let live_dataset = self.live_pair.as_ref().map(|p| p.dataset.as_ref());
        let settled = Settled {
            contact: settle_jobs(
                &mut self.contact,
                &mut self.contact_jobs,
                &mut self.contact_surface,
                &self.palette,
                live_dataset,
                block,
            ),
            distance: settle_jobs(
                &mut self.distance,
                &mut self.distance_jobs,
                &mut self.distance_surface,
                &self.palette,
                None,
                block,
            ),
        };

        for outcome in settled.contact.iter().chain(&settled.distance) {
            if let RenderOutcome::Failed(e) = outcome {
                self.notifier.warn(&e.to_string());
            }
        }
        if !self.is_computing() {
            self.busy.hide();
        }

        settled
    }

    /// Jobs still out belong to the previous ensemble; their replies are dropped.
    fn abandon_jobs(&mut self) {
        if self.is_computing() {
            log::debug!(
                "Abandoning {} pending jobs",
                self.contact_jobs.len() + self.distance_jobs.len()
            );
            self.contact_jobs.clear();
            self.distance_jobs.clear();
            self.busy.hide();
        }
    }

    /// The ensemble now covers a new locus.
    pub fn on_locus_change(&mut self, source: Rc<dyn EnsembleSource>) -> RenderOutcome {
        let moved = self.source.locus() != source.locus();
        self.source = source;
        if moved {
            self.drop_live_pair();
        }

        match self.surface {
            Surface::HiC => {
                self.goto_current_locus();
                RenderOutcome::Skipped
            }
            Surface::LiveContact => self.render_contact(None),
            Surface::LiveDistance => {
                self.ensure_live_dataset();
                self.render_distance()
            }
        }
    }

    /// Threshold control edits. Text that does not parse changes nothing.
    /// While the Hi-C surface shows, the value is only stored.
    pub fn on_threshold_input(&mut self, text: &str) -> RenderOutcome {
        let input = self.contact.input_mut();
        input.set_text(text);
        match input.commit() {
            Some(threshold) if self.surface == Surface::HiC => {
                self.contact.set_state(threshold);
                RenderOutcome::Skipped
            }
            Some(threshold) => self.render_contact(Some(threshold)),
            None => RenderOutcome::Skipped,
        }
    }

    pub fn on_distance_source_change(&mut self, source: DistanceSource) -> RenderOutcome {
        self.distance.set_distance_source(source);
        if self.surface == Surface::LiveDistance {
            self.render_distance()
        } else {
            RenderOutcome::Skipped
        }
    }

    /// Repaints both cached maps with `palette`; nothing is recomputed.
    pub fn on_color_scale_change(&mut self, palette: Palette) -> (RenderOutcome, RenderOutcome) {
        self.palette = palette;

        let contact = self.contact.repaint(RenderTarget {
            surface: &mut self.contact_surface,
            palette: &self.palette,
            live_dataset: None,
        });
        let distance = self.distance.repaint(RenderTarget {
            surface: &mut self.distance_surface,
            palette: &self.palette,
            live_dataset: None,
        });

        (contact, distance)
    }

    /// A new ensemble: both services reset, a fresh live dataset is loaded and
    /// the contact surface comes to the front.
    pub fn on_ensemble_loaded(&mut self, source: Rc<dyn EnsembleSource>) {
        self.abandon_jobs();
        self.source = source;

        self.contact.on_ensemble_loaded(
            self.source.as_ref(),
            RenderTarget {
                surface: &mut self.contact_surface,
                palette: &self.palette,
                live_dataset: None,
            },
        );
        self.distance.on_ensemble_loaded(
            self.source.as_ref(),
            RenderTarget {
                surface: &mut self.distance_surface,
                palette: &self.palette,
                live_dataset: None,
            },
        );

        self.drop_live_pair();
        self.load_live_dataset();
        self.surface = Surface::LiveContact;
    }

    /// User-initiated; a failure alerts. On success the Hi-C surface shows the
    /// current locus.
    pub fn load_hic_dataset(&mut self, config: DatasetConfig, state: ViewState) -> bool {
        let name = config.name.clone();
        match self.viewer.load_dataset(config, state) {
            Ok(pair) => {
                self.hic_pair = Some(pair);
                self.surface = Surface::HiC;
                self.goto_current_locus();
                true
            }
            Err(e) => {
                self.notifier.alert(&format!("Error loading {}: {}", name, e));
                false
            }
        }
    }

    pub fn handle(&mut self, event: &Event) {
        let outcome = match event {
            Event::SurfaceSelected(surface) => self.select_surface(*surface),
            Event::LocusChanged(source) => self.on_locus_change(source.clone()),
            Event::EnsembleLoaded(source) => {
                self.on_ensemble_loaded(source.clone());
                RenderOutcome::Skipped
            }
            Event::ThresholdEntered(text) => self.on_threshold_input(text),
            Event::DistanceSourceChanged(source) => self.on_distance_source_change(*source),
            Event::ColorChanged(palette) => {
                self.on_color_scale_change(*palette);
                RenderOutcome::Skipped
            }
            Event::Calculate => self.render(),
            Event::Idle => {
                let settled = self.pump();
                if !settled.is_empty() {
                    log::debug!("{}: {:?}", event.name(), settled);
                }
                return;
            }
        };
        log::debug!("{}: {:?}", event.name(), outcome);
    }
}

/// Finishes the jobs in `jobs` that are back, or all of them when `block` is
/// set. A blocking pass resolves the newest job first, so older ones come back
/// stale after it.
fn settle_jobs(
    service: &mut MapComputeService,
    jobs: &mut Vec<PendingCompute>,
    surface: &mut DisplaySurface,
    palette: &Palette,
    live_dataset: Option<&Dataset>,
    block: bool,
) -> Vec<RenderOutcome> {
    let mut outcomes = vec![];
    let mut running = vec![];

    for pending in jobs.drain(..).rev() {
        let resolution = if block {
            Some(service.resolve(&pending))
        } else {
            service.poll(&pending)
        };
        match resolution {
            Some(resolution) => {
                let target = RenderTarget {
                    surface: &mut *surface,
                    palette,
                    live_dataset,
                };
                outcomes.push(service.finish(pending, resolution, target));
            }
            None => running.push(pending),
        }
    }

    outcomes.reverse();
    running.reverse();
    *jobs = running;
    outcomes
}

#[derive(Clone)]
pub enum Event {
    SurfaceSelected(Surface),
    LocusChanged(Rc<dyn EnsembleSource>),
    EnsembleLoaded(Rc<dyn EnsembleSource>),
    ThresholdEntered(String),
    DistanceSourceChanged(DistanceSource),
    ColorChanged(Palette),
    /// The explicit "calculate" button
    Calculate,
    /// A turn of the event loop with nothing else to do
    Idle,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SurfaceSelected(_) => "SurfaceSelected",
            Event::LocusChanged(_) => "LocusChanged",
            Event::EnsembleLoaded(_) => "EnsembleLoaded",
            Event::ThresholdEntered(_) => "ThresholdEntered",
            Event::DistanceSourceChanged(_) => "DistanceSourceChanged",
            Event::ColorChanged(_) => "ColorChanged",
            Event::Calculate => "Calculate",
            Event::Idle => "Idle",
        }
    }
}

type Handler = Box<dyn Fn(&Event)>;

#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Handler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl Fn(&Event) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Hands `coordinator` to a handler that forwards every event to it.
    pub fn attach<V: MapViewer + 'static>(&mut self, coordinator: Rc<RefCell<LiveMapCoordinator<V>>>) {
        self.subscribe(move |event| coordinator.borrow_mut().handle(event));
    }

    pub fn post(&self, event: Event) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}
