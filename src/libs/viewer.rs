//! The contact-map viewer seam: datasets, their view states, and which pair is
//! active.
//!
//! The viewer hands out shared handles. Keeping a clone of an [`ActivePair`]
//! keeps the very same dataset and state objects, so zoom and pan survive a
//! switch to another dataset and back.

use crate::libs::error::LiveMapError;
use crate::libs::locus::{Genome, Locus};
use crate::libs::record::{record_key, ContactRecord};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Hic,
    LiveMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeEntry {
    pub name: String,
    pub size: u64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub name: String,
    pub genome_id: String,
    pub chromosomes: Vec<ChromosomeEntry>,
    pub bp_resolutions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// 0 is the whole genome, 1 the first chromosome, and so on
    pub chr1: usize,
    pub chr2: usize,
    pub zoom: usize,
    pub x: f64,
    pub y: f64,
    pub pixel_size: f64,
    pub normalization: String,
}

#[derive(Debug)]
pub struct Dataset {
    pub config: DatasetConfig,
    records: RefCell<IndexMap<String, ContactRecord>>,
    bin_size: Cell<f64>,
}

impl Dataset {
    pub fn new(config: DatasetConfig) -> Self {
        let bin_size = config.bp_resolutions.first().copied().unwrap_or(0.0);
        Self {
            config,
            records: RefCell::new(IndexMap::new()),
            bin_size: Cell::new(bin_size),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.config.kind
    }

    pub fn is_live_map(&self) -> bool {
        self.config.kind == DatasetKind::LiveMap
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size.get()
    }

    /// Swaps in a fresh record set; later duplicates of a bin pair win.
    pub fn update_records(&self, records: &[ContactRecord], bin_size: f64) {
        let mut store = self.records.borrow_mut();
        store.clear();
        for record in records {
            store.insert(record_key(record.bin1, record.bin2), *record);
        }
        self.bin_size.set(bin_size);
    }

    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn record(&self, bin1: usize, bin2: usize) -> Option<ContactRecord> {
        self.records.borrow().get(&record_key(bin1, bin2)).copied()
    }

    /// Records in insertion order
    pub fn records(&self) -> Vec<ContactRecord> {
        self.records.borrow().values().copied().collect()
    }
}

/// A dataset and the view state it is shown with.
#[derive(Debug, Clone)]
pub struct ActivePair {
    pub dataset: Rc<Dataset>,
    pub state: Rc<RefCell<ViewState>>,
}

impl ActivePair {
    pub fn same_as(&self, other: &ActivePair) -> bool {
        Rc::ptr_eq(&self.dataset, &other.dataset) && Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn is_live_map(&self) -> bool {
        self.dataset.is_live_map()
    }
}

pub trait MapViewer {
    /// Loads a dataset and makes it active.
    fn load_dataset(&mut self, config: DatasetConfig, state: ViewState)
        -> anyhow::Result<ActivePair>;

    fn set_active_dataset(&mut self, pair: &ActivePair);

    fn active(&self) -> Option<ActivePair>;

    /// Moves the active view onto `locus`.
    fn goto_locus(&mut self, locus: &Locus, trace_length: usize) -> anyhow::Result<()>;
}

/// In-process viewer
#[derive(Debug, Default)]
pub struct Browser {
    active: Option<ActivePair>,
    loads: usize,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl MapViewer for Browser {
    fn load_dataset(
        &mut self,
        config: DatasetConfig,
        state: ViewState,
    ) -> anyhow::Result<ActivePair> {
        if config.chromosomes.is_empty() {
            anyhow::bail!("Dataset {} lists no chromosomes", config.name);
        }
        if config.bp_resolutions.is_empty() {
            anyhow::bail!("Dataset {} has no resolutions", config.name);
        }

        let pair = ActivePair {
            dataset: Rc::new(Dataset::new(config)),
            state: Rc::new(RefCell::new(state)),
        };
        self.active = Some(pair.clone());
        self.loads += 1;
        Ok(pair)
    }

    fn set_active_dataset(&mut self, pair: &ActivePair) {
        self.active = Some(pair.clone());
    }

    fn active(&self) -> Option<ActivePair> {
        self.active.clone()
    }

    fn goto_locus(&mut self, locus: &Locus, trace_length: usize) -> anyhow::Result<()> {
        let Some(pair) = &self.active else {
            anyhow::bail!("No active dataset to navigate");
        };
        let chr_index = pair
            .dataset
            .config
            .chromosomes
            .iter()
            .find(|c| c.name == locus.chr)
            .map(|c| c.index + 1)
            .ok_or_else(|| anyhow::anyhow!("Chromosome {} is not in the dataset", locus.chr))?;

        let bin_size = if pair.is_live_map() {
            locus.bin_size(trace_length)
        } else {
            pair.dataset.bin_size()
        };

        let start = locus.start_bin(bin_size) as f64;
        let mut state = pair.state.borrow_mut();
        state.chr1 = chr_index;
        state.chr2 = chr_index;
        state.x = start;
        state.y = start;
        Ok(())
    }
}

/// Chromosome table for a viewer dataset; an `All` entry goes first.
pub fn chromosome_entries(genome: &Genome) -> Vec<ChromosomeEntry> {
    let mut chromosomes: Vec<ChromosomeEntry> = genome
        .chromosomes()
        .iter()
        .map(|c| ChromosomeEntry {
            name: c.name.clone(),
            size: c.size,
            index: 0,
        })
        .collect();

    if let Some(pos) = chromosomes
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case("all"))
    {
        let all = chromosomes.remove(pos);
        chromosomes.insert(0, all);
    }
    for (idx, c) in chromosomes.iter_mut().enumerate() {
        c.index = idx;
    }

    chromosomes
}

/// Dataset configuration and initial state for a live map over `locus`.
pub fn live_map_dataset(
    genome: &Genome,
    locus: &Locus,
    trace_length: usize,
) -> Result<(DatasetConfig, ViewState), LiveMapError> {
    let chromosome = genome.ensure_supported(locus)?;
    let bin_size = locus.bin_size(trace_length);

    let chromosomes = chromosome_entries(genome);
    let chr_index = chromosomes
        .iter()
        .find(|c| c.name == chromosome.name)
        .map(|c| c.index + 1)
        .ok_or_else(|| LiveMapError::UnsupportedLocus(locus.chr.clone()))?;

    let config = DatasetConfig {
        kind: DatasetKind::LiveMap,
        name: "Live Map".to_string(),
        genome_id: genome.id.clone(),
        chromosomes,
        bp_resolutions: vec![bin_size],
    };

    let start_bin = locus.start_bin(bin_size) as f64;
    let state = ViewState {
        chr1: chr_index,
        chr2: chr_index,
        zoom: 0,
        x: start_bin,
        y: start_bin,
        pixel_size: 1.0,
        normalization: "NONE".to_string(),
    };

    Ok((config, state))
}
