//! Subcommand modules for the `livemap` binary.

pub mod contact;
pub mod distance;
pub mod info;
pub mod records;

use clap::*;
use livemap::libs::color::{Palette, Rgb};
use livemap::libs::coordinator::LiveMapCoordinator;
use livemap::libs::ensemble::{Ensemble, EnsembleSource};
use livemap::libs::locus::{Genome, Locus};
use livemap::libs::service::RenderOutcome;
use livemap::libs::viewer::Browser;
use std::rc::Rc;

/// Input ensemble, genome and locus
pub fn input_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("infile")
            .required(true)
            .num_args(1)
            .index(1)
            .help("Ensemble TSV file. [stdin] for standard input"),
    )
    .arg(
        Arg::new("genome")
            .long("genome")
            .short('g')
            .num_args(1)
            .help("chrom.sizes of the genome. Without it only the locus chromosome is known"),
    )
    .arg(
        Arg::new("locus")
            .long("locus")
            .short('l')
            .num_args(1)
            .value_parser(value_parser!(Locus))
            .help("Genomic window, chr:start-end. Overrides the #locus line"),
    )
}

/// The distance threshold as typed in the control
pub fn threshold_arg(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("threshold")
            .long("threshold")
            .short('t')
            .num_args(1)
            .allow_negative_numbers(true)
            .help("Distance threshold for a contact, an integer"),
    )
}

/// Surface size, colors and threads
pub fn render_args(cmd: Command, outfile: &'static str) -> Command {
    cmd.arg(
        Arg::new("width")
            .long("width")
            .num_args(1)
            .value_parser(value_parser!(u32))
            .help("Surface width in pixels. Default is the trace length"),
    )
    .arg(
        Arg::new("height")
            .long("height")
            .num_args(1)
            .value_parser(value_parser!(u32))
            .help("Surface height in pixels. Default is the width"),
    )
    .arg(
        Arg::new("color")
            .long("color")
            .num_args(1)
            .value_parser(value_parser!(Rgb))
            .default_value("255,0,0")
            .help("Map color, r,g,b or #rrggbb"),
    )
    .arg(
        Arg::new("background")
            .long("background")
            .num_args(1)
            .value_parser(value_parser!(Rgb))
            .default_value("snow")
            .help("Background color"),
    )
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .short('p')
            .value_parser(value_parser!(usize))
            .num_args(1)
            .default_value("1")
            .help("Number of threads for the aggregation"),
    )
    .arg(
        Arg::new("outfile")
            .long("outfile")
            .short('o')
            .num_args(1)
            .default_value(outfile)
            .help("Output PNG filename"),
    )
}

pub fn init_pool(args: &ArgMatches) -> anyhow::Result<()> {
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;
    Ok(())
}

pub fn load_ensemble(args: &ArgMatches) -> anyhow::Result<Ensemble> {
    let infile = args.get_one::<String>("infile").unwrap();
    let mut ensemble = Ensemble::from_reader(livemap::reader(infile)?)?;

    if let Some(locus) = args.get_one::<Locus>("locus") {
        ensemble.set_locus(locus.clone());
    }
    if ensemble.locus().is_none() {
        anyhow::bail!("{} has no #locus line, pass --locus", infile);
    }
    if ensemble.live_map_trace_length() == 0 {
        anyhow::bail!("{} holds no traces", infile);
    }
    log::info!(
        "Loaded {} traces of {} bins",
        ensemble.traces().len(),
        ensemble.live_map_trace_length()
    );

    Ok(ensemble)
}

pub fn load_genome(args: &ArgMatches, ensemble: &Ensemble) -> anyhow::Result<Genome> {
    match args.get_one::<String>("genome") {
        Some(file) => {
            let id = std::path::Path::new(file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("genome");
            Genome::from_sizes(id, livemap::reader(file)?)
        }
        None => Ok(ensemble
            .locus()
            .map(Genome::for_locus)
            .unwrap_or_default()),
    }
}

/// A coordinator with `ensemble` loaded. The surfaces default to one pixel
/// per bin.
pub fn build_coordinator(
    args: &ArgMatches,
    ensemble: Ensemble,
) -> anyhow::Result<LiveMapCoordinator<Browser>> {
    let genome = load_genome(args, &ensemble)?;
    let side = ensemble.live_map_trace_length() as u32;

    let (width, height) = match (
        args.try_get_one::<u32>("width").ok().flatten(),
        args.try_get_one::<u32>("height").ok().flatten(),
    ) {
        (Some(w), Some(h)) => (*w, *h),
        (Some(w), None) => (*w, *w),
        (None, Some(h)) => (side, *h),
        (None, None) => (side, side),
    };

    let mut coordinator = LiveMapCoordinator::new(Browser::new(), genome, width, height)?;
    let source: Rc<dyn EnsembleSource> = Rc::new(ensemble);
    coordinator.on_ensemble_loaded(source);

    Ok(coordinator)
}

/// Palette from `--color` and `--background`, leaving `base` otherwise alone
pub fn palette(args: &ArgMatches, base: &Palette) -> Palette {
    let color = *args.get_one::<Rgb>("color").unwrap();
    Palette {
        contact_color: color,
        distance_color: color,
        background: *args.get_one::<Rgb>("background").unwrap(),
        ..*base
    }
}

/// Renders the contact map, through the threshold control when `--threshold`
/// is given. Text that is not an integer is an error here.
pub fn render_contact(
    args: &ArgMatches,
    coordinator: &mut LiveMapCoordinator<Browser>,
) -> anyhow::Result<RenderOutcome> {
    let outcome = match args.get_one::<String>("threshold") {
        Some(text) => {
            if text.trim().parse::<i64>().is_err() {
                anyhow::bail!("Distance threshold [{}] is not an integer", text);
            }
            coordinator.on_threshold_input(text)
        }
        None => coordinator.render_contact(None),
    };
    Ok(outcome)
}

/// Waits out a dispatched render, then checks how it ended.
pub fn finish_render(
    coordinator: &mut LiveMapCoordinator<Browser>,
    outcome: RenderOutcome,
    chr: &str,
) -> anyhow::Result<()> {
    let outcome = match outcome {
        RenderOutcome::Pending => {
            let settled = coordinator.wait();
            settled
                .contact
                .into_iter()
                .chain(settled.distance)
                .last()
                .unwrap_or(RenderOutcome::Skipped)
        }
        other => other,
    };
    check_outcome(outcome, chr)
}

pub fn check_outcome(outcome: RenderOutcome, locus: &str) -> anyhow::Result<()> {
    match outcome {
        RenderOutcome::Presented => Ok(()),
        RenderOutcome::Skipped => {
            anyhow::bail!("Live maps are not available for chromosome {}", locus)
        }
        RenderOutcome::Pending => anyhow::bail!("Map computation did not finish"),
        RenderOutcome::Superseded => anyhow::bail!("Map computation was superseded"),
        RenderOutcome::Failed(e) => Err(e.into()),
    }
}
