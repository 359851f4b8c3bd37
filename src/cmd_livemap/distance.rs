use clap::*;
use livemap::libs::coordinator::Surface;
use livemap::libs::ensemble::EnsembleSource;
use livemap::libs::service::DistanceSource;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("distance")
        .about("Renders a live distance map")
        .after_help(
            r###"
Paints the mean Euclidean distance of every pair of bins, full color at 0 and
fading to the background at the largest distance.

Notes:
* Pairs without a single sample show the background
* --trace restricts the map to one trace of the ensemble

Examples:
1. Ensemble distance map:
   livemap distance ensemble.tsv -o distance.png

2. Distances within one trace, scaled to 400x400:
   livemap distance ensemble.tsv --trace t17 --width 400

"###,
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .num_args(1)
                .help("Name of the trace to map instead of the ensemble"),
        );

    super::render_args(super::input_args(cmd), "distance.png")
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    super::init_pool(args)?;
    let outfile = args.get_one::<String>("outfile").unwrap();

    let mut ensemble = super::load_ensemble(args)?;
    let source = match args.get_one::<String>("trace") {
        Some(name) => {
            if !ensemble.select_trace(name) {
                anyhow::bail!("No trace named [{}]", name);
            }
            DistanceSource::Trace
        }
        None => DistanceSource::Ensemble,
    };
    let chr = ensemble.locus().map(|l| l.chr.clone()).unwrap_or_default();
    let mut coordinator = super::build_coordinator(args, ensemble)?;

    let palette = super::palette(args, coordinator.palette());
    coordinator.on_color_scale_change(palette);

    //----------------------------
    // Operating
    //----------------------------
    coordinator.on_distance_source_change(source);
    let outcome = coordinator.select_surface(Surface::LiveDistance);
    let outcome = match source {
        DistanceSource::Trace => outcome,
        DistanceSource::Ensemble => coordinator.render(),
    };
    super::finish_render(&mut coordinator, outcome, &chr)?;

    //----------------------------
    // Output
    //----------------------------
    log::info!("Max distance {}", coordinator.distance().max_distance());
    coordinator.distance_surface().save(outfile)?;

    Ok(())
}
