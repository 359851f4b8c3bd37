use clap::*;
use livemap::libs::coordinator::Surface;
use livemap::libs::ensemble::EnsembleSource;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("contact")
        .about("Renders a live contact frequency map")
        .after_help(
            r###"
For every pair of bins, counts the traces whose two points lie within the
distance threshold, and paints the counts onto a PNG.

Notes:
* Without --threshold it is estimated from the current trace as floor(2 * radius / 4)
* Thresholds are integers clamped to [0, 10000]
* The color scale runs from transparent at 0 to --color at --scale-max,
  which defaults to the largest count
* A locus whose chromosome is missing from --genome renders nothing

Examples:
1. Contact map at a threshold of 300:
   livemap contact ensemble.tsv --threshold 300 -o contact.png

2. A 512x512 map in blue on a black background:
   livemap contact ensemble.tsv --width 512 --color 0,0,255 --background black

3. Override the locus of the file:
   livemap contact ensemble.tsv --locus chr19:48,000,000-48,500,000 -g hg38.chrom.sizes

"###,
        )
        .arg(
            Arg::new("scale_max")
                .long("scale-max")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Count shown at full color"),
        );

    super::render_args(super::threshold_arg(super::input_args(cmd)), "contact.png")
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    super::init_pool(args)?;
    let outfile = args.get_one::<String>("outfile").unwrap();

    let ensemble = super::load_ensemble(args)?;
    let chr = ensemble.locus().map(|l| l.chr.clone()).unwrap_or_default();
    let mut coordinator = super::build_coordinator(args, ensemble)?;

    let mut palette = super::palette(args, coordinator.palette());
    palette.contact_threshold = args.get_one::<f64>("scale_max").copied();
    coordinator.on_color_scale_change(palette);

    //----------------------------
    // Operating
    //----------------------------
    coordinator.select_surface(Surface::LiveContact);
    let outcome = super::render_contact(args, &mut coordinator)?;
    super::finish_render(&mut coordinator, outcome, &chr)?;

    //----------------------------
    // Output
    //----------------------------
    log::info!(
        "Threshold {}, {} records",
        coordinator.contact().input().text(),
        coordinator.contact().records().len()
    );
    coordinator.contact_surface().save(outfile)?;

    Ok(())
}
