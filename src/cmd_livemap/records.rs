use clap::*;
use livemap::libs::coordinator::Surface;
use livemap::libs::ensemble::EnsembleSource;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("records")
        .about("Writes the sparse contact records of a live contact map")
        .after_help(
            r###"
Output is a TSV with a header: bin1, bin2, counts and the genomic start of
both bins. Only pairs with bin1 <= bin2 and a non-zero count are written,
bin-major.

Notes:
* --threshold takes the same integers as in `livemap contact`, clamped to [0, 10000]

Examples:
1. Records at a threshold of 250:
   livemap records ensemble.tsv --threshold 250

2. Save to a file:
   livemap records ensemble.tsv -o records.tsv

"###,
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
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );

    super::threshold_arg(super::input_args(cmd))
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    super::init_pool(args)?;
    let mut writer = livemap::writer(args.get_one::<String>("outfile").unwrap())?;

    let ensemble = super::load_ensemble(args)?;
    let locus = ensemble
        .locus()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No locus"))?;
    let mut coordinator = super::build_coordinator(args, ensemble)?;

    //----------------------------
    // Operating
    //----------------------------
    coordinator.select_surface(Surface::LiveContact);
    let outcome = super::render_contact(args, &mut coordinator)?;
    super::finish_render(&mut coordinator, outcome, &locus.chr)?;

    let Some(live) = coordinator.live_pair() else {
        anyhow::bail!("No live map dataset for {}", locus);
    };
    let bin_size = live.dataset.bin_size();

    //----------------------------
    // Output
    //----------------------------
    writer.write_fmt(format_args!("bin1\tbin2\tcounts\tstart1\tstart2\n"))?;
    for record in live.dataset.records() {
        let start = |bin: usize| locus.genomic_start + (bin as f64 * bin_size).floor() as u64;
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\t{}\n",
            record.bin1,
            record.bin2,
            record.counts,
            start(record.bin1),
            start(record.bin2),
        ))?;
    }
    writer.flush()?;

    Ok(())
}
