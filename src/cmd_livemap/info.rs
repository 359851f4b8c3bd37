use clap::*;
use livemap::libs::ensemble::{trace_bounds, EnsembleSource};
use livemap::libs::service::distance_threshold_estimate;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("info")
        .about("Summarizes an ensemble file")
        .after_help(
            r###"
Prints key/value pairs: the locus and its bin size, the number of traces and
bins, missing points, and the bounds of the current trace with the distance
threshold estimated from them.

Examples:
1. Summary of an ensemble:
   livemap info ensemble.tsv

2. Check whether the locus maps onto a genome:
   livemap info ensemble.tsv -g hg38.chrom.sizes

"###,
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );

    super::input_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = livemap::writer(args.get_one::<String>("outfile").unwrap())?;

    let ensemble = super::load_ensemble(args)?;
    let genome = super::load_genome(args, &ensemble)?;

    let locus = ensemble.locus().ok_or_else(|| anyhow::anyhow!("No locus"))?;
    let trace_length = ensemble.live_map_trace_length();
    let missing: usize = ensemble
        .traces()
        .iter()
        .map(|t| t.points.iter().filter(|p| p.is_none()).count())
        .sum();

    writer.write_fmt(format_args!("locus\t{}\n", locus))?;
    writer.write_fmt(format_args!("bin_size\t{}\n", locus.bin_size(trace_length)))?;
    writer.write_fmt(format_args!("traces\t{}\n", ensemble.traces().len()))?;
    writer.write_fmt(format_args!("trace_length\t{}\n", trace_length))?;
    writer.write_fmt(format_args!("missing\t{}\n", missing))?;
    writer.write_fmt(format_args!(
        "supported\t{}\n",
        genome.ensure_supported(locus).is_ok()
    ))?;

    if let Some(trace) = ensemble.current_trace() {
        let bounds = trace_bounds(trace);
        writer.write_fmt(format_args!("current\t{}\n", trace.name))?;
        writer.write_fmt(format_args!(
            "center\t{:.4},{:.4},{:.4}\n",
            bounds.center.x, bounds.center.y, bounds.center.z
        ))?;
        writer.write_fmt(format_args!("radius\t{:.4}\n", bounds.radius))?;
        writer.write_fmt(format_args!(
            "threshold\t{}\n",
            distance_threshold_estimate(&bounds)
        ))?;
    }
    writer.flush()?;

    Ok(())
}
