extern crate clap;
use clap::*;

mod cmd_livemap;

fn main() -> anyhow::Result<()> {
    let app = Command::new("livemap")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`livemap` - Live contact and distance maps from 3D trace ensembles")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("More log output, -vv for debug"),
        )
        .subcommand(cmd_livemap::contact::make_subcommand())
        .subcommand(cmd_livemap::distance::make_subcommand())
        .subcommand(cmd_livemap::records::make_subcommand())
        .subcommand(cmd_livemap::info::make_subcommand())
        .after_help(
            r###"Subcommands:

* Maps, written as PNG:
    * contact  - Contact frequency map at a distance threshold
    * distance - Mean distance map over the ensemble or one trace

* Tables:
    * records  - Sparse contact records, bin1 <= bin2
    * info     - Locus, traces and the estimated threshold

Ensemble files are TSV: a `#locus chr:start-end` line, then
`trace bin x y z` rows. `nan`, `NA` and `.` mark missing points.

"###,
        );

    let matches = app.get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match matches.subcommand() {
        Some(("contact", sub_matches)) => cmd_livemap::contact::execute(sub_matches),
        Some(("distance", sub_matches)) => cmd_livemap::distance::execute(sub_matches),
        Some(("records", sub_matches)) => cmd_livemap::records::execute(sub_matches),
        Some(("info", sub_matches)) => cmd_livemap::info::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
