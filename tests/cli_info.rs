use approx::assert_relative_eq;
use assert_cmd::Command;

fn value<'a>(stdout: &'a str, key: &str) -> Option<&'a str> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('\t'))
}

#[test]
fn command_info_line() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("livemap")?;
    let output = cmd
        .arg("info")
        .arg("tests/livemap/line.tsv")
        .arg("-g")
        .arg("tests/livemap/chrom.sizes")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(value(&stdout, "locus"), Some("chr2:10000-20000"));
    assert_eq!(value(&stdout, "traces"), Some("3"));
    assert_eq!(value(&stdout, "trace_length"), Some("10"));
    assert_eq!(value(&stdout, "missing"), Some("1"));
    assert_eq!(value(&stdout, "supported"), Some("true"));
    assert_eq!(value(&stdout, "current"), Some("t0"));
    assert_eq!(value(&stdout, "threshold"), Some("22"));

    let bin_size: f64 = value(&stdout, "bin_size").unwrap().parse()?;
    assert_relative_eq!(bin_size, 1000.0);
    let radius: f64 = value(&stdout, "radius").unwrap().parse()?;
    assert_relative_eq!(radius, 45.0);

    Ok(())
}

#[test]
fn command_info_unsupported() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("livemap")?;
    let output = cmd
        .arg("info")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-g")
        .arg("tests/livemap/chrom.sizes")
        .arg("--locus")
        .arg("chrUn:0-400")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(value(&stdout, "supported"), Some("false"));
    assert_eq!(value(&stdout, "threshold"), Some("0"));

    Ok(())
}
