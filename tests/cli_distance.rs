use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn command_distance_two_traces() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("distance.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("distance")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-o")
        .arg(&outfile);
    cmd.assert().success();

    // all distances are 0
    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.dimensions(), (4, 4));
    assert!(img.pixels().all(|p| p.0 == [255, 0, 0, 255]));

    Ok(())
}

#[test]
fn command_distance_ensemble() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("distance.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("distance")
        .arg("tests/livemap/line.tsv")
        .arg("--background")
        .arg("black")
        .arg("-v")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Max distance 90"));

    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.get_pixel(4, 4).0, [255, 0, 0, 255]);
    // the farthest pair fades out completely
    assert_eq!(img.get_pixel(0, 9).0, [0, 0, 0, 255]);
    // a missing point still leaves samples from the other traces
    assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0, 255]);

    Ok(())
}

#[test]
fn command_distance_trace() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("distance.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("distance")
        .arg("tests/livemap/line.tsv")
        .arg("--trace")
        .arg("t1")
        .arg("--width")
        .arg("20")
        .arg("-o")
        .arg(&outfile);
    cmd.assert().success();

    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.dimensions(), (20, 20));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    // bin 3 of t1 has no point, so its row shows the background
    assert_eq!(img.get_pixel(7, 0).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(0, 6).0, [255, 255, 255, 255]);

    Ok(())
}

#[test]
fn command_distance_unknown_trace() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("distance")
        .arg("tests/livemap/line.tsv")
        .arg("--trace")
        .arg("t9");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No trace named [t9]"));

    Ok(())
}
