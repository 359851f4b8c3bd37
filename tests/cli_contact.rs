use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn command_contact_help() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("live contact frequency map"));
    Ok(())
}

#[test]
fn command_contact_two_traces() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("--threshold")
        .arg("1")
        .arg("-o")
        .arg(&outfile);
    cmd.assert().success();

    // every pair counts both traces, so the whole map is at full color
    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.dimensions(), (4, 4));
    assert!(img.pixels().all(|p| p.0 == [255, 0, 0, 255]));

    Ok(())
}

#[test]
fn command_contact_scale_max() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-t")
        .arg("1")
        .arg("--scale-max")
        .arg("4")
        .arg("-o")
        .arg(&outfile);
    cmd.assert().success();

    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.get_pixel(2, 1).0, [255, 127, 127, 255]);

    Ok(())
}

#[test]
fn command_contact_resample() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-t")
        .arg("1")
        .arg("--width")
        .arg("9")
        .arg("--height")
        .arg("5")
        .arg("--color")
        .arg("#0000ff")
        .arg("-o")
        .arg(&outfile);
    cmd.assert().success();

    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.dimensions(), (9, 5));
    assert!(img.pixels().all(|p| p.0 == [0, 0, 255, 255]));

    Ok(())
}

#[test]
fn command_contact_clamp() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-t")
        .arg("50000")
        .arg("-v")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Threshold 10000, 10 records"));

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-t")
        .arg("-5")
        .arg("-v")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Threshold 0,"));

    Ok(())
}

#[test]
fn command_contact_bad_threshold() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-t")
        .arg("abc")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not an integer"));
    assert!(!outfile.exists());

    Ok(())
}

#[test]
fn command_contact_unmapped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/two_traces.tsv")
        .arg("-g")
        .arg("tests/livemap/chrom.sizes")
        .arg("--locus")
        .arg("chrUn:0-400")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(
            "Live maps are not available for chromosome chrUn",
        ));
    assert!(!outfile.exists());

    Ok(())
}

#[test]
fn command_contact_estimate() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let outfile = dir.path().join("contact.png");

    // radius 45 gives a threshold of 22, neighbours 10 apart are in contact
    let mut cmd = Command::cargo_bin("livemap")?;
    cmd.arg("contact")
        .arg("tests/livemap/line.tsv")
        .arg("-g")
        .arg("tests/livemap/chrom.sizes")
        .arg("-v")
        .arg("-o")
        .arg(&outfile);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Threshold 22,"));

    let img = image::open(&outfile)?.to_rgba8();
    assert_eq!(img.dimensions(), (10, 10));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(9, 0).0, [255, 255, 255, 255]);

    Ok(())
}
