use assert_fs::prelude::*;
use snp_tally::{
    ScanConfig, ScanOutput, Scanner, classify::DEFAULT_LABEL, progress::SystemClock,
    scan::{FileState, NoopObserver, SkipReason},
};
use std::io::{Cursor, Write};
use zip::write::FileOptions;

fn create_nested_file(dir: &assert_fs::TempDir, content: &str, layers: &[&str], filename: &str) {
    let mut current_data = content.as_bytes().to_vec();
    let mut current_name = filename.to_string();

    for layer in layers {
        match *layer {
            "gz" => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&current_data).unwrap();
                current_data = encoder.finish().unwrap();
                current_name = format!("{current_name}.gz");
            }
            "zip" => {
                let mut buf = Vec::new();
                {
                    let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
                    zip.start_file::<&str, ()>(&current_name, FileOptions::default())
                        .unwrap();
                    zip.write_all(&current_data).unwrap();
                    zip.finish().unwrap();
                }
                current_data = buf;
                current_name = format!("{current_name}.zip");
            }
            _ => panic!("Unknown layer type"),
        }
    }

    dir.child(&current_name).write_binary(&current_data).unwrap();
}

fn scan(temp: &assert_fs::TempDir) -> ScanOutput {
    let config = ScanConfig {
        directory: temp.path().to_path_buf(),
        ..ScanConfig::default()
    };
    Scanner::new(&config, &SystemClock::start(), &mut NoopObserver)
        .run()
        .unwrap()
}

fn default_count(output: &ScanOutput, genotype: &str) -> u64 {
    output
        .results
        .get("RS1", 1, 100)
        .and_then(|r| r.group(DEFAULT_LABEL))
        .map_or(0, |g| g.count(genotype))
}

#[test]
fn test_gz_export() {
    let temp = assert_fs::TempDir::new().unwrap();
    create_nested_file(&temp, "rs1\t1\t100\tAA\n", &["gz"], "user1.23andme.txt");

    let output = scan(&temp);
    assert_eq!(default_count(&output, "AA"), 1);
    assert_eq!(output.summary.files[0].file_name, "user1.23andme.txt.gz");
}

#[test]
fn test_zip_export() {
    let temp = assert_fs::TempDir::new().unwrap();
    create_nested_file(
        &temp,
        "rsid,chromosome,position,allele1,allele2\nrs1 1 100 AG\n",
        &["zip"],
        "user2.illumina.txt",
    );

    let output = scan(&temp);
    assert_eq!(default_count(&output, "AG"), 1);
    assert_eq!(output.summary.files[0].parse_errors, 1);
}

#[test]
fn test_gz_inside_zip() {
    let temp = assert_fs::TempDir::new().unwrap();
    // user3.23andme.txt -> .gz -> .gz.zip
    create_nested_file(&temp, "# header\nrs1\t1\t100\tGG\n", &["gz", "zip"], "user3.23andme.txt");

    let output = scan(&temp);
    assert_eq!(default_count(&output, "GG"), 1);
    assert_eq!(output.summary.files[0].lines_read, 2);
}

#[test]
fn test_plain_and_compressed_count_together() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.23andme.txt").write_str("rs1\t1\t100\tAA\n").unwrap();
    create_nested_file(&temp, "rs1\t1\t100\tAA\n", &["gz"], "b.23andme.txt");
    create_nested_file(&temp, "rs1\t1\t100\tAA\n", &["zip"], "c.23andme.txt");

    let output = scan(&temp);
    assert_eq!(default_count(&output, "AA"), 3);
    assert_eq!(output.summary.census.files_selected, 3);
}

#[test]
fn test_truncated_gz_is_unreadable() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all("rs1\t1\t100\tAA\n".repeat(1000).as_bytes())
        .unwrap();
    let data = encoder.finish().unwrap();
    temp.child("broken.23andme.txt.gz")
        .write_binary(&data[..data.len() / 2])
        .unwrap();
    temp.child("fine.23andme.txt").write_str("rs1\t1\t100\tAG\n").unwrap();

    let output = scan(&temp);
    let broken = &output.summary.files[0];
    assert_eq!(broken.file_name, "broken.23andme.txt.gz");
    assert_eq!(broken.state, FileState::Unreadable);
    assert!(matches!(
        output.summary.skipped[0].reason,
        SkipReason::Unreadable { .. }
    ));
    assert_eq!(default_count(&output, "AG"), 1);
}
