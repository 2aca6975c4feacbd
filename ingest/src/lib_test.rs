use crate::{parse_jobs, parse_jobs_cmdargs_from, IngestError, JobsArgs};
use std::{fs, path::Path, path::PathBuf};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn weak_run(root: &Path) {
    write(
        root,
        "1/red2band_dlaf_na.out",
        "[0] 1.10s 90.0GFlop/s d (10240, 10240) (512, 512) 128 (1, 2) 18 mc\n\
         [1] 1.00s 99.0GFlop/s d (10240, 10240) (512, 512) 128 (1, 2) 18 mc\n",
    );
    write(
        root,
        "4/red2band_dlaf_na.out",
        "pika: starting\n\
         [0] 2.20s 180.0GFlop/s d (20480, 20480) (512, 512) 128 (2, 4) 18 mc\n",
    );
    write(
        root,
        "4/chol_dlaf_na.out",
        "[0] 0.50s 400.0GFlop/s dL (20480, 20480) (512, 512) (2, 4) 18 mc\n",
    );
    write(root, "4/output.txt", "[0] 9.99s (1, 1) (1, 1) (1, 1) 1\n");
    write(root, "4/job.sh", "#!/bin/bash -l\n");
}

#[test]
pub fn parses_all_result_files() {
    let dir = TempDir::new().unwrap();
    weak_run(dir.path());

    let table = parse_jobs(&[dir.path().to_path_buf()], false).unwrap();

    assert_eq!(table.len(), 4);
    assert_eq!(
        table.benches().into_iter().collect::<Vec<_>>(),
        vec!["chol", "red2band"]
    );

    let red2band = table.bench("red2band").collect::<Vec<_>>();
    assert_eq!(red2band.len(), 3);
    assert_eq!(
        red2band
            .iter()
            .map(|record| (record.nodes, record.run_index))
            .collect::<Vec<_>>(),
        vec![(1, 0), (1, 1), (4, 0)]
    );
    assert_eq!(red2band[2].band, Some(128));
    assert_eq!(red2band[2].ranks(), 8);
    assert_eq!(red2band[2].label(), "dlaf");
    assert_eq!(red2band[2].dir, None);
}

#[test]
pub fn distinguished_directories_get_their_own_label() {
    let dir = TempDir::new().unwrap();
    weak_run(&dir.path().join("before"));
    weak_run(&dir.path().join("after"));

    let table = parse_jobs(
        &[dir.path().join("before"), dir.path().join("after")],
        true,
    )
    .unwrap();

    assert_eq!(table.len(), 8);

    let labels = table
        .bench("chol")
        .map(|record| record.label())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["dlaf@after", "dlaf@before"]);
}

#[test]
pub fn missing_result_directory_is_an_error() {
    assert!(matches!(
        parse_jobs(&[PathBuf::from("/nonexistent/results")], false),
        Err(IngestError::MissingPath(_))
    ));
}

#[test]
pub fn empty_result_files_yield_no_records() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "2/trsm_dlaf_na.out", "srun: error: task 0: Killed\n");

    let table = parse_jobs(&[dir.path().to_path_buf()], false).unwrap();

    assert!(table.is_empty());
}

#[test]
pub fn command_line_selects_the_results() {
    let dir = TempDir::new().unwrap();
    weak_run(dir.path());
    let path = dir.path().to_string_lossy().into_owned();

    let (args, table) = parse_jobs_cmdargs_from(
        "Plot red2band weak scaling benchmarks.",
        ["plot", "--path", path.as_str(), "--prefix", "daint_"],
    )
    .unwrap();

    assert_eq!(
        args,
        JobsArgs {
            paths: vec![dir.path().to_path_buf()],
            distinguish_dir: false,
            prefix: String::from("daint_"),
            out_dir: PathBuf::from("."),
        }
    );
    assert_eq!(table.len(), 4);
}

#[test]
pub fn unknown_arguments_are_rejected() {
    assert!(matches!(
        parse_jobs_cmdargs_from("description", ["plot", "--frobnicate"]),
        Err(IngestError::Arguments(_))
    ));
}
