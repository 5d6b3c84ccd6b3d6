use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "slot-reels"])
        .status()
        .expect("failed to invoke cargo check for slot-reels CLI binary");

    assert!(status.success(), "cargo check --bin slot-reels should succeed");
}

#[test]
fn cli_runs_a_tumbling_session() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args([
            "run",
            "--quiet",
            "--bin",
            "slot-reels",
            "--",
            "--mode",
            "tumbling",
            "--spins",
            "2",
            "--clear-symbol",
            "1",
        ])
        .status()
        .expect("failed to invoke slot-reels CLI binary");

    assert!(status.success(), "slot-reels tumbling session should succeed");
}
