use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use machine_sound_prep::audio::{write_audio, Waveform};
use serde_json::Value;
use tempfile::tempdir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_machine_prep"))
}

fn dataset_args(base: &Path) -> Vec<String> {
    vec![
        "--base".to_string(),
        base.display().to_string(),
        "--machine".to_string(),
        "valve".to_string(),
        "--id".to_string(),
        "id_04".to_string(),
    ]
}

fn run(command: &str, base: &Path, extra: &[&str]) -> Output {
    cli()
        .arg(command)
        .args(dataset_args(base))
        .args(extra)
        .output()
        .expect("spawn machine_prep")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout utf8");
    serde_json::from_str(&stdout).unwrap_or_else(|err| panic!("invalid JSON ({err}): {stdout}"))
}

#[test]
fn locate_missing_directory_fails() {
    let tmp = tempdir().unwrap();
    let output = run("locate", tmp.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr utf8");
    assert!(
        stderr.contains("DirectoryNotFound"),
        "expected diagnostic, got {stderr}"
    );
}

#[test]
fn full_run_through_cli() {
    let tmp = tempdir().unwrap();
    let wav_dir = tmp.path().join("valve").join("id_04").join("normal");
    fs::create_dir_all(&wav_dir).unwrap();
    for (i, len) in [3_000usize, 4_000, 5_000].into_iter().enumerate() {
        let samples = (0..len).map(|n| ((n * (i + 3)) as f32 * 0.01).sin() * 0.2).collect();
        write_audio(
            &wav_dir.join(format!("{:08}.wav", i)),
            &Waveform::mono(samples, 8_000),
        )
        .unwrap();
    }

    let config_path = tmp.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
            "audio": { "sample_rate": 8000, "target_seconds": 0.5 },
            "spectrogram": { "n_fft": 256, "hop_length": 128, "n_mels": 16 },
            "sampler": { "batch_size": 2, "crop_height": 8, "crop_width": 16, "hop_size": 8, "seed": 1 }
        }"#,
    )
    .unwrap();
    let config = ["--config", config_path.to_str().unwrap()];

    let output = run("locate", tmp.path(), &[]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["directory"].as_str().unwrap().ends_with("normal"));
    let files = json["files"].as_array().expect("files array");
    assert_eq!(files.len(), 3);
    assert!(files[0].as_str().unwrap().ends_with("00000000.wav"));

    let output = run("flatfield", tmp.path(), &config);
    assert!(output.status.success(), "flatfield exited with {:?}", output.status.code());
    let json = stdout_json(&output);
    assert_eq!(json["written"], 3);
    assert_eq!(json["padded"], 1);
    assert_eq!(json["trimmed"], 1);

    let flat = ["--config", config_path.to_str().unwrap(), "--extradir", "flatfield"];
    let output = run("survey", tmp.path(), &flat);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["lengths"], serde_json::json!([4000]));

    let mut fit = flat.to_vec();
    fit.extend(["--mode", "fit"]);
    let output = run("extract", tmp.path(), &fit);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["shape"], serde_json::json!([3, 32, 16]));

    let mut transform = flat.to_vec();
    transform.extend(["--mode", "transform"]);
    let output = run("extract", tmp.path(), &transform);
    assert!(output.status.success());
    assert!(stdout_json(&output)["features"].as_str().unwrap().ends_with("data.npy"));

    let mut batches = flat.to_vec();
    batches.extend(["--epochs", "3"]);
    let output = run("batches", tmp.path(), &batches);
    assert!(output.status.success());
    let json = stdout_json(&output);
    // ceil((32 - 8 + 8) / 8) = 4 starts, 12 samples, 6 batches of 2
    assert_eq!(json["starts_per_file"], 4);
    assert_eq!(json["batches_per_epoch"], 6);
    assert_eq!(json["batches_served"], 18);
    assert_eq!(json["batch_shape"], serde_json::json!([2, 8, 16, 1]));
}

#[test]
fn locate_empty_directory_emits_empty_list() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("valve").join("id_04").join("normal")).unwrap();

    let output = run("locate", tmp.path(), &[]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["files"], serde_json::json!([]));
}

#[test]
fn batches_before_extract_fails() {
    let tmp = tempdir().unwrap();
    let wav_dir = tmp.path().join("valve").join("id_04").join("normal");
    fs::create_dir_all(&wav_dir).unwrap();
    write_audio(&wav_dir.join("a.wav"), &Waveform::mono(vec![0.0; 800], 8_000)).unwrap();

    let output = run("batches", tmp.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Extract features first"), "got {stderr}");
}
