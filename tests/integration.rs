use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_heatwave"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn read_json(file: PathBuf) -> serde_json::Value {
    let contents = fs::read_to_string(&file).expect("failed to read output file");
    serde_json::from_str(&contents).expect("failed to parse output file")
}

fn fresh_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    test_dir
}

#[test]
fn basic_workflow() {
    let test_dir = fresh_dir("basic_workflow");

    let config_contents = String::new()
        + "[chart]\n"
        + "threshold_value = 1.5\n"
        + "names = { gamma = \"Gamma\" }\n"
        + "\n"
        + "[background]\n"
        + "n_particles = 20\n"
        + "seed = 11\n"
        + "\n"
        + "[page]\n"
        + "submit_delay_ms = 1000\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let dataset_contents = String::new()
        + "years = [2000, 2010]\n"
        + "\n"
        + "[[source]]\n"
        + "key = \"alpha\"\n"
        + "values = [1.0, nan]\n"
        + "name = \"Alpha\"\n"
        + "\n"
        + "[[source]]\n"
        + "key = \"gamma\"\n"
        + "values = [2.0, 4.0]\n";
    fs::write(test_dir.join("dataset.toml"), dataset_contents)
        .expect("failed to write dataset file");

    let script_contents = String::new()
        + "[[element]]\n"
        + "tag = \"div\"\n"
        + "id = \"global-temperature-chart\"\n"
        + "\n"
        + "[[element]]\n"
        + "tag = \"div\"\n"
        + "id = \"share-buttons\"\n"
        + "\n"
        + "[[element]]\n"
        + "tag = \"form\"\n"
        + "id = \"contact\"\n"
        + "\n"
        + "[[element]]\n"
        + "tag = \"button\"\n"
        + "type = \"submit\"\n"
        + "parent = \"contact\"\n"
        + "text = \"Send\"\n"
        + "\n"
        + "[[event]]\n"
        + "at_ms = 10\n"
        + "action = \"submit\"\n"
        + "target = \"contact\"\n";
    let script_path = test_dir.join("page.toml");
    fs::write(&script_path, script_contents).expect("failed to write page script");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");
    let script_str = script_path
        .to_str()
        .expect("failed to convert script path to string");

    run_bin(&["--site-dir", test_dir_str, "chart"]);
    run_bin(&[
        "--site-dir",
        test_dir_str,
        "background",
        "--frames",
        "5",
        "--resize",
        "2:640x360",
    ]);
    run_bin(&["--site-dir", test_dir_str, "simulate", "--script", script_str]);

    let out_dir = test_dir.join("out");

    let global = read_json(out_dir.join("global-temperature-chart.json"));
    let series = global["series"].as_array().expect("series must be an array");
    assert_eq!(series.len(), 3);
    assert_eq!(series[0]["name"], "Alpha");
    assert_eq!(series[1]["name"], "Gamma");
    assert_eq!(series[0]["data"], serde_json::json!([1.0, null]));
    assert_eq!(series[2]["data"], serde_json::json!([1.5, 4.0]));

    let comparison = read_json(out_dir.join("temperature-chart.json"));
    assert_eq!(comparison["series"].as_array().map(Vec::len), Some(3));

    assert!(out_dir.join("background.msgpack").exists());

    let trace = read_json(out_dir.join("page-trace.json"));
    let mutations = trace["mutations"].as_array().expect("mutations must be an array");
    assert!(mutations.iter().any(|m| m["kind"] == "chart_mounted" && m["chart"] == "global"));
    assert!(mutations.iter().any(|m| m["kind"] == "text_set" && m["at_ms"] == 1010));
    assert_eq!(trace["end_ms"], 4310);

    run_bin(&["--site-dir", test_dir_str, "clean"]);
    assert!(!out_dir.join("global-temperature-chart.json").exists());
    assert!(!out_dir.join("background.msgpack").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn embedded_dataset_without_config() {
    let test_dir = fresh_dir("embedded_dataset_without_config");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--site-dir", test_dir_str, "chart"]);

    let global = read_json(test_dir.join("out").join("global-temperature-chart.json"));
    let series = global["series"].as_array().expect("series must be an array");
    assert_eq!(series.len(), 7);
    assert_eq!(series[6]["data"][26], 1.55);
    assert_eq!(global["xAxis"]["data"][0], 1850);

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let test_dir = fresh_dir("invalid_config_fails");
    fs::write(test_dir.join("config.toml"), "[page]\nreveal_threshold = 2.0\n")
        .expect("failed to write config file");

    let output = Command::new(env!("CARGO_BIN_EXE_heatwave"))
        .args(["--site-dir", test_dir.to_str().expect("invalid path"), "chart"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}
