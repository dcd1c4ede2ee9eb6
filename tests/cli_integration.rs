use serde_json::Value;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "modpath_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

fn write_jar(path: &std::path::Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

fn run(args: &[&str]) -> anyhow::Result<std::process::Output> {
    let bin = env!("CARGO_BIN_EXE_modpath");
    Ok(Command::new(bin).args(args).env_remove("RUST_LOG").output()?)
}

fn run_json(args: &[&str]) -> anyhow::Result<Value> {
    let out = run(args)?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

fn strings(v: &Value) -> Vec<String> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn partition_scan_and_persistent_cache_flow() -> anyhow::Result<()> {
    let base = temp_dir("flow");
    let repo = base.join("repo");
    let db = base.join("db").join("modules.lmdb");
    let db_arg = db.to_string_lossy().to_string();

    let auto = repo.join("org/auto/1.0/auto-1.0.jar");
    let explicit = repo.join("org/explicit/1.0/explicit-1.0.jar");
    let plain = repo.join("org/plain/1.0/plain-1.0.jar");
    write_jar(
        &auto,
        &[(
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\r\nAutomatic-Module-Name: org.auto\r\n\r\n",
        )],
    )?;
    write_jar(&explicit, &[("module-info.class", b"")])?;
    write_jar(&plain, &[("org/plain/P.class", b"")])?;
    let missing = base.join("missing.jar");
    let missing_arg = missing.to_string_lossy().to_string();
    let repo_arg = repo.to_string_lossy().to_string();

    let out = run_json(&[
        "--db",
        &db_arg,
        "partition",
        &missing_arg,
        "--scan",
        &repo_arg,
    ])?;
    assert_eq!(
        strings(&out["classpath"]),
        vec![missing_arg.clone(), plain.to_string_lossy().to_string()]
    );
    assert_eq!(
        strings(&out["module_path"]),
        vec![
            auto.to_string_lossy().to_string(),
            explicit.to_string_lossy().to_string()
        ]
    );

    let stats = run_json(&["--db", &db_arg, "stats"])?;
    assert_eq!(stats["entries"].as_u64(), Some(3));
    assert_eq!(stats["modules"].as_u64(), Some(2));

    let no_infer = run_json(&["--db", &db_arg, "partition", "--no-infer", "--scan", &repo_arg])?;
    assert_eq!(strings(&no_infer["classpath"]).len(), 3);
    assert!(strings(&no_infer["module_path"]).is_empty());

    let clear = run(&["--db", &db_arg, "clear"])?;
    assert!(clear.status.success());
    assert!(!db.exists());

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn classify_reports_kinds_and_fails_on_corrupt_jar() -> anyhow::Result<()> {
    let base = temp_dir("classify");
    let classes = base.join("classes");
    std::fs::create_dir_all(&classes)?;
    std::fs::write(classes.join("module-info.class"), b"")?;
    let notes = base.join("notes.txt");
    std::fs::write(&notes, b"plain text")?;

    let classes_arg = classes.to_string_lossy().to_string();
    let notes_arg = notes.to_string_lossy().to_string();
    let out = run_json(&["--no-persist", "classify", &classes_arg, &notes_arg])?;
    assert_eq!(out[0]["kind"], "directory");
    assert_eq!(out[0]["is_module"], true);
    assert_eq!(out[1]["kind"], "plain");
    assert_eq!(out[1]["is_module"], false);

    let broken = base.join("broken.jar");
    std::fs::write(&broken, b"not a zip")?;
    let broken_arg = broken.to_string_lossy().to_string();
    let failed = run(&["--no-persist", "classify", &broken_arg])?;
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stderr).contains("broken.jar"));

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn source_reports_declared_module() -> anyhow::Result<()> {
    let base = temp_dir("source");
    let root = base.join("src/main/java");
    std::fs::create_dir_all(&root)?;
    let root_arg = root.to_string_lossy().to_string();

    let before = run_json(&["source", &root_arg])?;
    assert_eq!(before["is_module_source"], false);

    std::fs::write(root.join("module-info.java"), "module org.demo.app {}\n")?;
    let after = run_json(&["source", &root_arg])?;
    assert_eq!(after["is_module_source"], true);
    assert_eq!(after["module_name"], "org.demo.app");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}
