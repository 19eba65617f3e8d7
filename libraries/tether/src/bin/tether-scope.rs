#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;
    use tether::{FileStorage, SnapshotStore};

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <path-to-snapshot-directory>", args[0]);
        eprintln!("\nExample: {} ./boostpad-data", args[0]);
        std::process::exit(1);
    }

    let dir = PathBuf::from(&args[1]);

    if !dir.is_dir() {
        eprintln!("Error: '{}' is not a directory", dir.display());
        std::process::exit(1);
    }

    let storage = match FileStorage::open(&dir) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error opening '{}': {e}", dir.display());
            std::process::exit(1);
        }
    };

    let keys = match storage.keys() {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("Error listing '{}': {e}", dir.display());
            std::process::exit(1);
        }
    };

    println!("TetherScope - Local Snapshot Inspector");
    println!("======================================");
    println!("Directory: {}", dir.display());
    println!("Snapshots: {}", keys.len());
    println!();

    let mut unreadable = 0;

    for key in &keys {
        println!("  {key}");

        let raw = match storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                println!("    ⚠️  Listed but missing");
                unreadable += 1;
                continue;
            }
            Err(e) => {
                println!("    ❌ Read error: {e}");
                unreadable += 1;
                continue;
            }
        };

        println!("    Size: {} bytes", raw.len());

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                println!("    ❌ Not JSON ({e}); the app will read this as empty");
                unreadable += 1;
                continue;
            }
        };

        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("<none>");
        println!("    Version: {version}");

        match value.get("data") {
            Some(serde_json::Value::Array(items)) => println!("    Entries: {}", items.len()),
            Some(serde_json::Value::Object(items)) => println!("    Keys: {}", items.len()),
            Some(other) => println!("    Value: {other}"),
            None => {
                println!("    ❌ No data field; the app will read this as empty");
                unreadable += 1;
            }
        }
    }

    println!();
    println!("Summary:");
    println!("--------");
    if unreadable == 0 {
        println!("  ✅ All snapshots are readable");
    } else {
        println!("  ⚠️  {unreadable} snapshot(s) will be read as empty");
    }
}
