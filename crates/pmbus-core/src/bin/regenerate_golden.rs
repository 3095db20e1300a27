use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pmbus_core::{CommandTable, make_listing};

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let input = path.join("input.csv");
        if !input.exists() {
            continue;
        }
        let output = path.join("expected_listing.json");
        regenerate_one(&input, &output)?;
    }

    Ok(())
}

fn regenerate_one(input: &Path, output: &Path) -> Result<(), String> {
    let table = CommandTable::open(input)
        .map_err(|err| format!("loading {} failed: {}", input.display(), err))?;
    let mut listing = make_listing(&table);
    // keep listings independent of where the repo is checked out
    listing.table.origin = "input.csv".to_string();
    let mut json = serde_json::to_string_pretty(&listing)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    json.push('\n');
    fs::write(output, json)
        .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    println!("regenerated {}", output.display());
    Ok(())
}
