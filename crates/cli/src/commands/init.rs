//! Initialize .quell.toml configuration

use anyhow::Result;
use std::path::Path;

const TEMPLATE: &str = r#"[general]
cache_dir = ".quell-cache"
fail_on = "high"
debounce_ms = 300

[registry]
file_name = "ignores.json"
filter_file_name = "ignore-filter.json"

# One section per engine. Each engine is an external command that takes a
# file and prints a JSON array of findings; {target} and {filter} are
# replaced at invocation time.
#
# [engines.oss]
# enabled = true
# command = "osscan"
# args = ["--json", "{target}"]
# filter_args = ["--ignore-file", "{filter}"]
# targets = ["**/package.json", "**/Cargo.toml", "**/requirements.txt"]
#
# [engines.secrets]
# enabled = true
# command = "secretscan"
# args = ["{target}"]
# filter_args = ["--exclusions", "{filter}"]
# targets = ["**/*"]
#
# [engines.iac]
# enabled = true
# command = "iacscan"
# args = ["--report", "json", "{target}"]
# filter_args = ["--skip-file", "{filter}"]
# targets = ["**/*.tf", "**/*.yaml", "**/*.yml"]
#
# [engines.quality]
# enabled = true
# command = "rulescan"
# args = ["{target}"]
# filter_args = ["--suppressions", "{filter}"]
# targets = ["**/*.py", "**/*.ts", "**/*.js"]
#
# [engines.container]
# enabled = true
# command = "imagescan"
# args = ["--json", "{target}"]
# filter_args = ["--ignore", "{filter}"]
# targets = ["**/Dockerfile", "**/docker-compose.yaml"]

[ignore]
paths = [
    "vendor/",
    "node_modules/",
    "dist/",
    ".git/",
    "build/",
    "target/",
    ".quell-cache/",
]
"#;

pub fn run(path: Option<&Path>) -> Result<()> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join(".quell.toml");

    if config_path.exists() {
        println!("⚠️  .quell.toml already exists at {:?}", config_path);
        return Ok(());
    }

    std::fs::write(&config_path, TEMPLATE)?;

    println!("✅ Created .quell.toml at {:?}", config_path);
    println!("\nEnable your engines in the configuration and run:");
    println!("  quell");

    Ok(())
}
