//! # CLI — Lingua Interactive Shell
//!
//! A REPL-style command-line interface for the Lingua translation store.
//! Reads commands from stdin, executes them against the store, and prints
//! results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! STORE locale key value   Store one translation (key is a flat key)
//! GET locale key [scope..] Look a key up (prints value or "(nil)")
//! COMPACT                  Compact all pending locales (uses the cache
//!                          file when LINGUA_CACHE_PATH is set)
//! RELOAD                   Drop all state, compacted and pending
//! STATS                    Print store debug info
//! EXIT / QUIT              Shut down
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! LINGUA_SEPARATOR     flat-key separator            (default: ".")
//! LINGUA_CACHE_PATH    cache file path               (default: none)
//! LINGUA_CACHE_DIGEST  content-digest fingerprints   (default: "false")
//! LINGUA_SOURCES       sources for the fingerprint,  (default: empty)
//!                      colon-separated paths
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! Lingua started (separator=".", cache=none)
//! > STORE en greeting.morning Good morning
//! OK
//! > COMPACT
//! OK (1 locales compacted)
//! > GET en greeting.morning
//! Good morning
//! > GET en greeting
//! {morning: "Good morning"}
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use engine::{CacheConfig, NoRules, Store};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tree::{Tree, Value};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn cache_config_from_env() -> Option<CacheConfig> {
    let path = std::env::var("LINGUA_CACHE_PATH").ok()?;
    let digest: bool = env_or("LINGUA_CACHE_DIGEST", "false").parse().unwrap_or(false);
    let sources = env_or("LINGUA_SOURCES", "")
        .split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    Some(CacheConfig {
        path: PathBuf::from(path),
        digest,
        sources,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let separator = env_or("LINGUA_SEPARATOR", ".");
    let cache = cache_config_from_env();

    let mut store = Store::with_separator(separator.clone());

    println!(
        "Lingua started (separator={:?}, cache={})",
        separator,
        cache
            .as_ref()
            .map(|c| c.path.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command.to_ascii_uppercase().as_str() {
            "STORE" => {
                if parts.len() < 4 {
                    println!("usage: STORE locale key value");
                    continue;
                }
                let locale = parts[1];
                let key = parts[2];
                let value = parts[3..].join(" ");
                let data = nest(key, &separator, Value::str(value));
                match store.store_translations(locale, data, &Default::default()) {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("ERR {e}"),
                }
            }
            "GET" => {
                if parts.len() < 3 {
                    println!("usage: GET locale key [scope..]");
                    continue;
                }
                let locale = parts[1];
                let key = parts[2];
                let scope: Vec<&str> = parts[3..].to_vec();
                match store.lookup(locale, key, &scope) {
                    Some(value) => println!("{}", render(&value)),
                    None => println!("(nil)"),
                }
            }
            "COMPACT" => {
                let result = match &cache {
                    Some(config) => store.compact_with_cache(config, &NoRules),
                    None => store.compact(),
                };
                match result {
                    Ok(()) => println!("OK ({} locales compacted)", store.compacted_locales().len()),
                    Err(e) => println!("ERR {e}"),
                }
            }
            "RELOAD" => {
                store.reload();
                println!("OK");
            }
            "STATS" => {
                println!("{store:#?}");
            }
            "EXIT" | "QUIT" => {
                println!("bye");
                break;
            }
            other => {
                println!("unknown command: {other}");
            }
        }
    }

    Ok(())
}

/// Builds the nested single-leaf tree a flat key names.
fn nest(flat: &str, separator: &str, value: Value) -> Tree {
    let mut components: Vec<&str> = flat.split(separator).collect();
    let leaf_key = components.pop().unwrap_or(flat);
    let mut tree = Tree::new();
    tree.insert(leaf_key.to_string(), value);

    for component in components.into_iter().rev() {
        let mut outer = Tree::new();
        outer.insert(component.to_string(), Value::Map(tree));
        tree = outer;
    }
    tree
}

/// Renders a value for shell output.
fn render(value: &Value) -> String {
    match value {
        Value::Nil => "(nil)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => match s.as_str() {
            Some(text) => text.to_string(),
            None => format!("0x{}", hex(s.bytes())),
        },
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_quoted).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Link(target) => format!("&{target}"),
        Value::Rule(_) => "(rule)".to_string(),
        Value::RulePlaceholder => "(rule placeholder)".to_string(),
        Value::Map(map) => {
            let rendered: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}: {}", render_quoted(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

/// Like [`render`], but strings are quoted so nested output stays readable.
fn render_quoted(value: &Value) -> String {
    match value {
        Value::Str(s) if s.as_str().is_some() => format!("{:?}", s.as_str().unwrap()),
        other => render(other),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
