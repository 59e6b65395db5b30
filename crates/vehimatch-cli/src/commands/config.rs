use anyhow::{Context, Result};
use toml_edit::DocumentMut;
use vehimatch_etl::{config, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
    Boolean,
}

/// Keys accepted by `config get` and `config set`.
const KEYS: &[(&str, Kind)] = &[
    ("database_path", Kind::Text),
    ("alias_path", Kind::Text),
    ("elasticsearch.url", Kind::Text),
    ("elasticsearch.index", Kind::Text),
    ("elasticsearch.username", Kind::Text),
    ("elasticsearch.password", Kind::Text),
    ("elasticsearch.api_key", Kind::Text),
    ("elasticsearch.request_timeout_secs", Kind::Integer),
    ("elasticsearch.max_retries", Kind::Integer),
    ("generation.variants_per_record", Kind::Integer),
    ("generation.batch_size", Kind::Integer),
    ("generation.limit", Kind::Integer),
    ("generation.attempts_per_variant", Kind::Integer),
    ("generation.seed", Kind::Integer),
    ("evaluation.top_k", Kind::Integer),
    ("evaluation.concurrency", Kind::Integer),
    ("evaluation.timeout_ms", Kind::Integer),
    ("evaluation.limit", Kind::Integer),
    ("logging.level", Kind::Text),
    ("logging.coloured", Kind::Boolean),
];

const SECRET_KEYS: &[&str] = &["elasticsearch.password", "elasticsearch.api_key"];

fn key_kind(key: &str) -> Result<Kind> {
    KEYS.iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| {
            let valid: Vec<&str> = KEYS.iter().map(|(name, _)| *name).collect();
            anyhow::anyhow!(
                "Unknown config key: {}\n\nValid keys: {}",
                key,
                valid.join(", ")
            )
        })
}

fn optional(value: Option<&str>) -> &str {
    value.unwrap_or("<not set>")
}

fn secret(value: Option<&str>) -> &str {
    value.map_or("<not set>", |_| "<set>")
}

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    let es = &config.elasticsearch;
    let generation = &config.generation;
    let evaluation = &config.evaluation;

    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!(
        "  alias_path: {}",
        config
            .alias_path
            .as_ref()
            .map_or_else(|| "<built-in>".to_string(), |p| p.display().to_string())
    );
    println!("  elasticsearch.url: {}", es.url);
    println!("  elasticsearch.index: {}", es.index);
    println!("  elasticsearch.username: {}", optional(es.username.as_deref()));
    println!("  elasticsearch.password: {}", secret(es.password.as_deref()));
    println!("  elasticsearch.api_key: {}", secret(es.api_key.as_deref()));
    println!("  elasticsearch.request_timeout_secs: {}", es.request_timeout_secs);
    println!("  elasticsearch.max_retries: {}", es.max_retries);
    println!("  generation.variants_per_record: {}", generation.variants_per_record);
    println!("  generation.batch_size: {}", generation.batch_size);
    println!(
        "  generation.limit: {}",
        generation
            .limit
            .map_or_else(|| "<all>".to_string(), |l| l.to_string())
    );
    println!("  generation.attempts_per_variant: {}", generation.attempts_per_variant);
    println!(
        "  generation.seed: {}",
        generation
            .seed
            .map_or_else(|| "<random>".to_string(), |s| s.to_string())
    );
    println!("  evaluation.top_k: {}", evaluation.top_k);
    println!("  evaluation.concurrency: {}", evaluation.concurrency);
    println!("  evaluation.timeout_ms: {}", evaluation.timeout_ms);
    println!("  evaluation.limit: {}", evaluation.limit);
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (VEHIMATCH_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        key_kind(&key)?;

        if SECRET_KEYS.contains(&key.as_str()) {
            let es = &config.elasticsearch;
            let value = if key.ends_with("password") {
                &es.password
            } else {
                &es.api_key
            };
            println!("{}", secret(value.as_deref()));
            return Ok(());
        }

        let tree = serde_json::to_value(config).context("Failed to serialize configuration")?;
        let pointer = format!("/{}", key.replace('.', "/"));
        match tree.pointer(&pointer) {
            None | Some(serde_json::Value::Null) => println!("<not set>"),
            Some(serde_json::Value::String(s)) => println!("{}", s),
            Some(other) => println!("{}", other),
        }
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'vehimatch config init' to create it.");
        }
    }

    Ok(())
}

/// Set `key` to `raw` in a TOML document, keeping comments and layout.
fn set_in_document(contents: &str, key: &str, raw: &str) -> Result<String> {
    let kind = key_kind(key)?;
    let value = match kind {
        Kind::Text => toml_edit::value(raw),
        Kind::Integer => toml_edit::value(
            raw.parse::<i64>()
                .with_context(|| format!("{key} expects an integer, got '{raw}'"))?,
        ),
        Kind::Boolean => toml_edit::value(
            raw.parse::<bool>()
                .with_context(|| format!("{key} expects true or false, got '{raw}'"))?,
        ),
    };

    let mut doc: DocumentMut = contents.parse().context("Failed to parse config file")?;

    let parts: Vec<&str> = key.split('.').collect();
    let (last, sections) = parts
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("Empty config key"))?;

    let mut table = doc.as_table_mut();
    for section in sections {
        table = table
            .entry(section)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("'{section}' in config file is not a table"))?;
    }
    table[*last] = value;

    Ok(doc.to_string())
}

/// Set a config value.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();

    // Ensure config file exists
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = set_in_document(&contents, key, value)?;

    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, value);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure vehimatch.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_top_level_key() {
        let updated = set_in_document("", "database_path", "/tmp/v.db").unwrap();
        assert!(updated.contains("database_path = \"/tmp/v.db\""));
    }

    #[test]
    fn test_set_nested_key_keeps_comments() {
        let original = "# keep me\n[evaluation]\ntop_k = 3 # hits\n";
        let updated = set_in_document(original, "evaluation.top_k", "10").unwrap();
        assert!(updated.contains("# keep me"));
        assert!(updated.contains("top_k = 10"));
        assert!(!updated.contains("top_k = 3"));
    }

    #[test]
    fn test_set_creates_missing_section() {
        let updated = set_in_document("", "elasticsearch.url", "http://es:9200").unwrap();
        let doc: DocumentMut = updated.parse().unwrap();
        assert_eq!(doc["elasticsearch"]["url"].as_str(), Some("http://es:9200"));
    }

    #[test]
    fn test_set_example_config_round_trip() {
        let updated =
            set_in_document(config::example_config(), "generation.seed", "42").unwrap();
        let doc: DocumentMut = updated.parse().unwrap();
        assert_eq!(doc["generation"]["seed"].as_integer(), Some(42));
        assert_eq!(doc["generation"]["batch_size"].as_integer(), Some(5000));
    }

    #[test]
    fn test_set_rejects_bad_integer() {
        assert!(set_in_document("", "evaluation.top_k", "many").is_err());
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let err = set_in_document("", "acoustid_api_key", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
    }

    #[test]
    fn test_boolean_key() {
        let updated = set_in_document("", "logging.coloured", "false").unwrap();
        let doc: DocumentMut = updated.parse().unwrap();
        assert_eq!(doc["logging"]["coloured"].as_bool(), Some(false));
    }
}
