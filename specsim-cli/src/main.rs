mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::str::FromStr;

use specsim_core::{
    find_similar_requirements, import_document, settings_path, EnrichedRequirement, ErrorKind,
    ImportDocument, Method, Settings, Specification, SpecificationStatus, SqliteStore,
};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = settings_path(cli.config.as_deref())?;
    let mut settings = Settings::load(&config_path)?;
    if let Some(db) = &cli.db {
        settings.database = db.clone();
    }

    init_logging(&settings, cli.verbose);
    tracing::debug!("Using settings from {:?}", config_path);

    let mut store = SqliteStore::open(&settings.database)
        .with_context(|| format!("Failed to open database {:?}", settings.database))?;

    match &cli.command {
        Command::Init { overwrite, yes } => init_database(&mut store, &settings, *overwrite, *yes)?,
        Command::Import { files } => import_files(&mut store, &settings, files)?,
        Command::Specs => list_specifications(&store)?,
        Command::Compare {
            spec1,
            spec2,
            method,
            threshold,
        } => compare_specifications(&mut store, &settings, spec1, spec2, method, *threshold)?,
        Command::Find {
            text,
            json,
            method,
            threshold,
        } => find_requirements(&store, &settings, text, *json, method, *threshold)?,
        Command::Similarities { spec } => show_similarities(&store, spec)?,
        Command::Counts => show_counts(&store)?,
        Command::Show { number } => show_requirement(&store, number)?,
        Command::Search { text } => search_requirements(&store, text)?,
    }

    Ok(())
}

fn init_logging(settings: &Settings, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::from_str(&settings.log_level).unwrap_or(tracing::Level::INFO)
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_method(method: &Option<String>) -> Result<Option<Method>> {
    Ok(method.as_deref().map(Method::parse).transpose()?)
}

/// Resolves an id, `name` or `name@version` to a stored specification.
///
/// A numeric reference is tried as an id first, then as a name.
fn resolve_specification(store: &SqliteStore, reference: &str) -> Result<Specification> {
    let by_id = match reference.parse::<i64>() {
        Ok(id) => store.specification(id)?,
        Err(_) => None,
    };

    let spec = if by_id.is_some() {
        by_id
    } else if let Some((name, version)) = reference.split_once('@') {
        store.specification_by_name(name, Some(version))?
    } else {
        store.specification_by_name(reference, None)?
    };

    spec.with_context(|| format!("Specification '{}' not found", reference))
}

fn init_database(store: &mut SqliteStore, settings: &Settings, overwrite: bool, yes: bool) -> Result<()> {
    if overwrite {
        if !yes {
            let confirm = inquire::Confirm::new(
                "Are you sure you want to drop all tables? Stored data will be lost.",
            )
            .with_default(false)
            .prompt()?;

            if !confirm {
                println!("{}", "Initialization cancelled.".yellow());
                return Ok(());
            }
        }

        store.reset()?;
        println!("{}", "Database recreated.".green());
    } else {
        println!("{}", "Database ready.".green());
    }

    println!("{}: {}", "Database".blue(), settings.database.display());
    Ok(())
}

fn import_files(store: &mut SqliteStore, settings: &Settings, files: &[std::path::PathBuf]) -> Result<()> {
    let normalizer = settings.normalizer();
    let mut failures = 0;

    for file in files {
        match import_file(store, &normalizer, file) {
            Ok(summary) => {
                println!(
                    "{} {}: {} requirements imported, {} skipped",
                    "Imported".green(),
                    summary.specification.label(),
                    summary.imported,
                    summary.skipped
                );
            }
            Err(err) => {
                failures += 1;
                eprintln!("{} {}: {:#}", "Failed".red(), file.display(), err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} imports failed", failures, files.len());
    }
    Ok(())
}

fn import_file(
    store: &mut SqliteStore,
    normalizer: &specsim_core::BasicNormalizer,
    file: &Path,
) -> Result<specsim_core::ImportSummary> {
    let document = ImportDocument::load(file)
        .with_context(|| format!("Failed to load import document {:?}", file))?;
    let file_path = file.to_string_lossy();
    Ok(import_document(store, normalizer, &document, &file_path)?)
}

fn list_specifications(store: &SqliteStore) -> Result<()> {
    let specs = store.list_specifications()?;
    if specs.is_empty() {
        println!("{}", "No specifications found.".yellow());
        return Ok(());
    }

    println!(
        "{:<5} | {:<30} | {:<8} | {:<25} | {:<6} | {:<10}",
        "ID", "Name", "Version", "Type", "Reqs", "Status"
    );
    println!("{}", "-".repeat(100));

    for spec in specs {
        let status = match spec.status {
            SpecificationStatus::Pending => "pending".yellow(),
            SpecificationStatus::Processed => "processed".green(),
            SpecificationStatus::Failed => "failed".red(),
        };
        println!(
            "{:<5} | {:<30} | {:<8} | {:<25} | {:<6} | {:<10}",
            spec.id,
            truncate(&spec.name, 30),
            spec.version,
            truncate(spec.spec_type.as_deref().unwrap_or("-"), 25),
            spec.req_count,
            status
        );
    }

    Ok(())
}

fn compare_specifications(
    store: &mut SqliteStore,
    settings: &Settings,
    spec1: &str,
    spec2: &str,
    method: &Option<String>,
    threshold: Option<f64>,
) -> Result<()> {
    let engine = settings.engine(parse_method(method)?, threshold)?;
    let left = resolve_specification(store, spec1)?;
    let right = resolve_specification(store, spec2)?;

    let summary = engine.compare(store, &left, &right)?;

    println!(
        "{} {} with {} using {} (threshold {})",
        "Compared".green(),
        left.label(),
        right.label(),
        engine.method_name(),
        engine.threshold()
    );
    println!("{}: {}", "Pairs compared".blue(), summary.pairs_compared);
    println!("{}: {}", "Pairs skipped".blue(), summary.pairs_skipped);
    println!("{}: {}", "Similar pairs".blue(), summary.edges_drafted);
    println!("{}: {}", "Stored".blue(), summary.edges_written);
    if summary.edges_duplicate > 0 {
        println!(
            "{}: {}",
            "Already stored".yellow(),
            summary.edges_duplicate
        );
    }

    Ok(())
}

fn find_requirements(
    store: &SqliteStore,
    settings: &Settings,
    text: &str,
    json: bool,
    method: &Option<String>,
    threshold: Option<f64>,
) -> Result<()> {
    let engine = settings.engine(parse_method(method)?, threshold)?;
    let normalizer = settings.normalizer();

    let results = match find_similar_requirements(store, &engine, &normalizer, text) {
        Ok(results) => results,
        Err(err) => match err.kind() {
            ErrorKind::Validation => anyhow::bail!("{}", err),
            _ => {
                tracing::error!("Query failed: {}", err);
                anyhow::bail!("An error occurred while searching for similar requirements");
            }
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No similar requirements found.".yellow());
        return Ok(());
    }

    for result in &results {
        print_match(result);
    }
    Ok(())
}

fn print_match(result: &EnrichedRequirement) {
    println!(
        "{} {} ({})",
        format!("{:.3}", result.similarity).green(),
        result.requirement_number.bold(),
        result.specification_name
    );
    println!("  {}: {}", "Title".blue(), result.title);
    println!("  {}: {}", "Description".blue(), result.description);
    println!(
        "  {}: {}  {}: {}  {}: {}",
        "Source".blue(),
        result.source,
        "Obligation".blue(),
        result.obligation,
        "Test".blue(),
        result.test_procedure
    );
}

fn show_similarities(store: &SqliteStore, reference: &str) -> Result<()> {
    let spec = resolve_specification(store, reference)?;
    let edges = store.similarities_by_specification(spec.id)?;

    if edges.is_empty() {
        println!("{} {}", "No similarities stored for".yellow(), spec.label());
        return Ok(());
    }

    println!(
        "{:<15} | {:<15} | {:<6} | {:<6} | {:<18}",
        "Requirement 1", "Requirement 2", "Title", "Desc", "Method"
    );
    println!("{}", "-".repeat(70));

    for edge in edges {
        println!(
            "{:<15} | {:<15} | {:<6.3} | {:<6.3} | {:<18}",
            edge.requirement1_number,
            edge.requirement2_number,
            edge.title_similarity,
            edge.description_similarity,
            edge.comparison_method
        );
    }

    Ok(())
}

fn show_counts(store: &SqliteStore) -> Result<()> {
    let counts = store.similarity_counts()?;
    if counts.is_empty() {
        println!("{}", "No similarities stored.".yellow());
        return Ok(());
    }

    for count in counts {
        println!(
            "{} V{} {} {} V{}: {}",
            count.spec1_name,
            count.spec1_version,
            "->".blue(),
            count.spec2_name,
            count.spec2_version,
            count.similarity_count.to_string().green()
        );
    }

    Ok(())
}

fn show_requirement(store: &SqliteStore, number: &str) -> Result<()> {
    let req = store
        .requirement_by_number(number)?
        .with_context(|| format!("Requirement '{}' not found", number))?;
    let spec = store.specification(req.specification_id)?;

    println!("{}: {}", "Number".blue(), req.requirement_number);
    if let Some(spec) = spec {
        println!("{}: {}", "Specification".blue(), spec.label());
    }
    println!("{}: {}", "Title".blue(), req.title);
    println!("{}: {}", "Description".blue(), req.description);
    println!("{}: {}", "Source".blue(), req.source);
    println!("{}: {}", "Obligation".blue(), req.obligation);
    println!("{}: {}", "Test procedure".blue(), req.test_procedure);

    Ok(())
}

fn search_requirements(store: &SqliteStore, text: &str) -> Result<()> {
    let requirements = store.search_requirements(text)?;
    if requirements.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return Ok(());
    }

    println!("{:<15} | {:<60}", "Number", "Title");
    println!("{}", "-".repeat(80));
    for req in requirements {
        println!("{:<15} | {:<60}", req.requirement_number, truncate(&req.title, 60));
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsim_core::NewSpecification;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Verschlüsselung", 8), "Versc...");
    }

    #[test]
    fn test_resolve_specification() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let old = store
            .get_or_create_specification(&NewSpecification::new("gemSpec_Krypt", "2.2"))
            .unwrap();
        let new = store
            .get_or_create_specification(&NewSpecification::new("gemSpec_Krypt", "2.3"))
            .unwrap();

        assert_eq!(resolve_specification(&store, &old.id.to_string()).unwrap(), old);
        assert_eq!(resolve_specification(&store, "gemSpec_Krypt@2.2").unwrap(), old);
        assert_eq!(resolve_specification(&store, "gemSpec_Krypt").unwrap(), new);
        assert!(resolve_specification(&store, "gemSpec_PKI").is_err());
    }

    #[test]
    fn test_resolve_numeric_name_when_no_such_id() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let numeric = store
            .get_or_create_specification(&NewSpecification::new("2024", "1.0"))
            .unwrap();

        assert_eq!(resolve_specification(&store, "2024").unwrap(), numeric);
        assert_eq!(
            resolve_specification(&store, &numeric.id.to_string()).unwrap(),
            numeric
        );
        assert!(resolve_specification(&store, "999").is_err());
    }
}
