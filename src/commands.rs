//! Command handlers for the recollect CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use recollect::{
    Category, CategoryBoosts, DEFAULT_SOURCE, DirectorySource, Error, MemoryService,
};

use crate::output::*;

/// Commands supported by the recollect CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a memory, merging into a near-duplicate if one exists
    Store {
        /// Memory text content
        text: String,

        /// decision, preference, code-pattern, error-fix, architecture or other
        #[arg(short = 'c', long, value_parser = parse_category)]
        category: Option<Category>,

        /// Provenance tag
        #[arg(short = 's', long, default_value = DEFAULT_SOURCE)]
        source: String,
    },
    /// Semantic search
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results (default from config)
        #[arg(short = 'l', long)]
        limit: Option<usize>,

        /// Minimum similarity (default from config)
        #[arg(long)]
        min_score: Option<f64>,

        /// Score multiplier for a category, e.g. `decision=2.0` (repeatable)
        #[arg(long = "boost", value_parser = parse_boost)]
        boosts: Vec<(Category, f64)>,
    },
    /// Delete memories semantically close to a query
    Forget {
        query: String,

        /// Minimum similarity for a memory to be deleted
        #[arg(short = 't', long, default_value = "0.8")]
        threshold: f64,
    },
    /// Delete a memory by ID
    Delete { id: String },
    /// Record a relation between two memories
    Link {
        from: String,
        to: String,
        relation: String,
    },
    /// Memories linked to a memory
    Related { id: String },
    /// Store statistics
    Stats,
    /// Index text files under a directory
    Index {
        dir: PathBuf,

        /// Stop after this many files
        #[arg(long, default_value = "5000")]
        max_files: usize,
    },
    /// Show the profile
    Profile,
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse().map_err(|e: Error| e.to_string())
}

fn parse_boost(value: &str) -> Result<(Category, f64), String> {
    let (category, factor) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=FACTOR, got {value:?}"))?;
    let category = parse_category(category)?;
    let factor: f64 = factor
        .trim()
        .parse()
        .map_err(|e| format!("invalid boost factor {factor:?}: {e}"))?;
    Ok((category, factor))
}

/// Execute a CLI command.
pub fn execute(
    command: &Commands,
    service: &mut MemoryService,
    json: bool,
) -> Result<ExitCode, Error> {
    match command {
        Commands::Store {
            text,
            category,
            source,
        } => handle_store(service, text, *category, source, json),
        Commands::Search {
            query,
            limit,
            min_score,
            boosts,
        } => handle_search(service, query, *limit, *min_score, boosts, json),
        Commands::Forget { query, threshold } => handle_forget(service, query, *threshold, json),
        Commands::Delete { id } => handle_delete(service, id, json),
        Commands::Link { from, to, relation } => handle_link(service, from, to, relation, json),
        Commands::Related { id } => handle_related(service, id, json),
        Commands::Stats => handle_stats(service, json),
        Commands::Index { dir, max_files } => handle_index(service, dir, *max_files, json),
        Commands::Profile => handle_profile(service, json),
    }
}

fn handle_store(
    service: &mut MemoryService,
    text: &str,
    category: Option<Category>,
    source: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    let outcome = service.store(text, category, source)?;
    if json {
        print_json(&StoreResponse::new(outcome.id, outcome.is_duplicate));
    } else if outcome.is_duplicate {
        println!("Merged into existing memory: {}", outcome.id);
    } else {
        println!("Stored memory: {}", outcome.id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_search(
    service: &mut MemoryService,
    query: &str,
    limit: Option<usize>,
    min_score: Option<f64>,
    boosts: &[(Category, f64)],
    json: bool,
) -> Result<ExitCode, Error> {
    let results = if boosts.is_empty() {
        service.search(query, limit, min_score)?
    } else {
        if min_score.is_some() {
            tracing::warn!("--min-score is ignored with --boost; using the configured minimum");
        }
        let boosts: CategoryBoosts = boosts.iter().copied().collect();
        service.search_boosted(query, limit, &boosts)?
    };

    if json {
        print_json(&SearchResponse {
            results: results.into_iter().map(SearchResultItem::from).collect(),
        });
    } else if results.is_empty() {
        println!("No matching memories");
    } else {
        for result in results {
            println!(
                "{} [{}] [score: {:.2}]\n  {}\n",
                result.memory.id,
                result.memory.category,
                result.score,
                preview(&result.memory.content, 200)
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_forget(
    service: &mut MemoryService,
    query: &str,
    threshold: f64,
    json: bool,
) -> Result<ExitCode, Error> {
    let count = service.forget_by_query(query, threshold)?;
    if json {
        print_json(&CountResponse {
            status: "forgotten",
            count,
        });
    } else {
        println!("Forgot {count} memory/memories");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_delete(service: &mut MemoryService, id: &str, json: bool) -> Result<ExitCode, Error> {
    let deleted = service.delete(id)?;
    let status = if deleted { "deleted" } else { "not_found" };
    if json {
        print_json(&DeleteResponse {
            status,
            id: id.to_string(),
        });
    } else if deleted {
        println!("Deleted memory: {id}");
    } else {
        println!("No memory with id {id}");
    }
    Ok(if deleted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn handle_link(
    service: &mut MemoryService,
    from: &str,
    to: &str,
    relation: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    let created = service.link(from, to, relation)?;
    if json {
        print_json(&LinkResponse {
            status: if created { "linked" } else { "exists" },
            from: from.to_string(),
            to: to.to_string(),
            relation: relation.to_string(),
        });
    } else if created {
        println!("Linked {from} -[{relation}]-> {to}");
    } else {
        println!("Link already exists");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_related(service: &mut MemoryService, id: &str, json: bool) -> Result<ExitCode, Error> {
    let related = service.related(id)?;
    if json {
        print_json(&RelatedResponse {
            related: related.into_iter().map(RelatedItem::from).collect(),
        });
    } else if related.is_empty() {
        println!("No related memories");
    } else {
        for item in related {
            print!("({}) ", item.relation);
            print_memory_line(&item.memory);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_stats(service: &mut MemoryService, json: bool) -> Result<ExitCode, Error> {
    let stats = service.stats()?;
    if json {
        print_json(&stats);
    } else {
        println!("Memories: {}", stats.total_memories);
        let mut categories: Vec<_> = stats.by_category.iter().collect();
        categories.sort();
        for (category, count) in categories {
            println!("  {category}: {count}");
        }
        println!("Edges: {}", stats.edge_count);
        if let Some(ts) = stats.last_created_at {
            println!("Last stored: {}", format_timestamp(ts));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_index(
    service: &mut MemoryService,
    dir: &std::path::Path,
    max_files: usize,
    json: bool,
) -> Result<ExitCode, Error> {
    let source = DirectorySource::new(dir).with_max_files(max_files);
    let report = service.index_workspace(&source)?;
    if json {
        print_json(&report);
    } else {
        println!(
            "Indexed {} file(s), {} unchanged, {} skipped",
            report.indexed, report.unchanged, report.skipped
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_profile(service: &mut MemoryService, json: bool) -> Result<ExitCode, Error> {
    let profile = service.profile()?;
    if json {
        print_json(&profile);
    } else {
        if profile.summary.is_empty() {
            println!("Summary: (none)");
        } else {
            println!("Summary: {}", profile.summary);
        }
        for fact in &profile.facts {
            println!("  - {fact}");
        }
        println!("Auto-captures: {}", profile.capture_count);
        if profile.updated_at > 0 {
            println!("Updated: {}", format_timestamp(profile.updated_at));
        }
    }
    Ok(ExitCode::SUCCESS)
}
