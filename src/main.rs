use clap::{Parser, Subcommand};
use colored::Colorize;
use notelink::report::{stars, Priority};
use notelink::{extract_keywords, Config, DocumentStore, Report, TagReport, VaultStore};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// notelink - Find related notes in a markdown vault
#[derive(Parser)]
#[command(name = "notelink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".notelink.toml")]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find notes related to a source note
    Related {
        /// Source note (vault-relative path, path on disk, or note name)
        file: String,

        /// Vault root directory
        #[arg(long, default_value = ".")]
        vault: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the keyword profile of a note
    Keywords {
        /// Note (vault-relative path, path on disk, or note name)
        file: String,

        /// Vault root directory
        #[arg(long, default_value = ".")]
        vault: PathBuf,

        /// Maximum keywords to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze tag usage across the vault
    Tags {
        /// Vault root directory
        #[arg(long, default_value = ".")]
        vault: PathBuf,

        /// Ignore tags used fewer times than this
        #[arg(long)]
        min_count: Option<usize>,

        /// Similarity ratio (0.0-1.0) for reporting near-duplicate tags
        #[arg(long)]
        threshold: Option<f32>,

        /// Show merge suggestions for similar tags
        #[arg(long)]
        merges: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Related { file, vault, json } => {
            cmd_related(&file, &vault, json, cli.quiet, &config)
        }
        Commands::Keywords { file, vault, limit, json } => {
            cmd_keywords(&file, &vault, limit, json, &config)
        }
        Commands::Tags { vault, min_count, threshold, merges, json } => {
            cmd_tags(&vault, min_count, threshold, merges, json, cli.quiet, &config)
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,notelink={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_related(
    file: &str,
    vault: &Path,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let store = VaultStore::open(vault, &config.scan)?;
    let report = notelink::scan(&store, file, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("{}", format!("No notes related to {}.", report.source.name).yellow());
        return Ok(());
    }

    if !quiet {
        println!("{} {}\n",
            "Related notes for".green().bold(),
            report.source.name.cyan()
        );
    }

    print_results(&report, config);

    if quiet {
        return Ok(());
    }

    print_buckets(&report, config);
    print_tag_table(&report);

    println!("{}", "Statistics".green().bold());
    println!("  Related notes:    {}", report.total_related.to_string().cyan());
    for priority in [Priority::High, Priority::Medium, Priority::ConsiderLinking] {
        println!("  {:<17} {}",
            format!("{}:", priority),
            report.buckets.get(priority).len().to_string().cyan()
        );
    }
    println!("  Time elapsed:     {:.2?}", start.elapsed());

    Ok(())
}

fn print_results(report: &Report, config: &Config) {
    for (i, result) in report.results.iter().enumerate() {
        let rating = "★".repeat(stars(result.score, &config.report) as usize);
        println!("{:>3}. {} {} {}",
            i + 1,
            result.candidate.name.cyan().bold(),
            format!("({})", result.candidate.path).dimmed(),
            rating.yellow()
        );
        println!("     Score:   {}", result.score.to_string().green());
        println!("     Type:    {}", result.note_type);

        let reasons: Vec<String> = result.reasons.iter().map(|r| r.to_string()).collect();
        println!("     Reasons: {}", reasons.join(" • "));

        if !result.tags.is_empty() {
            let tags: Vec<&str> = result.tags.iter().take(5).map(String::as_str).collect();
            println!("     Tags:    {}", tags.join(", ").dimmed());
        }
        println!();
    }

    if report.total_related > report.results.len() {
        println!("{}\n", format!("... and {} more", report.total_related - report.results.len()).dimmed());
    }
}

fn print_buckets(report: &Report, config: &Config) {
    let thresholds = &config.report;
    let sections = [
        (Priority::High, format!("Score > {}", thresholds.high_above)),
        (Priority::Medium, format!("Score {}-{}", thresholds.medium_from, thresholds.high_above)),
        (
            Priority::ConsiderLinking,
            format!("Score {}-{}", thresholds.low_from, thresholds.medium_from.saturating_sub(1)),
        ),
    ];

    for (priority, range) in sections {
        println!("{} {}", priority.label().green().bold(), format!("({})", range).dimmed());
        let entries = report.buckets.get(priority);
        if entries.is_empty() {
            println!("  - None");
        }
        for entry in entries {
            println!("  - {} - Score: {}", entry.name.cyan(), entry.score);
        }
        println!();
    }
}

fn print_tag_table(report: &Report) {
    println!("{}", "Most Common Tags".green().bold());
    if report.tag_table.is_empty() {
        println!("  - None");
    }
    for tag in &report.tag_table {
        let bar = "=".repeat(tag.count.min(40));
        println!("  {:>20} {:>4} {}", tag.tag.cyan(), tag.count, bar.dimmed());
    }
    println!();
}

fn cmd_keywords(
    file: &str,
    vault: &Path,
    limit: Option<usize>,
    json: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = VaultStore::open(vault, &config.scan)?;
    let doc_ref = store
        .resolve(file)?
        .ok_or_else(|| format!("Note not in vault: {}", file))?;
    let doc = store.snapshot(&doc_ref)?;

    let limit = limit.unwrap_or(config.scoring.max_keywords);
    let keywords = extract_keywords(doc.body(), limit);

    let mut links: Vec<&String> = doc.links.iter().collect();
    links.sort();

    if json {
        let output = serde_json::json!({
            "path": doc.path,
            "name": doc.name,
            "type": doc.metadata.note_type,
            "tags": doc.metadata.tags,
            "links": links,
            "keywords": keywords,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}\n", "Keywords for".green().bold(), doc.name.cyan());
    if keywords.is_empty() {
        println!("{}", "No keywords found.".yellow());
    }
    for (rank, keyword) in keywords.as_slice().iter().enumerate() {
        println!("  {:>3}. {}", rank + 1, keyword);
    }

    println!();
    println!("  Type:             {}", doc.metadata.note_type.as_deref().unwrap_or("note"));
    println!("  Tags:             {}", doc.metadata.tags.join(", ").cyan());
    println!("  Outgoing links:   {}", links.len().to_string().cyan());

    Ok(())
}

fn cmd_tags(
    vault: &Path,
    min_count: Option<usize>,
    threshold: Option<f32>,
    merges: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let mut tag_config = config.tags.clone();
    if let Some(min) = min_count {
        tag_config.min_count = min;
    }
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!("threshold must be between 0.0 and 1.0, got {}", threshold).into());
        }
        tag_config.similarity_threshold = threshold;
    }

    let store = VaultStore::open(vault, &config.scan)?;
    let report = notelink::scan_tags(&store, &tag_config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.unique_tags == 0 {
        println!("{}", "No tags found.".yellow());
        return Ok(());
    }

    if !quiet {
        println!("{}", "Tag Overview".green().bold());
        println!("  Notes scanned:      {}", report.notes_scanned.to_string().cyan());
        println!("  Unique tags:        {}", report.unique_tags.to_string().cyan());
        println!("  Total occurrences:  {}", report.total_occurrences.to_string().cyan());
        println!("  Average per tag:    {:.1}", report.average_per_tag);
        println!("  Orphan tags:        {}", report.orphans.len().to_string().cyan());
        println!("  Hierarchical tags:  {}", report.hierarchy.nested.len().to_string().cyan());
        println!("  Max depth:          {}\n", report.hierarchy.max_depth);
    }

    println!("{}", "Most Used Tags".green().bold());
    for (i, tag) in report.most_common.iter().enumerate() {
        let share = tag.count as f64 * 100.0 / report.total_occurrences as f64;
        println!("{:>4}. {:<30} {:>5} {}",
            i + 1,
            tag.tag.cyan(),
            tag.count,
            format!("{:.1}%", share).dimmed()
        );
    }
    println!();

    if quiet {
        return Ok(());
    }

    if !report.least_common.is_empty() {
        println!("{}", "Least Used Tags".green().bold());
        for tag in &report.least_common {
            println!("  {:<30} {:>5}", tag.tag.cyan(), tag.count);
        }
        println!();
    }

    print_hierarchy(&report);
    print_similar_tags(&report, merges);

    if !report.orphans.is_empty() {
        println!("{} {}",
            "Orphan Tags".green().bold(),
            format!("(used once: {})", report.orphans.len()).dimmed()
        );
        let rows: Vec<&[String]> = report.orphans.chunks(5).collect();
        for row in rows.iter().take(10) {
            println!("  - {}", row.join(", "));
        }
        if rows.len() > 10 {
            println!("  {}", format!("... and {} more groups", rows.len() - 10).dimmed());
        }
        println!();
    }

    println!("{}", "Tags by Category".green().bold());
    for category in &report.categories {
        println!("  {} {}", category.name.cyan().bold(), format!("({} uses)", category.total).dimmed());
        for tag in &category.tags {
            println!("      {:<28} {:>5}", tag.tag, tag.count);
        }
    }
    println!();

    println!("  Time elapsed:       {:.2?}", start.elapsed());

    Ok(())
}

fn print_hierarchy(report: &TagReport) {
    println!("{}", "Root Tags".green().bold());
    for root in &report.hierarchy.roots {
        println!("  {:<30} {:>5}  {}",
            root.tag.cyan(),
            root.count,
            format!("{} children", root.children).dimmed()
        );
    }
    println!();

    let missing = &report.hierarchy.missing_parents;
    if !missing.is_empty() {
        println!("{} {}",
            "Missing Parent Tags".yellow().bold(),
            format!("({})", missing.len()).dimmed()
        );
        for gap in missing.iter().take(20) {
            println!("  {} {} {}", gap.tag.cyan(), "needs".dimmed(), gap.parent);
        }
        println!();
    }
}

fn print_similar_tags(report: &TagReport, merges: bool) {
    if report.similar.is_empty() {
        return;
    }

    println!("{} {}",
        "Similar Tags".green().bold(),
        format!("({} pairs)", report.similar.len()).dimmed()
    );
    for pair in report.similar.iter().take(20) {
        println!("  {} ~ {} {}",
            pair.first.cyan(),
            pair.second.cyan(),
            format!("({:.1}%)", pair.similarity * 100.0).dimmed()
        );
    }
    println!();

    if !merges {
        return;
    }

    println!("{}", "Merge Suggestions".green().bold());
    for suggestion in report.merges.iter().take(15) {
        println!("  keep {} <- {} {}",
            suggestion.keep.cyan().bold(),
            suggestion.merge,
            format!("({:.1}%, {} uses)", suggestion.similarity * 100.0, suggestion.total_count).dimmed()
        );
    }
    println!();
}
