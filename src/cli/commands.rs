use crate::config::{load_config, PrepConfig};
use crate::core::{Pipeline, RunSummary};
use crate::error::PrepResult;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the run command
pub fn run(
    config_path: PathBuf,
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    dry_run: bool,
    json: bool,
) -> PrepResult<()> {
    let config = load_config(&config_path)?;
    let input = input.unwrap_or_else(|| config.input.clone());
    let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());

    if !json {
        println!("{}", "💊 Overdose prep - Reshaping workbook".bold().green());
        println!("   Config: {}", config_path.display());
        println!("   Input:  {}", input.display());
        if dry_run {
            println!(
                "{}",
                "📋 DRY RUN MODE - No files will be written".yellow()
            );
        } else {
            println!("   Output: {}", output_dir.display());
        }
        println!();
    }

    let pipeline = Pipeline::new(config);
    let summary = if dry_run {
        pipeline.dry_run(&input)?
    } else {
        pipeline.run(&input, &output_dir)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Execute the check command - validate configuration only
pub fn check(config_path: PathBuf) -> PrepResult<()> {
    println!("{}", "✅ Checking configuration".bold().green());
    println!("   File: {}\n", config_path.display());

    let config = load_config(&config_path)?;
    print_config(&config);

    println!("\n{}", "✅ Configuration is valid".bold().green());
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "✅ Tables built:".bold().green());
    println!("   overall      {} rows", summary.overall_rows);
    println!("   specific     {} rows", summary.specific_rows);
    println!("   demographic  {} rows", summary.demographic_rows);

    if !summary.written.is_empty() {
        println!("\n{}", "💾 Written:".bold().cyan());
        for path in &summary.written {
            println!("   {}", path.display().to_string().bright_blue());
        }
    }
}

fn print_config(config: &PrepConfig) {
    for plan in &config.populations {
        let rows = config
            .region(&plan.counts)
            .map(|r| r.indices.len())
            .unwrap_or(0);
        println!(
            "   {} {} + {} ({} keys)",
            "📊".bold(),
            plan.counts.bright_blue(),
            plan.rates.bright_blue(),
            rows
        );
        println!("      population: {}", plan.population.label().cyan());
    }
    let demographic_rows = config
        .region(&config.demographic)
        .map(|r| r.indices.len())
        .unwrap_or(0);
    println!(
        "   {} {} ({} keys)",
        "📐".bold(),
        config.demographic.bright_blue(),
        demographic_rows
    );
}
