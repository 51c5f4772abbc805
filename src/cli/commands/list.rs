//! List command - show cached tokens

use crate::cacher::Cacher;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::ArtcacheResult;
use crate::index::{Index, Vars};
use crate::store::ContentHash;
use crate::token::{Token, TokenHash};
use crate::ui::{self, Status, UiContext};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct Row<'a> {
    hash: &'a TokenHash,
    token: &'a Token,
    vars: Vars,
    files: &'a [ContentHash],
}

/// Execute the list command
pub fn execute(args: ListArgs, config: &Config) -> ArtcacheResult<()> {
    let cacher = Cacher::from_config(config)?;
    let index = cacher.index();

    let rows = collect_rows(index, args.all)?;

    if rows.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step(&ctx, Status::Info, "No cached tokens");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.hash);
            }
        }
    }

    Ok(())
}

fn collect_rows(index: &Index, all: bool) -> ArtcacheResult<Vec<Row<'_>>> {
    index
        .tokens()
        .filter(|(_, token)| all || token.is_current())
        .map(|(hash, token)| {
            Ok(Row {
                hash,
                token,
                vars: index.get_vars(hash)?,
                files: index.get_hashes(hash)?,
            })
        })
        .collect()
}

fn print_table(rows: &[Row<'_>]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Cached tokens");

    println!(
        "{:<10} {:<10} {:<8} {:<17} {}",
        style("HASH").bold(),
        style("KIND").bold(),
        style("FILES").bold(),
        style("CHECKED").bold(),
        style("TOKEN").bold()
    );
    println!("{}", "-".repeat(80));

    for row in rows {
        let checked = row
            .vars
            .last_checked
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        let kind = if row.token.is_current() {
            style(row.token.kind().to_string()).green()
        } else {
            style(row.token.kind().to_string()).dim()
        };

        println!(
            "{:<10} {:<10} {:<8} {:<17} {}",
            row.hash.short(),
            kind,
            row.files.len(),
            checked,
            row.token
        );
    }

    println!();
    println!("{} token(s)", rows.len());
}
