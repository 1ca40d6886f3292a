//! Relic 命令行入口
//!
//! 载入种子与偏好设置，推导到指定深度，打印各层统计并可选地执行一次捕捉查询。

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use relic_core::prelude::*;
use relic_file::{JsonPreferenceStore, SeedFile};

/// Relic - derive relevant points, lines and circles from reference points
#[derive(Parser, Debug)]
#[command(name = "relic")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Seed document exported by relic-file
    #[arg(short, long)]
    seeds: PathBuf,

    /// Preferences file (.json or binary)
    #[arg(short, long)]
    preferences: Option<PathBuf>,

    /// Inception level, overrides the preferences
    #[arg(short, long)]
    depth: Option<i64>,

    /// Snap query position as "x,y"
    #[arg(long, value_parser = parse_point)]
    snap: Option<Point2>,

    /// Save the effective preferences back to the preferences file
    #[arg(long)]
    save: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_point(s: &str) -> Result<Point2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{}\"", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("invalid x: {}", e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("invalid y: {}", e))?;
    Ok(Point2::new(x, y))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(level).finish())?;

    info!("Starting Relic v{}", env!("CARGO_PKG_VERSION"));

    let seed_file = SeedFile::new(&cli.seeds);
    seed_file
        .read()
        .with_context(|| format!("failed to read seeds from {}", cli.seeds.display()))?;

    let mut context = EngineContext::new(seed_file);
    if let Some(path) = &cli.preferences {
        context = context.with_store(JsonPreferenceStore::new(path));
    }

    let mut engine = RelevanceEngine::new(EngineConfig::default(), relic_core::default_generators(), context)?;
    let report = engine.load_preferences()?;
    if report.faults > 0 {
        info!("{} generator faults while applying preferences", report.faults);
    }

    if let Some(depth) = cli.depth {
        let report = engine.set_inception_level(depth)?;
        info!("Depth {}: {} created, {} merged", depth, report.created, report.merged);
    }

    print_stats(engine.graph());

    if let Some(point) = cli.snap {
        match engine.snap(point) {
            Some(snap) => {
                let object = engine
                    .graph()
                    .object(snap.object)
                    .ok_or_else(|| anyhow!("snapped object {} vanished", snap.object))?;
                println!(
                    "snap ({}, {}) -> {} {} in layer {} at ({:.3}, {:.3}), distance {:.3}, time {:.3}",
                    point.x,
                    point.y,
                    object.kind().name(),
                    snap.object,
                    snap.layer,
                    snap.point.x,
                    snap.point.y,
                    snap.distance,
                    object.time()
                );
            }
            None => println!("snap ({}, {}) -> nothing within range", point.x, point.y),
        }
    }

    if cli.save {
        engine.save_preferences()?;
        info!("Preferences saved");
    }

    Ok(())
}

fn print_stats(graph: &LayerCollection) {
    println!("layer  points  lines  circles  refs  total");
    for stats in graph.stats() {
        println!(
            "{:>5}  {:>6}  {:>5}  {:>7}  {:>4}  {:>5}",
            stats.depth,
            stats.count_of(ObjectKind::Point),
            stats.count_of(ObjectKind::Line),
            stats.count_of(ObjectKind::Circle),
            stats.count_of(ObjectKind::Reference),
            stats.total()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5, -2").unwrap(), Point2::new(1.5, -2.0));
        assert!(parse_point("3").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["relic", "--seeds", "seeds.json", "--depth", "3", "--snap", "10,20", "-v"])
            .unwrap();
        assert_eq!(cli.depth, Some(3));
        assert_eq!(cli.snap, Some(Point2::new(10.0, 20.0)));
        assert!(cli.verbose);
        assert!(cli.preferences.is_none());
    }
}
