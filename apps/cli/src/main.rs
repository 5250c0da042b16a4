#![deny(warnings)]

//! Headless driver for the career engine: create careers, play matchdays and print tables.

use anyhow::{bail, Context, Result};
use league_core::{Career, CareerId, PlayerId};
use league_runtime::{CareerConfig, CareerEngine, EngineConfig, MatchSummary};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: touchline [--saves DIR] [--demo] [--config FILE] <command>

commands:
  new                  create a career and print its id
  list                 list saved careers
  dump <id>            print a career as JSON
  start <id>           start (or roll over to) the next season
  play <id> [n]        play the next n matchdays (default 1)
  season <id>          play the rest of the season and end it
  end <id>             end the season
  table <id>           print the league tables
  train <id> <player>  book form training for a player of the managed club
  save <id> <name>     copy a career into a named slot
  delete <id>          delete a career
  version              print build information

With --demo and no command a whole season is generated and played in memory.";

#[derive(Debug, Default)]
struct Args {
    saves: Option<PathBuf>,
    demo: bool,
    config: Option<PathBuf>,
    command: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--saves" => args.saves = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--demo" => args.demo = true,
            _ => args.command.push(arg),
        }
    }
    args
}

fn engine_config(args: &Args) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Ok(dir) = std::env::var("FM_SAVE_DIR") {
        config.save_dir = dir.into();
    }
    if let Some(dir) = &args.saves {
        config.save_dir = dir.clone();
    }
    config.demo = args.demo;
    config
}

fn career_config(args: &Args) -> Result<CareerConfig> {
    match &args.config {
        Some(path) => CareerConfig::load(path)
            .with_context(|| format!("reading career config {}", path.display())),
        None => Ok(CareerConfig::default()),
    }
}

fn career_arg(command: &[String]) -> Result<CareerId> {
    match command.get(1) {
        Some(id) => Ok(CareerId::from(id.as_str())),
        None => bail!("missing career id\n\n{USAGE}"),
    }
}

fn print_match(m: &MatchSummary) {
    let shootout = m
        .penalties
        .map(|(h, a)| format!(" ({h}-{a} pens)"))
        .unwrap_or_default();
    println!(
        "{} {:?} | {} {}-{} {}{}",
        m.date, m.competition, m.home_name, m.home_goals, m.away_goals, m.away_name, shootout
    );
}

fn print_tables(engine: &CareerEngine, id: &CareerId) -> Result<()> {
    for d in engine.standings(id, None)? {
        println!("\n{} (level {})", d.name, d.level);
        println!(
            "{:>3} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4}",
            "#", "Club", "P", "W", "D", "L", "GF", "GA", "Pts"
        );
        for (i, r) in d.rows.iter().enumerate() {
            println!(
                "{:>3} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4}",
                i + 1,
                r.name,
                r.played,
                r.won,
                r.drawn,
                r.lost,
                r.goals_for,
                r.goals_against,
                r.points
            );
        }
    }
    Ok(())
}

/// Play matchdays until nothing is scheduled. Returns the number of matches played.
fn play_rest(engine: &CareerEngine, id: &CareerId) -> Result<usize> {
    let mut played = 0;
    loop {
        let day = engine.play_next_matchday(id)?;
        if day.played.is_empty() {
            return Ok(played);
        }
        played += day.played.len();
    }
}

fn end_season(engine: &CareerEngine, id: &CareerId) -> Result<()> {
    let report = engine.end_season(id)?;
    let career = engine.dump(id)?;
    let names = |clubs: &[league_core::ClubId]| {
        clubs
            .iter()
            .map(|c| career.graph.club_name(*c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("Season {} ended", report.season);
    for d in &report.divisions {
        if let Some(champion) = d.champion {
            println!("  {} champions: {}", d.name, career.graph.club_name(champion));
        }
    }
    if let Some(winner) = report.cup_winner {
        println!("  cup winner: {}", career.graph.club_name(winner));
    }
    println!("  promoted: {}", names(&report.promoted));
    println!("  relegated: {}", names(&report.relegated));
    Ok(())
}

fn print_career(career: &Career) {
    let managed = career
        .meta
        .managed_club
        .map(|c| career.graph.club_name(c))
        .unwrap_or_else(|| "-".into());
    println!(
        "{} | {} | season {} | managed: {} | revision {}",
        career.meta.id, career.meta.name, career.graph.season.number, managed, career.meta.revision
    );
}

fn run_demo(engine: &CareerEngine, config: &CareerConfig) -> Result<()> {
    let career = engine.new_career(config)?;
    let id = career.meta.id.clone();
    print_career(&career);
    let start = engine.start_season(&id)?;
    println!("Season {} starts {}", start.season, start.start_date);
    let played = play_rest(engine, &id)?;
    println!("{played} matches played");
    print_tables(engine, &id)?;
    end_season(engine, &id)
}

fn run(engine: &CareerEngine, args: &Args) -> Result<()> {
    let command = &args.command;
    let Some(name) = command.first() else {
        if args.demo {
            return run_demo(engine, &career_config(args)?);
        }
        bail!("{USAGE}");
    };
    match name.as_str() {
        "new" => print_career(&*engine.new_career(&career_config(args)?)?),
        "list" => {
            for s in engine.list_careers()? {
                println!(
                    "{} | {} | season {} | revision {} | saved {}",
                    s.id, s.name, s.season, s.revision, s.saved_at
                );
            }
        }
        "dump" => {
            let career = engine.dump(&career_arg(command)?)?;
            println!("{}", serde_json::to_string_pretty(&*career)?);
        }
        "start" => {
            let start = engine.start_season(&career_arg(command)?)?;
            println!(
                "Season {} starts {} with {} fixtures",
                start.season, start.start_date, start.fixtures
            );
        }
        "play" => {
            let id = career_arg(command)?;
            let n: u32 = match command.get(2) {
                Some(n) => n.parse().with_context(|| format!("bad matchday count '{n}'"))?,
                None => 1,
            };
            for _ in 0..n {
                let day = engine.play_next_matchday(&id)?;
                if day.played.is_empty() {
                    println!("No fixtures left this season");
                    break;
                }
                day.played.iter().for_each(print_match);
            }
        }
        "season" => {
            let id = career_arg(command)?;
            let played = play_rest(engine, &id)?;
            println!("{played} matches played");
            end_season(engine, &id)?;
        }
        "end" => end_season(engine, &career_arg(command)?)?,
        "table" => print_tables(engine, &career_arg(command)?)?,
        "train" => {
            let id = career_arg(command)?;
            let Some(player) = command.get(2) else {
                bail!("missing player id\n\n{USAGE}");
            };
            let player: u32 = player
                .parse()
                .with_context(|| format!("bad player id '{player}'"))?;
            let Some(club) = engine.dump(&id)?.meta.managed_club else {
                bail!("career {id} has no managed club");
            };
            let receipt = engine.start_form_training(&id, club, PlayerId(player))?;
            println!(
                "{} booked for {} (balance {})",
                receipt.order, receipt.player, receipt.balance
            );
        }
        "save" => {
            let id = career_arg(command)?;
            let Some(slot) = command.get(2) else {
                bail!("missing save name\n\n{USAGE}");
            };
            let saved = engine.save(&id, slot)?;
            println!("saved as {} (revision {})", saved.id, saved.revision);
        }
        "delete" => engine.delete_career(&career_arg(command)?)?,
        "version" => println!(
            "touchline {} ({} built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        ),
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let config = engine_config(&args);
    info!(command = ?args.command, demo = config.demo, "starting CLI");
    let engine = CareerEngine::from_config(&config);
    run(&engine, &args)
}
