use crate::config::RunMode;
use crate::report::{Summary, aircraft_rows, airspace_rows, passenger_trip_rows, vehicle_trip_rows, vertiport_rows};
use crate::scenario::Scenario;
use crate::simulation::Simulation;
use crate::time::Time;
use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::LevelFilter;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tabled::settings::Style;
use tabled::{Table, Tabled};

mod aircraft;
mod airspace;
mod battery;
mod charger;
mod config;
mod error;
mod events;
mod geo;
mod mission;
mod network;
mod passenger;
mod record;
mod report;
mod scenario;
mod scheduler;
mod simulation;
mod time;
mod vertiport;

#[derive(Parser)]
struct Args {
    /// Path to the JSON scenario file
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    scenario: PathBuf,
    /// Directory the trip, distribution and event logs are written to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Run to the end, print a summary and exit
    #[arg(short, long)]
    batch: bool,
    /// Track positions in 10 s steps instead of whole legs
    #[arg(long)]
    visual: bool,
    /// Override the configured end time, in seconds
    #[arg(long, value_name = "SECS")]
    end_time: Option<u64>,
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

fn paginate(content: String) {
    let pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());

    let Ok(mut pager) = pager else {
        println!("{}", content);
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

fn print_table<T: Tabled>(rows: &[T], empty: &str) {
    if rows.is_empty() {
        println!("{}", empty);
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn export(sim: &Simulation, dir: &Path) {
    match sim.log.export(dir) {
        Ok(()) => println!("{}", format!("Logs written to {}", dir.display()).green()),
        Err(e) => println!("{}", format!("Export failed: {}", e).red()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .init();

    let mut scenario = Scenario::load_from_file(&args.scenario)?;
    if args.visual {
        scenario.config.run_mode = RunMode::Visual;
    }
    if let Some(end_time) = args.end_time {
        scenario.config.end_time = Time(end_time);
    }
    let mut sim = scenario.into_simulation()?;

    if args.batch {
        sim.run()?;
        println!("{}", Summary::new(sim.now(), &sim.network, &sim.log));
        if let Some(dir) = &args.output {
            sim.log.export(dir)?;
        }
        return Ok(());
    }

    sim.fast_forward()?;
    println!(
        "{}",
        format!(
            "Vertiport network online at {}. Loaded {} vertiports and {} aircraft from {}",
            sim.now(),
            sim.network.vertiports.len(),
            sim.network.aircraft.len(),
            args.scenario.display()
        )
        .green()
    );

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: vec![
            "run".to_string(),
            "step".to_string(),
            "ls".to_string(),
            "trips".to_string(),
            "state".to_string(),
            "export".to_string(),
            "help".to_string(),
            "exit".to_string(),
        ],
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    let mut halted: Option<String> = None;

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "run" | "step" => {
                        if let Some(reason) = &halted {
                            println!("{}", format!("Simulation halted: {}", reason).red());
                            continue;
                        }
                        let result = if parts[0] == "run" {
                            sim.run()
                        } else if let Some(secs) = parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                            sim.run_until(sim.now() + secs)
                        } else {
                            println!("Usage: step <seconds>");
                            continue;
                        };
                        match result {
                            Ok(()) if sim.is_finished() => {
                                println!("{}", "Simulation complete.".green());
                                println!("{}", Summary::new(sim.now(), &sim.network, &sim.log));
                            }
                            Ok(()) => println!("{}", format!("Clock at {}", sim.now()).green()),
                            Err(e) => {
                                println!("{}", format!("{}: {}", sim.now(), e).red());
                                halted = Some(e.to_string());
                            }
                        }
                    }
                    "ls" => match parts.get(1).copied().unwrap_or("a") {
                        "v" | "vertiports" => print_table(&vertiport_rows(&sim.network), "No vertiports."),
                        "s" | "airspaces" => print_table(&airspace_rows(&sim.network), "No airspaces."),
                        _ => print_table(&aircraft_rows(&sim.network), "No aircraft."),
                    },
                    "trips" => match parts.get(1).copied().unwrap_or("p") {
                        "v" | "vehicles" => print_table(
                            &vehicle_trip_rows(&sim.log.vehicle_trips),
                            &"No completed flights yet.".yellow().to_string(),
                        ),
                        _ => print_table(
                            &passenger_trip_rows(&sim.log.passenger_trips),
                            &"No completed journeys yet.".yellow().to_string(),
                        ),
                    },
                    "state" => match serde_json::to_string_pretty(&sim.current_state()) {
                        Ok(json) => println!("{}", json),
                        Err(e) => println!("{}", format!("Error: {}", e).red()),
                    },
                    "export" => match parts.get(1).map(|p| PathBuf::from(*p)).or_else(|| args.output.clone()) {
                        Some(dir) => export(&sim, &dir),
                        None => println!("Usage: export <dir>"),
                    },
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  run                 - Run the simulation to the end");
                        println!("  step <s>            - Advance the clock by <s> seconds");
                        println!("  ls [kind]           - List a - aircraft (default), v - vertiports, s - airspaces");
                        println!("  trips [kind]        - List completed trips: p - passengers (default), v - vehicles");
                        println!("  state               - Print flying aircraft as JSON");
                        println!("  export <dir>        - Write trip, distribution and event logs to <dir>");
                        println!("  help / ?            - Show this help menu");
                        println!("  exit / quit         - Exit the simulator\n");
                    }
                    "exit" | "quit" => break,
                    _ => println!("{}", format!("Unknown command: {}", parts[0]).yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(dir) = &args.output {
        export(&sim, dir);
    }
    Ok(())
}
