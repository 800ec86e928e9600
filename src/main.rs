#![warn(clippy::complexity)]
#![warn(clippy::perf)]
#![warn(clippy::style)]
#![warn(clippy::suspicious)]

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

use rail_sim::models::{LineTemplate, NetworkModel, TrackGraph};
use rail_sim::time::{format_sim_time, minutes_to_seconds, parse_hhmm, parse_weekday, seconds_to_minutes};
use rail_sim::{logging, Simulation, SimulationConfig};

#[derive(Debug, StructOpt)]
#[structopt(name = "rail_sim", about = "Headless rail traffic simulation")]
struct Opt {
    /// Network model JSON
    #[structopt(long, parse(from_os_str))]
    network: PathBuf,

    /// Line templates JSON (array)
    #[structopt(long, parse(from_os_str))]
    lines: PathBuf,

    /// Simulation config JSON, defaults apply when omitted
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Day of week to generate the timetable for
    #[structopt(long, default_value = "mon")]
    weekday: String,

    /// Start of the simulated window (HH:MM)
    #[structopt(long, default_value = "05:00")]
    start: String,

    /// End of the simulated window (HH:MM)
    #[structopt(long, default_value = "09:00")]
    end: String,

    /// Tick length in seconds
    #[structopt(long, default_value = "1.0")]
    step: f64,

    /// Station id whose departures for the following hour are printed at the end
    #[structopt(long)]
    board: Option<String>,
}

fn load_lines(path: &Path) -> Result<Vec<LineTemplate>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing line templates in {}", path.display()))
}

fn main() -> Result<()> {
    logging::init();
    let opt = Opt::from_args();

    let config = match &opt.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    let weekday = parse_weekday(&opt.weekday).ok_or_else(|| anyhow!("Unknown weekday {}", opt.weekday))?;
    let start = parse_hhmm(&opt.start).with_context(|| format!("invalid start time {}", opt.start))?;
    let end = parse_hhmm(&opt.end).with_context(|| format!("invalid end time {}", opt.end))?;
    if opt.step <= 0.0 {
        bail!("Step must be positive, got {}", opt.step);
    }

    let model = NetworkModel::from_json_file(&opt.network)?;
    let graph = TrackGraph::build(&model)?;
    info!(
        "Network: {} nodes, {} tracks",
        graph.node_count(),
        graph.track_count()
    );

    let mut sim = Simulation::new(graph, config);
    for line in load_lines(&opt.lines)? {
        sim.register_line(line)?;
    }
    let services = sim.generate_day(weekday);
    info!("{services} services on {weekday}");

    sim.set_time(minutes_to_seconds(start));
    let end_s = minutes_to_seconds(end);
    let report_every = 15.0 * 60.0;
    let mut next_report = sim.now() + report_every;
    while sim.now() + opt.step <= end_s {
        sim.tick(opt.step);
        if sim.now() >= next_report {
            info!(
                "{}: {} trains running",
                format_sim_time(sim.now()),
                sim.registry().len()
            );
            next_report += report_every;
        }
    }

    println!("Trains at {}:", format_sim_time(sim.now()));
    for snapshot in sim.snapshots() {
        println!(
            "  {:<4} {:<12} {:<12} {:>5.0} km/h  delay {:>4.0}s  load {}/{}  next {}",
            snapshot.id,
            snapshot.train_number,
            snapshot.state.as_str(),
            snapshot.speed_kmh,
            snapshot.delay_s,
            snapshot.passengers,
            snapshot.capacity,
            snapshot
                .next_station
                .as_deref()
                .map_or("-", |s| sim.station_name(s)),
        );
    }

    if let Some(station) = &opt.board {
        let from = seconds_to_minutes(sim.now());
        println!("Departures from {}:", sim.station_name(station));
        for row in sim.departure_board(station, from, from + 60) {
            println!("  {}", row.display());
        }
    }
    Ok(())
}
