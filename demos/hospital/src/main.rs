//! hospital — drive a patient-flow simulation from a JSON run file.
//!
//! ```text
//! hospital [run.json]
//! ```
//!
//! Without an argument the built-in defaults run: 30 specialists, 20
//! patients/hour, one simulated year, CSV output under `output/hospital`.
//! The simulation runs on a background thread; the main thread polls its
//! published counters and logs progress.  `RUST_LOG` controls verbosity.

mod config;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use hs_core::{MINUTES_PER_DAY, SimTime};
use hs_kernel::load_roster_csv;
use hs_output::CsvRecorder;
use hs_sim::{MemoryRecorder, Recorder, RunOutcome, SharedCounters, Simulation, SimulationBuilder, StopHandle};
use hs_trajectory::{BaseStatistics, EnsembleRunner};

use config::{Action, Backend, RunFile, timeline};

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_RUN_FILE: &str = "demos/hospital/run.json";

// ── Simulation thread ─────────────────────────────────────────────────────────

/// Run through every scheduled action, then to the horizon.
fn simulate<R: Recorder>(mut sim: Simulation<R>, run: &RunFile) -> Result<Simulation<R>> {
    let origin = sim.now();
    let horizon = origin.after(run.horizon_days * MINUTES_PER_DAY);

    for (at, action) in timeline(run, origin) {
        if at > horizon {
            break;
        }
        if sim.run_until(at)? == RunOutcome::Stopped {
            sim.shutdown();
            return Ok(sim);
        }
        match action {
            Action::Event(e) => {
                let id = sim.add_event(e.kind, &e.params, e.duration_days * MINUTES_PER_DAY)?;
                log::info!("day {:.1}: {} event {id} for {} days", at.days(), e.kind, e.duration_days);
            }
            Action::Change(c) => {
                sim.update_parameters(c.arrival_rate, c.num_doctors)?;
            }
        }
    }

    sim.run(horizon)?;
    Ok(sim)
}

// ── Driver ────────────────────────────────────────────────────────────────────

fn drive<R: Recorder + Send + 'static>(run: RunFile, recorder: R) -> Result<()> {
    let counters = SharedCounters::new();
    let stop = StopHandle::new();

    let mut builder = SimulationBuilder::new(run.sim.clone(), recorder)
        .shared_counters(counters.clone())
        .stop_handle(stop.clone());
    if let Some(path) = &run.roster {
        builder = builder.roster(load_roster_csv(path)?);
    }
    if let Some(id) = run.resume {
        builder = builder.resume(id);
    }
    let sim = builder.build()?;
    println!(
        "{}: {} specialists, {:.1} patients/hour, day {:.1} → day {:.1}",
        sim.id(),
        sim.fleet().active_count(),
        sim.arrival_rate(),
        sim.now().days(),
        sim.now().days() + run.horizon_days
    );

    let poll = Duration::from_millis(run.poll_interval_ms.max(10));
    let wall_limit = run.max_wall_seconds.map(Duration::from_secs);
    let t0 = Instant::now();

    let worker = thread::Builder::new()
        .name("simulation".into())
        .spawn(move || simulate(sim, &run).map(|sim| (sim, run)))?;

    while !worker.is_finished() {
        thread::sleep(poll);
        let r = counters.read();
        log::info!(
            "day {:>7.2} | created {:>8} | treated {:>8} | busy {:>3} | waiting {:>5}",
            r.clock.days(),
            r.created,
            r.treated,
            r.busy,
            r.waiting
        );
        if wall_limit.is_some_and(|limit| t0.elapsed() >= limit) && !stop.is_requested() {
            log::warn!("wall-clock limit reached; stopping at the next event boundary");
            stop.request_stop();
        }
    }
    let (mut sim, run) = worker.join().map_err(|_| anyhow!("simulation thread panicked"))??;

    // Summary.
    println!("Simulation complete in {:.3} s", t0.elapsed().as_secs_f64());
    println!("  clock           : day {:.2}", sim.now().days());
    println!("  patients created: {}", sim.patients_total());
    println!("  patients treated: {}", sim.patients_treated());
    println!("  still waiting   : {}", sim.waiting_count());
    println!("  checkpoints     : {}", sim.checkpoints().written());
    if sim.write_failures() > 0 {
        eprintln!("  recorder write failures: {}", sim.write_failures());
    }
    println!();
    println!("{:<20} {:>10}", "Condition", "Treated");
    println!("{}", "-".repeat(31));
    for (condition, n) in &sim.history().completions_by_condition {
        println!("{:<20} {:>10}", condition.name(), n);
    }

    if let Some(ensemble) = run.ensemble {
        let base = BaseStatistics::from_simulation(&sim);
        let report = EnsembleRunner::new(ensemble).run(&base, sim.recorder_mut())?;
        println!();
        println!(
            "Ensemble: {} members, mean final treated {:.1}",
            report.members.len(),
            report.mean_final_treated()
        );
    }
    Ok(())
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let run = match std::env::args().nth(1) {
        Some(path) => RunFile::load(Path::new(&path))?,
        None if Path::new(DEFAULT_RUN_FILE).exists() => RunFile::load(Path::new(DEFAULT_RUN_FILE))?,
        None => {
            let run = RunFile::default();
            run.validate()?;
            run
        }
    };

    match run.backend {
        Backend::Csv => {
            let recorder = CsvRecorder::open(&run.output_dir)?;
            drive(run, recorder)
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let recorder = hs_output::SqliteRecorder::open(&run.output_dir)?;
            drive(run, recorder)
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(anyhow!("the sqlite backend needs the `sqlite` feature")),
        Backend::Memory => drive(run, MemoryRecorder::new()),
    }
}
