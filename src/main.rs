use ascent_sim::gnc::GuidancePhase;
use ascent_sim::sim::{RunStatus, Simulation};
use ascent_sim::VehicleConfiguration;

const FRAME: f64 = 0.1;       // s of wall time per tick
const WARP: f64 = 10.0;
const MAX_TIME: f64 = 3000.0; // s
const SAMPLE_EVERY: f64 = 30.0; // s

struct Sample {
    time: f64,
    altitude: f64,
    speed: f64,
    mach: f64,
    mass: f64,
    apoapsis: f64,
    phase: GuidancePhase,
}

fn main() {
    let config = VehicleConfiguration::default();
    let mut sim = Simulation::new(config.clone());
    sim.set_time_warp(WARP);
    sim.launch();

    // -----------------------------------------------------------------------
    // Fly until orbit, failure or timeout
    // -----------------------------------------------------------------------
    let mut samples = Vec::new();
    let mut next_sample = 0.0;
    while sim.state().time < MAX_TIME {
        if sim.state().time >= next_sample {
            let t = sim.telemetry();
            samples.push(Sample {
                time: t.state.time,
                altitude: t.altitude,
                speed: t.speed,
                mach: t.mach,
                mass: t.mass.mass,
                apoapsis: t.orbit.apoapsis,
                phase: t.phase,
            });
            next_sample += SAMPLE_EVERY;
        }
        sim.tick(FRAME);
        if sim.status() == RunStatus::Failed || sim.guidance().phase() == GuidancePhase::OrbitAchieved {
            break;
        }
    }
    let last = sim.telemetry();

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  LAUNCH VEHICLE ASCENT SIMULATION");
    println!("====================================================================");
    println!();
    println!("  Vehicle Parameters");
    println!("  ──────────────────────────────────────────────────────────────────");
    for (i, s) in config.stages.iter().enumerate() {
        println!(
            "  Stage {}:  dry {:>8.0} kg   prop {:>8.0} kg   thrust {:>6.0} kN   Isp {:>3.0}/{:>3.0} s",
            i + 1,
            s.dry_mass,
            s.propellant_mass,
            s.thrust_vac / 1000.0,
            s.isp,
            s.isp_vac
        );
    }
    println!(
        "  Payload:  {:>8.0} kg       Fairing:  {:>8.0} kg",
        config.payload.mass, config.fairing.mass
    );
    println!(
        "  Liftoff:  {:>8.0} kg       Length:   {:>8.1} m",
        config.liftoff_mass(),
        config.total_length()
    );
    println!();

    println!("  Flight Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for e in sim.events() {
        println!("  T+{:>7.1}s   {}", e.time, e.kind);
    }
    println!();

    println!("  Final State");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Status:        {:?} ({})", sim.status(), last.phase);
    println!(
        "  Orbit:         {:>8.1} x {:.1} km   e = {:.5}",
        last.orbit.apoapsis / 1000.0,
        last.orbit.periapsis / 1000.0,
        last.orbit.eccentricity
    );
    println!(
        "  Altitude:      {:>8.1} km      Speed:      {:>8.1} m/s",
        last.altitude / 1000.0,
        last.speed
    );
    println!(
        "  Max-Q:         {:>8.1} kPa     Delta-v left: {:>6.0} m/s",
        last.state.max_q / 1000.0,
        last.remaining_delta_v
    );
    println!("  Flight time:   {:>8.1} s", last.state.time);
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>6}  {:>9}  {:>9}  {}",
        "t (s)", "alt (km)", "vel (m/s)", "Mach", "mass (t)", "apo (km)", "phase"
    );
    println!("  {}", "─".repeat(66));
    for s in &samples {
        println!(
            "  {:>7.1}  {:>9.1}  {:>9.1}  {:>6.2}  {:>9.1}  {:>9.1}  {}",
            s.time,
            s.altitude / 1000.0,
            s.speed,
            s.mach,
            s.mass / 1000.0,
            s.apoapsis / 1000.0,
            s.phase
        );
    }
    println!("====================================================================");
    println!();
}
