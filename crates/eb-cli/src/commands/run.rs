use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use eb_core::conserved::QuantityKind;
use eb_core::entity::Scale;
use eb_simulation::{SimEventKind, Simulation, TickReport, genesis_world};

pub struct RunArgs {
    pub ticks: u64,
    pub seed: Option<u64>,
    pub dt: Option<f64>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

pub fn run(args: &RunArgs) -> Result<(), String> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    if let Some(dt) = args.dt {
        config.sim.dt = dt;
    }
    config.sim.validate().map_err(|e| e.to_string())?;

    let seed = config.sim.seed;
    let dt = config.sim.dt;
    let (constants, world) =
        genesis_world(seed).map_err(|e| format!("genesis failed: {e}"))?;

    let mut sim = Simulation::with_laws(world, config.sim, &config.laws);
    sim.initialize()
        .map_err(|e| format!("simulation init failed: {e}"))?;
    let reports = sim.run(args.ticks);
    let failures = failure_counts(&reports);

    if args.json {
        let mut population = serde_json::Map::new();
        for scale in Scale::ALL {
            let (total, active) = scale_counts(&sim, scale);
            if total > 0 {
                population.insert(
                    scale.to_string(),
                    serde_json::json!({ "total": total, "active": active }),
                );
            }
        }
        let doc = serde_json::json!({
            "seed": seed,
            "dt": dt,
            "ticks": args.ticks,
            "genesis": constants,
            "population": population,
            "statistics": sim.statistics(),
            "failures": failures,
            "events": sim.events().len(),
        });
        let text = serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "  {} {}",
        "Simulation".bold(),
        format!("({} ticks, seed={seed}, dt={dt}s)", args.ticks).dimmed()
    );
    println!(
        "  {} entities, {} events logged, ambient {:.1} K",
        sim.world().entity_count(),
        sim.events().len(),
        constants.ambient_temperature
    );
    println!();

    print_population(&sim);
    print_ledger(&sim);
    print_activity(&sim);
    print_failures(&failures);
    Ok(())
}

fn scale_counts(sim: &Simulation, scale: Scale) -> (usize, usize) {
    let entities = sim.world().entities_by_scale(scale);
    let active = entities.iter().filter(|e| e.is_active()).count();
    (entities.len(), active)
}

fn failure_counts(reports: &[TickReport]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for failure in reports.iter().flat_map(|r| &r.failures) {
        *counts.entry(failure.system.clone()).or_insert(0) += 1;
    }
    counts
}

fn print_population(sim: &Simulation) {
    println!("  {}", "Population".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Scale", "Total", "Active"]);
    for scale in Scale::ALL {
        let (total, active) = scale_counts(sim, scale);
        if total == 0 {
            continue;
        }
        table.add_row(vec![scale.to_string(), total.to_string(), active.to_string()]);
    }
    println!("{table}");
    println!();
}

fn print_ledger(sim: &Simulation) {
    let stats = sim.ledger().statistics();
    println!("  {}", "Conservation Ledger".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Quantity", "Ledger Total", "Active Total", "Violations"]);
    let active = sim.world().active_totals();
    for kind in QuantityKind::ALL {
        let violations = stats.violations_by_quantity.get(&kind).copied().unwrap_or(0);
        table.add_row(vec![
            kind.to_string(),
            format!("{:.4}", stats.totals.get(kind)),
            format!("{:.4}", active.get(kind)),
            violations.to_string(),
        ]);
    }
    println!("{table}");

    let summary = format!(
        "{} violations, {} audit entries",
        stats.total_violations, stats.audit_trail_len
    );
    if stats.total_violations == 0 {
        println!("  {}", summary.green());
    } else {
        println!("  {}", summary.yellow());
    }
    println!();
}

fn print_activity(sim: &Simulation) {
    let events = sim.events();
    let reactions = events.count_where(|k| matches!(k, SimEventKind::Reaction { .. }));
    let aggregates = events.count_where(|k| matches!(k, SimEventKind::Aggregated { .. }));
    let births = events.count_where(|k| matches!(k, SimEventKind::Born { .. }));
    let deaths = events.count_where(|k| matches!(k, SimEventKind::Died { .. }));

    println!("  {}", "Activity".bold().underline());
    println!("  reactions {reactions}, aggregates {aggregates}, births {births}, deaths {deaths}");
    println!();
}

fn print_failures(failures: &BTreeMap<String, usize>) {
    println!("  {}", "System Failures".bold().underline());
    if failures.is_empty() {
        println!("  {}", "none".green());
        return;
    }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["System", "Failed Ticks"]);
    for (system, count) in failures {
        table.add_row(vec![system.red().to_string(), count.to_string()]);
    }
    println!("{table}");
}
