use comfy_table::{ContentArrangement, Table};

use eb_simulation::LawsConfig;
use eb_simulation::laws::standard_pipeline;

pub fn run() -> Result<(), String> {
    let pipeline = standard_pipeline(&LawsConfig::default());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "System", "Scales", "Capabilities"]);

    for (i, system) in pipeline.iter().enumerate() {
        let scales = if system.scales().is_empty() {
            "any".to_string()
        } else {
            join(system.scales())
        };
        let capabilities = if system.capabilities().is_empty() {
            "-".to_string()
        } else {
            join(system.capabilities())
        };
        table.add_row(vec![
            (i + 1).to_string(),
            system.name().to_string(),
            scales,
            capabilities,
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} systems", pipeline.len());
    Ok(())
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
