pub mod run;
pub mod systems;

use std::path::Path;

use eb_simulation::RunConfig;

/// Load a run configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<RunConfig, String> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config '{}': {e}", path.display()))?;
    RunConfig::from_json_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}
