use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io;

pub const DEFAULT_CONFIG_TEMPLATE: &str = r##"# taskboard configuration

[api]
base_url = "http://localhost:8080"
# token = "..."          # sent as a bearer token when set

[paging]
# items requested per page
page_size = 8

[gestures]
# horizontal travel (px) a swipe must exceed to delete an item
swipe_threshold = 200.0
# distance (px) from the viewport edge at which a dragged row auto-scrolls
overscroll_margin = 24.0

[lists]
# which way a swipe deletes: "left" or "right"
backlog_swipe = "left"
today_swipe = "right"
"##;

pub fn cmd_init(args: InitArgs, config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    config_io::write_config_template(config_path, DEFAULT_CONFIG_TEMPLATE, args.force)?;
    tracing::info!(path = %config_path.display(), "wrote config");
    if json {
        println!(
            "{}",
            serde_json::json!({ "config": config_path.display().to_string() })
        );
    } else {
        println!("wrote {}", config_path.display());
    }
    Ok(())
}
