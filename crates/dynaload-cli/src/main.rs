//! 🚀 dynaload-cli - the front door, the bouncer, the maitre d' of dynaload.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin wrapper: set up logging, load config, run the job, print a table
//! about it. The real work happens in the library. Like a manager. 🦆

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use dynaload::JobReport;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🚀 main() - where it all begins. The "I pressed enter and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Find the config file (or settle for env vars)
/// 3. Run the job (send it 🙏)
/// 4. Print the receipt, or the whole chain of sadness
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 🎯 first arg is the config path; the ol' reliable default otherwise
    let path_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dynaload.toml".to_string());

    // 🔒 a missing file is fine if the environment carries the whole config
    let config_file = Path::new(&path_arg);
    let config_file_if_it_exists = match config_file.try_exists().context(format!(
        "💀 Couldn't even check whether the configuration file exists. \
         Permissions, maybe, or a path from another dimension. Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => None,
    };

    let app_config = dynaload::app_config::load_config(config_file_if_it_exists)
        .context("💀 In dynaload-cli, main, we couldn't load the config. Check the file and the DYNALOAD_* env vars.")?;

    match dynaload::run(app_config).await {
        Ok(report) => {
            println!("{}", render_report(&report));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("dispatch failure")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }

            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like AWS (or whatever is pretending to be AWS) isn't reachable. \
                     Check the region and `aws.endpoint_url`. If you're on LocalStack, \
                     `docker ps` will tell you whether it's actually running. ☕"
                );
            }

            // 🗑️ Process exitus maximus.
            std::process::exit(1);
        }
    }
}

/// 🧾 A little receipt for the terminal.
fn render_report(report: &JobReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    match report {
        JobReport::Loaded(summary) => {
            table.set_header(vec!["🚚 load", ""]);
            table.add_row(vec!["source".to_string(), summary.source.to_string()]);
            table.add_row(vec!["table".to_string(), summary.table.clone()]);
            table.add_row(vec!["items written".to_string(), summary.stats.accepted.to_string()]);
            table.add_row(vec!["submissions".to_string(), summary.stats.submissions.to_string()]);
            table.add_row(vec!["throttled".to_string(), summary.stats.throttled.to_string()]);
            table.add_row(vec![
                "unprocessed retried".to_string(),
                summary.stats.unprocessed.to_string(),
            ]);
            table.add_row(vec![
                "elapsed".to_string(),
                format!("{:.1}s", summary.elapsed.as_secs_f64()),
            ]);
        }
        JobReport::Exported(location) => {
            table.set_header(vec!["📤 export", ""]);
            table.add_row(vec!["written to".to_string(), location.to_string()]);
        }
        JobReport::Capacity { table: name, capacity } => {
            table.set_header(vec!["📏 capacity", ""]);
            table.add_row(vec!["table".to_string(), name.clone()]);
            table.add_row(vec!["read".to_string(), capacity.read.to_string()]);
            table.add_row(vec!["write".to_string(), capacity.write.to_string()]);
        }
    }
    table
}
