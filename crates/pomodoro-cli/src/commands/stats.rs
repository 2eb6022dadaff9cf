use clap::Subcommand;
use pomodoro_core::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals, today's progress and streaks
    Summary,
    /// Most recent finished phases
    Recent {
        /// Number of phases to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Summary => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Recent { limit } => {
            let recent = db.recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&recent)?);
        }
    }
    Ok(())
}
