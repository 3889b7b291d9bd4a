use clap::Parser;
use color_eyre::Result;
use habitup::{Config, Database, Profile, cli::{Cli, CliContext, Commands}};
use tracing_subscriber::EnvFilter;

/// Log to a file in the data directory; the dashboard owns the terminal
fn init_tracing(profile: Profile, config: &Config) {
    let Some(data_dir) = habitup::utils::get_data_dir(profile) else {
        return;
    };
    if std::fs::create_dir_all(&data_dir).is_err() {
        return;
    }
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("habitup.log"))
    {
        Ok(file) => file,
        Err(_) => return,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("habitup={}", config.log_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(&habitup::utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };
    init_tracing(profile, &config);

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    tracing::debug!(path = %db_path.display(), "database opened");

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let session = habitup::Session::require(profile)?;
            let app = habitup::tui::App::new(config, db, session.username)?;
            habitup::tui::run_event_loop(app)?;
        }
        command => {
            let ctx = CliContext { db, config, profile };
            habitup::cli::run(command, &ctx)?;
        }
    }

    Ok(())
}
