use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use azan_alarm::app::{self, Application};
use azan_alarm::appsettings::AppSettings;
use azan_alarm::cache::ProviderCache;
use azan_alarm::models::alarm::day_name;
use azan_alarm::models::{Alarm, AlarmId, NewAlarm, Prayer, RecurrenceDay};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file to use instead of `appsettings.toml`.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the alarm engine until interrupted.
    Run,
    #[command(subcommand)]
    Alarms(AlarmCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Prayers(PrayerCommand),
}

#[derive(Subcommand)]
enum AlarmCommand {
    List,
    Add {
        #[arg(value_parser = parse_prayer)]
        prayer: Prayer,
        /// Minutes relative to the prayer; negative means before.
        #[arg(long, short, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,
        #[arg(long, short)]
        label: Option<String>,
        /// Days to repeat on, 1 (Monday) to 7 (Sunday). Empty means daily.
        #[arg(long, short, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(1..=7))]
        days: Vec<RecurrenceDay>,
        #[arg(long)]
        sound: Option<String>,
        #[arg(long)]
        no_vibration: bool,
    },
    Remove {
        id: AlarmId,
    },
    Toggle {
        id: AlarmId,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Notifications {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    Reset,
}

#[derive(Subcommand)]
enum PrayerCommand {
    Today,
    Next,
}

fn parse_prayer(value: &str) -> Result<Prayer, String> {
    Prayer::ALL
        .into_iter()
        .find(|prayer| prayer.display_name().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown prayer {value:?}, expected one of fajr, dhuhr, asr, maghrib, isha"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let args = Args::parse();
    let settings = AppSettings::load(args.config.as_deref()).context("Could not load configuration.")?;

    match args.command {
        Command::Run => run(&settings).await,
        Command::Alarms(command) => alarms(&*open(&settings).await?, command).await,
        Command::Settings(command) => user_settings(&*open(&settings).await?, command).await,
        Command::Prayers(command) => prayers(&*open(&settings).await?, command),
    }
}

async fn open(settings: &AppSettings) -> anyhow::Result<Arc<ProviderCache>> {
    app::open_cache(settings, app::system_clock(settings)?).await
}

async fn run(settings: &AppSettings) -> anyhow::Result<()> {
    let app = Application::start(settings).await?;
    log::info!("Waiting for alarms. Press Ctrl-C to stop.");

    let mut countdown = app.countdown();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Could not listen for Ctrl-C.")?;
                break;
            }
            changed = countdown.changed() => {
                if changed.is_err() {
                    break;
                }
                log::debug!("Next prayer in {}", *countdown.borrow_and_update());
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

async fn alarms(cache: &ProviderCache, command: AlarmCommand) -> anyhow::Result<()> {
    match command {
        AlarmCommand::List => {
            let alarms = cache.alarms().borrow().clone();
            if alarms.is_empty() {
                println!("No alarms.");
            }
            for alarm in &alarms {
                print_alarm(alarm);
            }
        }
        AlarmCommand::Add {
            prayer,
            offset,
            label,
            days,
            sound,
            no_vibration,
        } => {
            let mut alarm = NewAlarm::new(prayer, offset);
            alarm.label = label;
            alarm.repeat_days = days;
            alarm.sound_path = sound;
            alarm.vibration_enabled = !no_vibration;

            let created = cache.create_alarm(alarm).await?;
            print_alarm(&created);
        }
        AlarmCommand::Remove { id } => cache.delete_alarm(id).await?,
        AlarmCommand::Toggle { id, active } => cache.toggle_alarm(id, active).await?,
    }
    Ok(())
}

fn print_alarm(alarm: &Alarm) {
    let days = if alarm.repeat_days.is_empty() {
        "every day".to_string()
    } else {
        alarm
            .repeat_days
            .iter()
            .filter_map(|day| day_name(*day))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let state = if alarm.is_active { "on" } else { "off" };

    println!("#{} [{state}] {} ({days})", alarm.id, alarm.display_label());
}

async fn user_settings(cache: &ProviderCache, command: SettingsCommand) -> anyhow::Result<()> {
    let settings = match command {
        SettingsCommand::Show => cache.settings().borrow().clone(),
        SettingsCommand::Notifications { enabled } => {
            let mut settings = cache.settings().borrow().clone();
            settings.enable_notifications = enabled;
            cache.save_settings(settings.clone()).await?;
            settings
        }
        SettingsCommand::Reset => cache.reset_settings().await?,
    };

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn prayers(cache: &ProviderCache, command: PrayerCommand) -> anyhow::Result<()> {
    match command {
        PrayerCommand::Today => {
            let times = cache
                .prayer_times()
                .borrow()
                .clone()
                .context("Prayer times are not available.")?;
            for (prayer, time) in times.iter() {
                println!("{:<8} {}", prayer.display_name(), format_time(&time));
            }
        }
        PrayerCommand::Next => {
            let next = cache
                .next_prayer()
                .borrow()
                .clone()
                .context("No upcoming prayer.")?;
            println!(
                "{} at {} (in {})",
                next.prayer,
                format_time(&next.time),
                azan_alarm::scheduling::format_remaining(next.remaining_seconds)
            );
        }
    }
    Ok(())
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format("%H:%M").to_string()
}
