use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bnapp_calendar::{
    AppConfig, Calendar, DateKey, EventDraft, EventKind, LoadStatus, Lookup, Notifier, Owner,
    SystemClock, Theme, WeatherStatus,
    view::{DayCell, DayDetail, GRID_WEEKDAYS, weather_lines},
};
use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "bnapp-calendar")]
#[command(about = "Family calendar with Hebrew dates, Shabbat times, holidays and weather")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a month grid (defaults to the current month)
    Month(MonthArgs),
    /// Show one day with its events and free time
    Day { date: Option<DateKey> },
    /// List the free slots of a day
    Free { date: Option<DateKey> },
    /// List the tasks of a month
    Tasks(MonthArgs),
    /// Show the forecast for a day in the selected city
    Weather { date: Option<DateKey> },
    /// Search for or select the city
    City {
        #[command(subcommand)]
        command: CityCommand,
    },
    /// Show, set or toggle the colour theme
    Theme { theme: Option<ThemeArg> },
    /// Add an event or task
    Add(AddArgs),
    /// Follow remote changes and deliver reminders until interrupted
    Watch,
}

#[derive(clap::Args, Debug)]
struct MonthArgs {
    #[arg(long)]
    year: Option<i32>,
    /// Month number, 1-12
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum CityCommand {
    /// List places matching a query
    Search { query: String },
    /// Pick a place from the search results (1 = first match)
    Set {
        query: String,
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Event,
    Task,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OwnerArg {
    Both,
    PersonA,
    PersonB,
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    title: String,
    /// Day as YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<String>,
    /// Start time HH:MM
    #[arg(long, default_value = bnapp_calendar::event::DEFAULT_START)]
    start: String,
    /// End time HH:MM
    #[arg(long, default_value = "")]
    end: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, value_enum, default_value_t = KindArg::Event)]
    kind: KindArg,
    #[arg(long, value_enum, default_value_t = OwnerArg::Both)]
    owner: OwnerArg,
    /// Do not send a reminder
    #[arg(long)]
    no_notify: bool,
    /// Minutes before the start to remind (1-180)
    #[arg(long, default_value_t = 60)]
    notify_minutes: i64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("bnapp_calendar=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    rt.block_on(async {
        let mut calendar = Calendar::from_config(&config, Arc::new(SystemClock), notifier())?;
        let command = args.command.unwrap_or(Command::Month(MonthArgs {
            year: None,
            month: None,
        }));
        run(&mut calendar, &config, command).await
    })
}

#[cfg(feature = "desktop")]
fn notifier() -> Arc<dyn Notifier> {
    Arc::new(bnapp_calendar::SystemNotifier)
}

#[cfg(not(feature = "desktop"))]
fn notifier() -> Arc<dyn Notifier> {
    Arc::new(bnapp_calendar::LogNotifier)
}

async fn run(calendar: &mut Calendar, config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Month(month) => {
            select_month(calendar, &month).await?;
            load_events(calendar).await;
            print_month(calendar);
        }
        Command::Day { date } => {
            let key = date.unwrap_or_else(|| calendar.state().selected_or_today());
            calendar.show_month(key.date().year(), key.date().month0()).await?;
            load_events(calendar).await;
            print_day(&calendar.open_day(key));
        }
        Command::Free { date } => {
            load_events(calendar).await;
            let key = date.unwrap_or_else(|| calendar.state().selected_or_today());
            let slots = calendar.free_time(key);
            if slots.is_empty() {
                println!("No free time on {key}.");
            }
            for slot in slots {
                println!("{slot}");
            }
        }
        Command::Tasks(month) => {
            if let (Some(year), Some(m)) = (month.year, month.month) {
                calendar.show_month(year, m - 1).await?;
            }
            load_events(calendar).await;
            let tasks = calendar.upcoming_tasks();
            if tasks.is_empty() {
                println!("No tasks this month.");
            }
            for task in tasks {
                println!("{}  {}", task.date, task.event.title);
            }
        }
        Command::Weather { date } => {
            if let Some(key) = date {
                calendar.open_day(key);
            }
            match calendar.weather().await {
                WeatherStatus::Ready { city, day } => {
                    for line in weather_lines(&city, &day) {
                        println!("{line}");
                    }
                    println!("Weather data from open-meteo.");
                }
                WeatherStatus::NoCoordinates => println!("The selected city has no coordinates."),
                WeatherStatus::NoData => println!("No forecast available."),
                WeatherStatus::Failed(reason) => println!("Could not load the weather: {reason}"),
                WeatherStatus::Superseded => {}
            }
        }
        Command::City { command } => match command {
            CityCommand::Search { query } => match calendar.search_city(&query).await {
                Lookup::Ready(cities) if cities.is_empty() => println!("No places found."),
                Lookup::Ready(cities) => {
                    for (i, city) in cities.iter().enumerate() {
                        println!(
                            "{}. {} ({:.4}, {:.4}) {}",
                            i + 1,
                            city.name,
                            city.lat,
                            city.lon,
                            city.country_code
                        );
                    }
                }
                Lookup::Unavailable(reason) => println!("City search failed: {reason}"),
            },
            CityCommand::Set { query, pick } => {
                let cities = match calendar.search_city(&query).await {
                    Lookup::Ready(cities) => cities,
                    Lookup::Unavailable(reason) => anyhow::bail!("City search failed: {reason}"),
                };
                let city = pick
                    .checked_sub(1)
                    .and_then(|i| cities.into_iter().nth(i))
                    .with_context(|| format!("No match number {pick} for {query:?}"))?;
                calendar.select_city(city).await;
                println!("City set to {}", calendar.state().city.name);
            }
        },
        Command::Theme { theme } => {
            let theme = match theme {
                None => calendar.state().theme,
                Some(ThemeArg::Toggle) => calendar.toggle_theme(),
                Some(ThemeArg::Light) => set_theme(calendar, Theme::Light),
                Some(ThemeArg::Dark) => set_theme(calendar, Theme::Dark),
            };
            println!("Theme: {theme:?}");
        }
        Command::Add(add) => {
            let today = calendar.state().selected_or_today();
            let mut draft = EventDraft::new(today);
            draft.title = add.title;
            if let Some(date) = add.date {
                draft.date = date;
            }
            draft.start = add.start;
            draft.end = add.end;
            draft.address = add.address;
            draft.kind = match add.kind {
                KindArg::Event => EventKind::Event,
                KindArg::Task => EventKind::Task,
            };
            draft.owner = match add.owner {
                OwnerArg::Both => Owner::Both,
                OwnerArg::PersonA => Owner::PersonA,
                OwnerArg::PersonB => Owner::PersonB,
            };
            draft.notify = !add.no_notify;
            draft.notify_minutes = add.notify_minutes;

            let (key, event) = calendar.save_event(&draft).await?;
            println!("Saved {:?} on {}", event.title, key);
            if calendar.pending_reminders() > 0 {
                // The reminder task lives only as long as this process.
                println!("Run `bnapp-calendar watch` to receive the reminder.");
            }
        }
        Command::Watch => watch(calendar, config).await?,
    }
    Ok(())
}

fn set_theme(calendar: &mut Calendar, theme: Theme) -> Theme {
    calendar.set_theme(theme);
    theme
}

async fn select_month(calendar: &mut Calendar, month: &MonthArgs) -> Result<()> {
    let today = calendar.state().today;
    let year = month.year.unwrap_or(today.year());
    let month0 = month.month.map(|m| m - 1).unwrap_or(today.month0());
    calendar.show_month(year, month0).await?;
    Ok(())
}

async fn load_events(calendar: &mut Calendar) {
    if let Err(e) = calendar.refresh_events().await {
        tracing::warn!("Events unavailable: {:#}", e);
    }
}

/// Keep a live subscription open, replacing the cache and rescheduling
/// reminders on every change. Reconnects after a pause when the stream ends.
async fn watch(calendar: &mut Calendar, config: &AppConfig) -> Result<()> {
    let store = calendar
        .store()
        .cloned()
        .context("No event store configured; set store.url")?;
    let reconnect_delay = Duration::from_secs(config.store.reconnect_delay_secs);

    tracing::info!("Watching remote events");
    loop {
        let (tx, mut rx) = mpsc::channel(8);
        let stream_store = store.clone();
        let mut subscription = tokio::spawn(async move { stream_store.subscribe(tx).await });

        loop {
            tokio::select! {
                snapshot = rx.recv() => match snapshot {
                    Some(events) => {
                        let reminders = calendar.apply_snapshot(events);
                        tracing::info!("Events updated, {} reminders pending", reminders.len());
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    subscription.abort();
                    tracing::info!("Stopped watching");
                    return Ok(());
                }
            }
        }

        match (&mut subscription).await {
            Ok(Ok(())) => tracing::info!("Event stream closed"),
            Ok(Err(e)) => tracing::error!("Event stream failed: {:#}", e),
            Err(e) => tracing::error!("Event stream task failed: {}", e),
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

// ==================== Terminal Rendering ====================

fn status_note(label: &str, status: &LoadStatus) -> Option<String> {
    match status {
        LoadStatus::Unavailable(reason) => Some(format!("{label} unavailable: {reason}")),
        LoadStatus::Loading => Some(format!("{label} loading...")),
        LoadStatus::NotLoaded | LoadStatus::Ready => None,
    }
}

fn cell_text(cell: &DayCell) -> String {
    let marker = if cell.is_today {
        '*'
    } else if cell.glow {
        '!'
    } else if cell.is_other_month {
        '.'
    } else {
        ' '
    };
    format!("{:>2}{}{:<4}", cell.day, marker, cell.hebrew_label)
}

fn print_month(calendar: &Calendar) {
    let header = calendar.header();
    println!("{}  |  {}", header.gregorian, header.hebrew);
    println!("{}  |  {}", header.today, header.location);
    println!();

    let cells = calendar.cells();
    println!(
        "{}",
        GRID_WEEKDAYS
            .iter()
            .map(|d| format!("{d:<8}"))
            .collect::<String>()
    );
    for row in cells.chunks(7) {
        let line: Vec<String> = row.iter().map(|c| format!("{:<8}", cell_text(c))).collect();
        println!("{}", line.concat().trim_end());
    }
    println!();

    for cell in cells.iter().filter(|c| !c.is_other_month) {
        let mut notes: Vec<String> = Vec::new();
        notes.extend(cell.holiday.clone());
        notes.extend(cell.shabbat.clone());
        notes.extend(cell.chips.iter().map(|c| c.text.clone()));
        notes.extend(cell.more.clone());
        if !notes.is_empty() {
            println!("{}: {}", cell.key, notes.join("  "));
        }
    }

    let state = calendar.state();
    for note in [
        status_note("Shabbat times", &state.shabbat_status),
        status_note("Holidays", &state.holidays_status),
    ]
    .into_iter()
    .flatten()
    {
        println!("{note}");
    }
}

fn print_day(detail: &DayDetail) {
    if let Some(hebrew) = &detail.hebrew {
        println!("{hebrew}");
    }
    println!("{}  {}", detail.weekday, detail.gregorian);
    if let Some(holiday) = &detail.holiday {
        println!("{holiday}");
    }
    if let Some(shabbat) = &detail.shabbat {
        println!("{shabbat}");
    }
    println!();

    if detail.events.is_empty() {
        println!("No events on this day.");
    }
    for row in &detail.events {
        println!("{:<13} {}  [{}]", row.time, row.title, row.meta);
        if let Some(address) = &row.address {
            println!("{:<13} 📍 {}", "", address);
        }
        if let Some(url) = &row.waze_url {
            println!("{:<13} 🧭 {}", "", url);
        }
    }

    println!();
    println!("Free time:");
    for slot in &detail.free_time {
        println!("  {slot}");
    }
}
