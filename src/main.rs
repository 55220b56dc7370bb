use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use clinic_booking::booking::BookingWorkflow;
use clinic_booking::chat::{ChatAssistant, OpenAiClient, SendOutcome};
use clinic_booking::config::AppConfig;
use clinic_booking::db::{establish_connection, Database};
use clinic_booking::directory::{self, Doctor, DEPARTMENTS};
use clinic_booking::logging::{init_logging, OperationTimer};
use clinic_booking::metrics::MetricsCollector;
use clinic_booking::models::{NewMedicalRecord, DEFAULT_DEPARTMENT};
use clinic_booking::repository::SqliteAppointmentRepository;
use clinic_booking::slots;
use clinic_booking::upcoming::{AppointmentListView, DeleteOutcome, PromptChoice};
use clinic_booking::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List doctors, optionally for one department or matching a search
    Doctors {
        /// Department identifier (e.g. cardiology)
        #[arg(short, long)]
        department: Option<String>,

        /// Match doctor name or department, ignoring case
        #[arg(short, long, conflicts_with = "department")]
        search: Option<String>,
    },
    /// Show the daily slot catalog
    Slots {
        /// Date to check (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Mark slots already booked with this doctor on --date
        #[arg(long)]
        doctor: Option<String>,
    },
    /// Book an appointment
    Book {
        /// Doctor identifier (e.g. cardiology-1)
        #[arg(long)]
        doctor: String,

        /// Doctor display name, looked up when omitted
        #[arg(long)]
        doctor_name: Option<String>,

        /// Patient name
        #[arg(short, long)]
        name: String,

        /// Appointment date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Slot start time (HH:MM)
        #[arg(short, long)]
        time: String,
    },
    /// List upcoming appointments
    List,
    /// Cancel an upcoming appointment
    Cancel {
        /// Appointment id
        #[arg(long)]
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Talk to the assistant (type "exit" to leave)
    Chat,
    /// Manage patient medical records
    Records {
        #[command(subcommand)]
        action: RecordCommands,
    },
}

#[derive(Subcommand)]
enum RecordCommands {
    /// Add a record
    Add {
        /// Visit date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        visit_date: Option<String>,

        /// Treating doctor
        #[arg(long)]
        doctor: String,

        /// Diagnosis
        #[arg(long)]
        diagnosis: String,

        /// Prescription
        #[arg(long, default_value = "")]
        prescription: String,

        /// Known allergies
        #[arg(long, default_value = "")]
        allergies: String,

        /// Relevant medical history
        #[arg(long, default_value = "")]
        history: String,
    },
    /// List records, newest visit first
    List,
    /// Delete a record
    Delete {
        /// Record id
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = init_logging(&config.logging)?;
    MetricsCollector::init()?;
    let metrics = MetricsCollector::shared();

    info!("Starting clinic-booking");

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Doctors { search: Some(query), .. } => search_doctors(&query),
        Commands::Doctors { department, .. } => list_doctors(department.as_deref())?,
        Commands::Chat => run_chat(&config, metrics).await?,
        command => {
            let database = Arc::new(open_store(&config, Arc::clone(&metrics))?);
            let result = run_store_command(command, &config, &database, metrics).await;

            match Arc::try_unwrap(database) {
                Ok(database) => database.close(),
                Err(_) => warn!("Store still referenced at shutdown"),
            }
            result?;
        }
    }

    Ok(())
}

fn open_store(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<Database> {
    let mut database_config = config.database.clone();
    database_config.path = config.get_database_path();

    establish_connection(&database_config, metrics).map_err(|e| {
        error!(error = %e, path = %database_config.path, "Could not initialize database");
        anyhow::anyhow!(e)
    })
}

async fn run_store_command(
    command: Commands,
    config: &AppConfig,
    database: &Arc<Database>,
    metrics: Arc<MetricsCollector>,
) -> Result<()> {
    let repository = SqliteAppointmentRepository::new(Arc::clone(database));

    match command {
        Commands::Slots { date, doctor } => show_slots(database, date.as_deref(), doctor.as_deref())?,
        Commands::Book {
            doctor,
            doctor_name,
            name,
            date,
            time,
        } => {
            book(&repository, config, metrics.clone(), &doctor, doctor_name.as_deref(), &name, &date, &time).await?;
            list_upcoming(repository, metrics).await?;
        }
        Commands::List => list_upcoming(repository, metrics).await?,
        Commands::Cancel { id, yes } => cancel(repository, metrics, id, yes).await?,
        Commands::Records { action } => manage_records(database, action)?,
        Commands::Doctors { .. } | Commands::Chat => {}
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn list_doctors(department: Option<&str>) -> Result<()> {
    let departments: Vec<_> = match department {
        Some(id) => vec![directory::department(id).with_context(|| format!("Unknown department: {id}"))?],
        None => DEPARTMENTS.iter().collect(),
    };

    for dept in departments {
        println!("{}", dept.label);
        for doctor in directory::doctors_in(dept.id) {
            print_doctor(doctor);
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn search_doctors(query: &str) {
    let mut found = directory::search(query).peekable();
    if found.peek().is_none() {
        println!("No doctors found.");
    }
    for doctor in found {
        print_doctor(doctor);
    }
}

#[allow(clippy::print_stdout)]
fn print_doctor(doctor: &Doctor) {
    println!("  {:<16} {:<20} {:<28} {}", doctor.id, doctor.name, doctor.specialty, doctor.price);
}

#[allow(clippy::print_stdout)]
fn show_slots(database: &Database, date: Option<&str>, doctor: Option<&str>) -> Result<()> {
    let taken = match (date, doctor) {
        (Some(date), Some(doctor)) => {
            let date = InputValidator::validate_date(date)?;
            slots::taken_slots(&database.list_appointments()?, doctor, date)
        }
        (None, Some(_)) => anyhow::bail!("--doctor needs --date"),
        _ => Default::default(),
    };

    for slot in slots::slot_board(&taken) {
        let marker = if slot.taken { " (booked)" } else { "" };
        println!("{}{marker}", slot.time.format("%H:%M"));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments, clippy::print_stdout)]
async fn book(
    repository: &SqliteAppointmentRepository,
    config: &AppConfig,
    metrics: Arc<MetricsCollector>,
    doctor_id: &str,
    doctor_name: Option<&str>,
    patient_name: &str,
    date: &str,
    time: &str,
) -> Result<()> {
    let timer = OperationTimer::new("book_appointment");

    let mut workflow = BookingWorkflow::new(Some(doctor_id), doctor_name)
        .prevent_double_booking(config.booking.prevent_double_booking)
        .with_metrics(metrics);
    workflow.select_date(InputValidator::validate_date(date)?);
    workflow.select_time(slots::parse_slot(time)?)?;
    workflow.set_patient_name(patient_name);

    let confirmation = workflow.confirm(repository).await?;
    timer.finish();

    println!("{}", confirmation.message);
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn list_upcoming(repository: SqliteAppointmentRepository, metrics: Arc<MetricsCollector>) -> Result<()> {
    let mut view = AppointmentListView::new(repository).with_metrics(metrics);
    let appointments = view.on_focus().await?;

    if appointments.is_empty() {
        println!("No upcoming appointments.");
        return Ok(());
    }
    for a in appointments {
        let department = directory::department(a.department_or_default())
            .map_or(DEFAULT_DEPARTMENT, |d| d.label);
        println!(
            "#{:<4} {} {}  {:<20} {:<12} {}",
            a.id, a.date, a.time, a.doctor_name, department, a.patient_name
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn cancel(
    repository: SqliteAppointmentRepository,
    metrics: Arc<MetricsCollector>,
    id: i64,
    yes: bool,
) -> Result<()> {
    let mut view = AppointmentListView::new(repository).with_metrics(metrics);
    view.on_focus().await?;

    let prompt = view
        .request_delete(id)
        .with_context(|| format!("No upcoming appointment with id {id}"))?;

    let choice = if yes {
        PromptChoice::Yes
    } else {
        println!("{}", prompt.title);
        print!("{} [y/N] ", prompt.message);
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            PromptChoice::Yes
        } else {
            PromptChoice::No
        }
    };

    match view.resolve_delete(prompt, choice).await? {
        DeleteOutcome::Deleted => println!("Appointment #{id} cancelled."),
        DeleteOutcome::Missing => println!("Appointment #{id} was already cancelled."),
        DeleteOutcome::Kept => println!("Appointment #{id} kept."),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn manage_records(database: &Database, action: RecordCommands) -> Result<()> {
    match action {
        RecordCommands::Add {
            visit_date,
            doctor,
            diagnosis,
            prescription,
            allergies,
            history,
        } => {
            let record = NewMedicalRecord {
                visit_date: visit_date.unwrap_or_default(),
                doctor_name: InputValidator::sanitize_text(&doctor),
                diagnosis: InputValidator::sanitize_text(&diagnosis),
                prescription: InputValidator::sanitize_text(&prescription),
                allergies: InputValidator::sanitize_text(&allergies),
                medical_history: InputValidator::sanitize_text(&history),
            };
            let stored = database.insert_record(&record)?;
            println!("Record {} saved for visit on {}.", stored.id, stored.visit_date);
        }
        RecordCommands::List => {
            let records = database.list_records()?;
            if records.is_empty() {
                println!("No medical records.");
            }
            for r in records {
                println!("{}  {}  {}  {}", r.id, r.visit_date, r.doctor_name, r.diagnosis);
                for (label, value) in [
                    ("Prescription", &r.prescription),
                    ("Allergies", &r.allergies),
                    ("History", &r.medical_history),
                ] {
                    if !value.is_empty() {
                        println!("    {label}: {value}");
                    }
                }
            }
        }
        RecordCommands::Delete { id } => {
            if database.delete_record(&id)? {
                println!("Record {id} deleted.");
            } else {
                println!("No record with id {id}.");
            }
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_chat(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<()> {
    if config.get_api_key().is_none() {
        warn!("No completion API key configured; replies will fall back");
    }
    let client = OpenAiClient::from_config(config)?;
    let assistant = ChatAssistant::new(client, config.chat.clone()).with_metrics(metrics);

    println!("Describe your symptoms (\"exit\" to leave).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        match assistant.send(&line).await {
            SendOutcome::Empty => {}
            SendOutcome::Busy => println!("(still waiting for the previous reply)"),
            SendOutcome::Replied { reply, suggestion, .. } => {
                println!("{reply}");
                if let Some(suggestion) = suggestion {
                    println!("  {}", suggestion.summary());
                    if let Some(doctor) = suggestion.doctor {
                        print_doctor(doctor);
                    }
                }
            }
        }
    }

    info!(turns = assistant.history().len(), at = %Local::now(), "Chat session ended");
    Ok(())
}
