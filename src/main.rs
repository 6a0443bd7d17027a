//! Slotguard: Appointment slot reservation engine
//!
//! Main entry point: runs a scripted walkthrough of the booking flow
//! against the demo catalog.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slotguard::adapters::memory::SAMPLE_FAMILY_PHONE;
use slotguard::adapters::sanitize::SanitizingMakeWriter;
use slotguard::adapters::{
    FixedCode, InMemoryCatalog, InMemoryPatientRegistry, SqlitePatientRegistry, StorageError,
    SystemClock, DEMO_CODE,
};
use slotguard::domain::{Gender, PatientProfile, SessionId};
use slotguard::ports::PatientRegistry;
use slotguard::{DayState, EngineConfig, SchedulingEngine, SlotguardError};

fn main() -> Result<()> {
    // Default behavior:
    // - interactive TTY: log to a file so the walkthrough output stays readable
    // - non-interactive: log to stdout
    let log_mode = std::env::var("SLOTGUARD_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("SLOTGUARD_LOG_FILE").unwrap_or_else(|_| "slotguard.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Slotguard...");

    let config = match std::env::var("SLOTGUARD_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(path)?,
        Err(_) => EngineConfig::from_env_or_default(),
    };
    let start = Utc::now().date_naive();

    // SLOTGUARD_DB selects a SQLite patient registry instead of the samples.
    match std::env::var("SLOTGUARD_DB") {
        Ok(path) => {
            let engine = SchedulingEngine::new(
                config,
                Arc::new(InMemoryCatalog::demo(start)),
                Arc::new(SqlitePatientRegistry::new(path)?),
                Arc::new(SystemClock),
                Arc::new(FixedCode::default()),
            );
            walkthrough(&engine, start)?;
        }
        Err(_) => {
            let engine: SchedulingEngine<InMemoryPatientRegistry> =
                SchedulingEngine::demo(config, start);
            walkthrough(&engine, start)?;
        }
    }

    tracing::info!("Slotguard shutdown complete.");
    Ok(())
}

fn walkthrough<R>(engine: &SchedulingEngine<R>, start: NaiveDate) -> Result<()>
where
    R: PatientRegistry,
    R::Error: Into<StorageError>,
{
    println!("== Departments");
    for department in engine.departments() {
        let doctors: Vec<String> = engine
            .doctors_in_department(&department.id)
            .into_iter()
            .map(|d| d.name)
            .collect();
        println!("  {:<18} {}", department.name, doctors.join(", "));
    }

    let doctor = engine
        .doctors()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("catalog has no doctors"))?;

    println!("\n== Next two weeks for {}", doctor.name);
    for offset in 0..14 {
        let Some(date) = start.checked_add_days(Days::new(offset)) else {
            break;
        };
        let state = engine.day_state(&doctor.id, date);
        println!("  {} {:<3} {}", date, date.format("%a"), state.label());
    }

    let (date, time) = (0..14)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .filter(|date| engine.day_state(&doctor.id, *date) == DayState::Available)
        .find_map(|date| {
            engine
                .day_slots(&doctor.id, date)
                .into_iter()
                .find(|slot| slot.bookable)
                .map(|slot| (date, slot.time))
        })
        .ok_or_else(|| anyhow::anyhow!("no bookable slot in the next two weeks"))?;

    println!("\n== Two sessions hold {} {} with {}", date, time.format("%H:%M"), doctor.name);
    let first = SessionId::from("session-a");
    let second = SessionId::from("session-b");
    for session in [&first, &second] {
        let hold = engine.acquire_hold(&doctor.id, date, time, session);
        println!(
            "  {} holds until {}",
            session,
            hold.expires_at.format("%H:%M:%S")
        );
    }

    println!("\n== Verification for {}", SAMPLE_FAMILY_PHONE);
    let challenge = engine.request_challenge(SAMPLE_FAMILY_PHONE)?;
    println!("  code sent, resend in {}s", challenge.cooldown.as_secs());
    if let Err(e) = engine.verify_challenge(&challenge.transaction_id, "000000") {
        println!("  wrong code: {e}");
    }
    engine.verify_challenge(&challenge.transaction_id, DEMO_CODE)?;
    println!("  verified");

    let mut family = engine.patients_for_transaction(&challenge.transaction_id)?;
    if family.is_empty() {
        family.push(engine.create_patient(PatientProfile {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone: SAMPLE_FAMILY_PHONE.to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 5, 12),
            gender: Some(Gender::Female),
            email: None,
        })?);
    }
    for patient in &family {
        println!("  {} (MRN {})", patient.full_name(), patient.mrn);
    }

    println!("\n== New patient registration");
    let other_phone = "+911234567890";
    let new_patient = engine.create_patient(PatientProfile {
        first_name: "Asha".to_string(),
        last_name: "Rao".to_string(),
        phone: other_phone.to_string(),
        dob: NaiveDate::from_ymd_opt(1988, 7, 14),
        gender: Some(Gender::Female),
        email: Some("asha@example.com".to_string()),
    })?;
    println!("  {} registered with MRN {}", new_patient.full_name(), new_patient.mrn);

    println!("\n== Both sessions confirm");
    let winner = engine.confirm(
        &first,
        &doctor.id,
        date,
        time,
        family[0].mrn.as_str(),
        SAMPLE_FAMILY_PHONE,
    )?;
    println!("  {} booked appointment {}", first, winner.appointment_id);

    match engine.confirm(
        &second,
        &doctor.id,
        date,
        time,
        new_patient.mrn.as_str(),
        other_phone,
    ) {
        Ok(booking) => println!("  {} booked appointment {}", second, booking.appointment_id),
        Err(SlotguardError::SlotConflict { alternatives }) => {
            println!("  {} lost the race; alternatives:", second);
            for alternative in &alternatives {
                println!("    {alternative}");
            }
            if let Some(alternative) = alternatives.first() {
                engine.acquire_hold(&doctor.id, alternative.date, alternative.time, &second);
                let booking = engine.confirm(
                    &second,
                    &doctor.id,
                    alternative.date,
                    alternative.time,
                    new_patient.mrn.as_str(),
                    other_phone,
                )?;
                println!(
                    "  {} booked appointment {} at {}",
                    second, booking.appointment_id, alternative
                );
            }
        }
        Err(e) => return Err(e.into()),
    }

    println!("\n== Send limit");
    let limited_phone = "+910000000000";
    for attempt in 1.. {
        match engine.request_challenge(limited_phone) {
            Ok(_) => println!("  challenge {attempt} sent"),
            Err(e) => {
                println!("  challenge {attempt}: {e}");
                break;
            }
        }
    }

    println!("\n{} bookings confirmed", engine.bookings());
    Ok(())
}
