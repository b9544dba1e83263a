use colored::Colorize;
use rk_mechanics::DeathSaveStatus;

use super::Session;

pub fn run(session: &Session, user: &str) -> Result<(), String> {
    let mut engine = session.engine()?;
    let report = engine.death_save(user);
    super::report_unsaved(report.persist_warning.as_ref());

    if session.json {
        return super::print_json(&report);
    }

    let line = report.to_string();
    let line = match report.status {
        DeathSaveStatus::Accumulating => line.normal(),
        DeathSaveStatus::Stabilized => line.green(),
        DeathSaveStatus::Expired => line.red(),
    };
    println!("  {} {line}", user.bold());
    Ok(())
}
