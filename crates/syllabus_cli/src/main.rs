//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `syllabus_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;

fn main() -> ExitCode {
    println!("syllabus_core version={}", syllabus_core::core_version());

    match syllabus_core::db::open_db_in_memory() {
        Ok(_) => {
            println!("syllabus_core schema=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("syllabus_core schema=error {err}");
            ExitCode::FAILURE
        }
    }
}
