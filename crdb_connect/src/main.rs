use crdb_connect::observability::{init_logging, render_failure};
use crdb_connect::{ConnectionConfig, ConnectError, Value};
use std::backtrace::Backtrace;
use std::process::ExitCode;

const VERSION_PREVIEW_CHARS: usize = 50;

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", render_failure(&e, &Backtrace::capture()));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ConnectError> {
    let config = ConnectionConfig::load()?;

    crdb_connect::with_connection(&config, |conn| {
        let mut cursor = conn.cursor();
        cursor.execute("SELECT current_user, version()", &[])?;
        if let Some(row) = cursor.fetch_one()? {
            let user = row.first().map(Value::to_string).unwrap_or_default();
            let version = row.get(1).map(Value::to_string).unwrap_or_default();
            let preview: String = version.chars().take(VERSION_PREVIEW_CHARS).collect();
            println!("✓ Connected as: {}", user);
            println!("✓ Database version: {}...", preview);
        }
        cursor.close();
        Ok(())
    })?;

    let (_columns, rows) = crdb_connect::run_query(
        &config,
        "SELECT table_name FROM information_schema.tables WHERE table_schema = ? LIMIT 5",
        &[Value::from("public")],
    )?;

    println!("\nTables in public schema:");
    for row in rows {
        if let Some(name) = row.first() {
            println!("  - {}", name);
        }
    }
    Ok(())
}
