use std::{error::Error, fs::File, path::PathBuf, process::exit};

use clap::Parser;

use budget_api::{
    config::{StoreBackend, open_store},
    csv_import::read_records,
};

/// Append the transactions in a budget spreadsheet CSV export to a transaction store.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the CSV export.
    #[arg(long)]
    csv_path: PathBuf,

    /// The kind of store to append the transactions to.
    #[arg(long, value_enum, default_value_t = StoreBackend::Sqlite)]
    backend: StoreBackend,

    /// File path to the SQLite database or JSON document file.
    #[arg(long)]
    store_path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if !args.csv_path.is_file() {
        eprintln!("No CSV file found at {:#?}", args.csv_path);
        exit(1);
    }

    println!("Reading transactions from {:#?}", args.csv_path);
    let records = read_records(File::open(&args.csv_path)?)?;

    if records.is_empty() {
        println!("The CSV file has no transactions, nothing to import.");
        return Ok(());
    }

    println!(
        "Appending {} transactions to {:#?}...",
        records.len(),
        args.store_path
    );
    let store = open_store(args.backend, &args.store_path)?;
    let count = store.insert_many(records)?;

    println!("Imported {count} transactions.");

    Ok(())
}
