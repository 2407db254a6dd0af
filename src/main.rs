#[macro_use]
extern crate clap;

use std::path::{Path, PathBuf};
use std::process;

use clap::Arg;

use vm16asm::emit;
use vm16asm::AsmError;

fn main() {
    stderrlog::new()
        .verbosity(2)
        .init()
        .expect("failed to initialize logging");

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("VM16 assembly source file")
                .required(true)
                .index(1),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();

    if let Err(err) = run(Path::new(input)) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(input_path: &Path) -> Result<(), AsmError> {
    println!("VM16 ASSEMBLER v{}\n", env!("CARGO_PKG_VERSION"));
    println!(" - read {}...", input_path.display());

    let assembly = vm16asm::assemble_file(input_path)?;

    let lst_path: PathBuf = input_path.with_extension("lst");
    let txt_path: PathBuf = input_path.with_extension("txt");
    let h16_path: PathBuf = input_path.with_extension("h16");

    println!(" - write {}...", lst_path.display());
    emit::write_listing_file(&lst_path, &assembly.lines)
        .map_err(|e| io_error(input_path, e))?;

    println!(" - write {}...", txt_path.display());
    emit::write_hex_dump_file(&txt_path, &assembly.memory)
        .map_err(|e| io_error(input_path, e))?;

    println!(" - write {}...", h16_path.display());
    emit::write_h16_file(&h16_path, &assembly.memory)
        .map_err(|e| io_error(input_path, e))?;

    for w in &assembly.warnings {
        eprintln!("Warning: {}", w);
    }

    println!("\nSymbol table:");
    for (name, addr) in assembly.symbols.globals_by_address() {
        println!(" - {:<16} = {:04X}", name, addr);
    }
    println!();

    let size = assembly.memory.cells.len();
    println!("Code start address: ${:04X}", assembly.memory.start);
    println!("Code size: ${:04X}/{} words\n", size, size);

    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> AsmError {
    AsmError::new(path, 0, vm16asm::AsmErrorKind::Io(err.to_string()))
}
