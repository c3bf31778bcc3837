use std::env;
use std::fs;
use std::process::ExitCode;

use asmvm::{run, translate};
use log::LevelFilter;

fn main_inner(path: &str) -> Result<(), asmvm::Error> {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let source = fs::read_to_string(path).expect("unable to read source file");
    let image = translate(&source)?;
    log::info!("assembled {} words from {}", image.word_count(), path);

    let (outputs, report) = run(&image, &[], 10_000_000)?;
    println!("{:?}", report.termination);
    println!("ticks: {}", report.ticks);
    println!("pc: {}", report.pc);
    for (port, bytes) in outputs {
        println!("port {}: {:?}", port, String::from_utf8_lossy(&bytes));
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: asmvm <source-file>");
        return ExitCode::from(2);
    }

    match main_inner(&args[1]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}
