use std::fs;
use std::io::{self, BufWriter};
use std::process;
use std::time::Instant;

use bfvm::shell::Shell;
use bfvm::tape::{DEFAULT_TAPE_SIZE, Tape};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bfvm", version)]
#[command(about = "An optimizing brainfuck virtual machine")]
struct Args {
    /// Brainfuck program file to execute; starts an interactive session when omitted
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Number of cells in the memory tape
    #[arg(short, long, default_value_t = DEFAULT_TAPE_SIZE)]
    memory: usize,

    /// Number of optimization passes (0 disables the idiom recognizer)
    #[arg(short, long, default_value_t = 2)]
    opt_passes: usize,

    /// Print timing and instruction statistics after execution
    #[arg(short, long)]
    stats: bool,

    /// Dump the tape after execution
    #[arg(short, long)]
    dump: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match &args.file {
        Some(file) => run_file(&args, file),
        None => {
            let mut shell = Shell::new(args.memory, args.opt_passes);
            if let Err(e) = shell.run() {
                fail(&e.to_string());
            }
        }
    }
}

fn run_file(args: &Args, file: &str) {
    let raw = match fs::read(file) {
        Ok(raw) => raw,
        Err(e) => return fail(&format!("{}: {}", file, e)),
    };
    let source = String::from_utf8_lossy(&raw);

    let compile_started = Instant::now();
    let program = match bfvm::compile(&source, args.opt_passes) {
        Ok(program) => program,
        Err(e) => return fail(&e.to_string()),
    };
    let compile_time = compile_started.elapsed();

    let mut tape = Tape::new(args.memory);
    let stdin = io::stdin();
    let mut output = BufWriter::new(io::stdout().lock());
    let run_started = Instant::now();
    let stats = match bfvm::execute(&program, &mut tape, &mut stdin.lock(), &mut output) {
        Ok(stats) => stats,
        Err(e) => return fail(&e.to_string()),
    };
    let run_time = run_started.elapsed();
    drop(output);

    if args.dump {
        if let Err(e) = tape.dump(&mut io::stdout().lock()) {
            return fail(&e.to_string());
        }
    }
    if args.stats {
        let vm_time = run_time.saturating_sub(stats.input_wait);
        println!("Instructions executed: {} (fused: {})", stats.executed, stats.fused);
        println!(
            "Execution time: {:?} (vm: {:?}, compiler: {:?}) (input wait: {:?})",
            compile_time + run_time,
            vm_time,
            compile_time,
            stats.input_wait
        );
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "ERROR:".red(), message);
    process::exit(1);
}
