//! The line-oriented interactive session.

use std::io::{self, Write};

use colored::Colorize;

use crate::interpreter::execute;
use crate::tape::Tape;

/// An interactive session. The tape persists across executed lines, so a
/// program can build on the state an earlier line left behind.
pub struct Shell {
    tape: Tape,
    passes: usize,
}

impl Shell {
    pub fn new(tape_size: usize, passes: usize) -> Self {
        Shell { tape: Tape::new(tape_size), passes }
    }

    pub fn run(&mut self) -> io::Result<()> {
        println!("bfvm {} (interactive mode)", env!("CARGO_PKG_VERSION"));
        println!("Memory cells available: {}", self.tape.len());
        println!("Type {} to see available commands.", "help".blue());

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!(">>> ");
            io::stdout().flush()?;
            line.clear();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            match line.trim() {
                "" => {}
                "help" => print_help(),
                "clear" => self.tape.reset(),
                "dump" => self.tape.dump(&mut io::stdout())?,
                "quit" | "exit" => break,
                program => self.execute_line(program),
            }
        }
        Ok(())
    }

    fn execute_line(&mut self, source: &str) {
        let program = match crate::compile(source, self.passes) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("{} {}", "compile error:".red(), e);
                return;
            }
        };
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        if let Err(e) = execute(&program, &mut self.tape, &mut stdin.lock(), &mut stdout) {
            eprintln!("{} {}", "runtime error:".red(), e);
        }
    }
}

fn print_help() {
    println!("List of available commands:");
    println!("{} - print this", "help".blue());
    println!("{} - clear memory cells", "clear".blue());
    println!(
        "{} - display memory cells; the cell in {} is the one currently pointed to",
        "dump".blue(),
        "green".green()
    );
    println!("{} - leave the session", "quit".blue());
    println!("Anything else runs as a program against the session tape.");
}
