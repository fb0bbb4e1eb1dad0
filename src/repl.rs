use std::io;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::{Context, Evaluator},
    interpreter::parser,
};

/// Runs the interactive read-eval-print loop until end of input or an
/// interrupt.
///
/// Each line is parsed as an expression sequence and evaluated against a
/// context that persists across lines, so variables keep their values.
/// Expression results are Sprinted on their own line, and evaluation errors
/// unwrap to their inner message since positions carry little meaning for a
/// single line of input.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut editor = DefaultEditor::new()?;

    println!("req {}", crate::BUILD);

    let mut stdout = io::stdout();
    let mut evaluator = Evaluator::new(&mut stdout);
    let mut ctx = Context::new();

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(err) => {
                eprintln!("ERR {err}");
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&line);

        let nodes = match parser::parse_expr(&line) {
            Ok(nodes) => nodes,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        for node in &nodes {
            match evaluator.eval(&mut ctx, node) {
                Ok(Some(val)) => println!("{}", val.sprint()),
                Ok(None) => {}
                Err(err @ RuntimeError::Eval { .. }) => eprintln!("{}", err.unwrapped()),
                Err(err) => eprintln!("{err}"),
            }
        }
    }
}
