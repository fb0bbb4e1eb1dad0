use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use walkdir::WalkDir;

/// req is an opinionated scripting language for making HTTP requests.
///
/// Given no paths, req starts an interactive REPL. Given files or
/// directories, req runs each `.req` script it finds, in parallel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script files to run, or directories to search for `*.req` files.
    paths: Vec<PathBuf>,
}

/// At most this many errors are printed before the rest are swallowed into
/// a final "too many errors".
const MAX_ERRORS: usize = 50;

fn main() {
    let args = Args::parse();

    if args.paths.is_empty() {
        if let Err(err) = req::repl::run() {
            eprintln!("repl error: {err}");
            std::process::exit(1);
        }
        return;
    }

    let mut fnames = Vec::new();

    for path in &args.paths {
        if path.is_dir() {
            match files(path) {
                Ok(paths) => fnames.extend(paths),
                Err(err) => {
                    eprintln!("req: {}: {err}", path.display());
                    std::process::exit(1);
                }
            }
            continue;
        }
        fnames.push(path.clone());
    }

    if run_all(fnames) > 0 {
        std::process::exit(1);
    }
}

/// The `.req` files directly inside the given directory, sorted.
fn files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut fnames = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::other)?;

        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "req") {
            fnames.push(entry.path().to_path_buf());
        }
    }

    fnames.sort();
    Ok(fnames)
}

/// Runs every script on a bounded pool of worker threads, one evaluator per
/// script so nothing is shared between them. Errors are aggregated over a
/// channel; at most [`MAX_ERRORS`] are printed, and the total count is
/// returned.
fn run_all(fnames: Vec<PathBuf>) -> usize {
    let limit = thread::available_parallelism().map_or(1, |n| n.get()) + 10;
    let workers = limit.min(fnames.len().max(1));

    let queue = Mutex::new(fnames.into_iter().collect::<VecDeque<_>>());
    let (errs, collected) = mpsc::channel::<String>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let errs = errs.clone();
            let queue = &queue;

            scope.spawn(move || {
                loop {
                    let fname = {
                        let mut queue = match queue.lock() {
                            Ok(queue) => queue,
                            Err(_) => return,
                        };
                        match queue.pop_front() {
                            Some(fname) => fname,
                            None => return,
                        }
                    };

                    run_script(&fname, &errs);
                }
            });
        }
        drop(errs);
    });

    let mut errc = 0;

    for err in collected {
        if errc < MAX_ERRORS {
            eprintln!("{err}");
        }
        errc += 1;
    }

    if errc > MAX_ERRORS {
        eprintln!("req: too many errors");
    }
    errc
}

/// Parses and evaluates a single script, streaming its diagnostics into the
/// error channel.
fn run_script(fname: &Path, errs: &mpsc::Sender<String>) {
    let name = fname.display().to_string();

    let source = match fs::read_to_string(fname) {
        Ok(source) => source,
        Err(err) => {
            let _ = errs.send(format!("{name}: {err}"));
            return;
        }
    };

    let mut stdout = io::stdout();
    let mut errh = |err: &req::error::ParseError| {
        let _ = errs.send(err.to_string());
    };

    if let Err(err) = req::run(&name, &source, &mut stdout, &mut errh) {
        let _ = errs.send(err.to_string());
    }
}
