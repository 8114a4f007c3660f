use pasfix::{
    structure, AutoFix, Config, Error, Fault, Lexer, Result, SourceBuffer,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Default)]
struct Options {
    write: bool,
    check: bool,
    repl: bool,
    verbose: bool,
    indent: Option<usize>,
    fix: Option<PathBuf>,
    paths: Vec<PathBuf>,
}

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(msg) => {
            eprintln!("error: {msg}\n");
            print_help();
            process::exit(2);
        }
    };
    setup_tracing(opts.verbose);

    let outcome = if opts.repl || (opts.paths.is_empty() && opts.fix.is_none()) {
        run_repl(&opts).map(|_| 0)
    } else if let Some(fault_file) = &opts.fix {
        run_fix(fault_file, &opts).map(|_| 0)
    } else {
        run_format(&opts)
    };
    match outcome {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> std::result::Result<Option<Options>, String> {
    let mut opts = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-w" | "--write" => opts.write = true,
            "-c" | "--check" => opts.check = true,
            "-r" | "--repl" => opts.repl = true,
            "-v" | "--verbose" => opts.verbose = true,
            "--indent" => {
                let n = args.next().ok_or("--indent needs a value")?;
                let n: usize = n.parse().map_err(|_| format!("bad indent `{n}`"))?;
                if n == 0 {
                    return Err("indent must be at least 1".into());
                }
                opts.indent = Some(n);
            }
            "--fix" => {
                let path = args.next().ok_or("--fix needs a fault file")?;
                opts.fix = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option `{flag}`")),
            path => opts.paths.push(PathBuf::from(path)),
        }
    }
    if opts.fix.is_some() && opts.paths.len() != 1 {
        return Err("--fix takes exactly one source file".into());
    }
    Ok(Some(opts))
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pasfix=debug")
        } else {
            EnvFilter::new("pasfix=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_for(path: &Path, opts: &Options) -> Result<Config> {
    let mut config = Config::discover(path)?;
    if let Some(n) = opts.indent {
        config.indent_size = n;
    }
    Ok(config)
}

fn collect_sources(opts: &Options) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in &opts.paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let config = config_for(path, opts)?;
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let at = e.path().unwrap_or(path).to_path_buf();
                Error::io(at, e.into())
            })?;
            if entry.file_type().is_file() && config.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    debug!(count = files.len(), "collected sources");
    Ok(files)
}

// Returns the exit code: 1 when `--check` finds files that would change.
fn run_format(opts: &Options) -> Result<i32> {
    let mut unformatted = 0usize;
    for file in collect_sources(opts)? {
        let config = config_for(&file, opts)?;
        let src = fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
        let pretty = pasfix::format_source_with_options(&src, &config.formatter_options());

        if opts.check {
            for fault in structure::check(&Lexer::new(&src).lex()) {
                report_fault(&file, &fault);
            }
            if pretty != src {
                println!("{} would be reformatted", file.display());
                unformatted += 1;
            }
        } else if opts.write {
            if pretty != src {
                fs::write(&file, &pretty).map_err(|e| Error::io(&file, e))?;
                info!("formatted {}", file.display());
            }
        } else {
            print!("{pretty}");
        }
    }
    Ok(if unformatted > 0 { 1 } else { 0 })
}

fn report_fault(file: &Path, fault: &Fault) {
    match fault.position() {
        Some(at) => eprintln!(
            "{}:{}:{}: {}",
            file.display(),
            at.line + 1,
            at.column + 1,
            fault.message()
        ),
        None => eprintln!("{}: {}", file.display(), fault.message()),
    }
}

fn run_fix(fault_file: &Path, opts: &Options) -> Result<()> {
    let payload = fs::read_to_string(fault_file).map_err(|e| Error::io(fault_file, e))?;
    let fault: Fault = serde_json::from_str(&payload).map_err(|e| Error::json(fault_file, e))?;
    // Checked in `parse_args`.
    let Some(file) = opts.paths.first() else {
        return Ok(());
    };
    let src = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;

    let mut buffer = SourceBuffer::new(src);
    if !AutoFix::new(&mut buffer).fix(&fault) {
        warn!("no fix applies to `{}` in {}", fault.name(), file.display());
    }
    let selection = buffer.selection();
    let text = buffer.into_text();
    if opts.write {
        fs::write(file, &text).map_err(|e| Error::io(file, e))?;
        info!(?selection, "fixed {}", file.display());
    } else {
        print!("{text}");
    }
    Ok(())
}

fn run_repl(opts: &Options) -> Result<()> {
    use rustyline::{error::ReadlineError, DefaultEditor};

    let config = config_for(&std::env::current_dir().map_err(|e| Error::io(".", e))?, opts)?;
    let fmt_opts = config.formatter_options();
    let mut rl = DefaultEditor::new()?;
    println!("pasfix REPL. Enter Pascal code, an empty line formats it. Ctrl-D to exit.");
    let mut snippet = String::new();
    loop {
        let prompt = if snippet.is_empty() { ">> " } else { ".. " };
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    if !snippet.is_empty() {
                        print!("{}", pasfix::format_source_with_options(&snippet, &fmt_opts));
                        snippet.clear();
                    }
                    continue;
                }
                rl.add_history_entry(line.as_str()).ok();
                snippet.push_str(&line);
                snippet.push('\n');
            }
            Err(ReadlineError::Interrupted) => snippet.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn print_help() {
    println!("pasfix - Pascal formatter and auto-fixer\n");
    println!("Usage: pasfix [options] [PATH...]");
    println!("       pasfix --fix FAULT.json FILE [--write]\n");
    println!("Options:");
    println!("  -w, --write      Rewrite files in place");
    println!("  -c, --check      Report files that would change and structural faults");
    println!("      --indent N   Spaces per indentation level");
    println!("      --fix FILE   Apply the JSON fault payload in FILE to the source");
    println!("  -r, --repl       Start an interactive formatting REPL");
    println!("  -v, --verbose    Debug logging (or set RUST_LOG)");
    println!("  -h, --help       Show this help");
    println!("\nExit status: 0 ok, 1 unformatted files under --check, 2 error");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::result::Result<Option<Options>, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_paths() {
        let opts = args(&["--check", "--indent", "4", "a.pas", "src"]).unwrap().unwrap();
        assert!(opts.check);
        assert_eq!(opts.indent, Some(4));
        assert_eq!(opts.paths, vec![PathBuf::from("a.pas"), PathBuf::from("src")]);
    }

    #[test]
    fn rejects_bad_usage() {
        assert!(args(&["--indent"]).is_err());
        assert!(args(&["--indent", "0"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&["--fix", "f.json"]).is_err());
        assert!(args(&["--fix", "f.json", "a.pas"]).unwrap().is_some());
    }
}
