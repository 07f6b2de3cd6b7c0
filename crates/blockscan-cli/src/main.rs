use anyhow::{Context, Result, bail};
use blockscan_config::{GrammarFile, HandlerRegistry, RuleEntry};
use blockscan_engine::{LogTrace, Part, Scanner};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blockscan")]
#[command(about = "Scan text with a block grammar and print the parts as JSON")]
struct Args {
    /// Grammar file (TOML). Falls back to ~/.config/blockscan/grammar.toml, then an empty grammar
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    /// Literal split for the root block, overriding the grammar's
    #[arg(short, long)]
    split: Option<String>,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Log block structure while scanning
    #[arg(short, long)]
    trace: bool,

    /// File to scan; reads stdin when omitted
    input: Option<PathBuf>,
}

fn load_grammar_file(args: &Args) -> Result<GrammarFile> {
    let file = match &args.grammar {
        Some(path) => match GrammarFile::load_from_path(path)? {
            Some(file) => file,
            None => bail!("grammar file not found: {}", path.display()),
        },
        None => GrammarFile::load()?.unwrap_or_default(),
    };
    Ok(file)
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn render(parts: &Part, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(parts)?
    } else {
        serde_json::to_string(parts)?
    };
    Ok(json)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut file = load_grammar_file(&args)?;
    if let Some(split) = &args.split {
        file.root.split = Some(RuleEntry::Literal(split.clone()));
    }

    let mut trace = file
        .trace()
        .or_else(|| args.trace.then(|| LogTrace::new(false)));
    let level = match trace {
        Some(LogTrace { verbose: true }) => log::LevelFilter::Trace,
        Some(_) => log::LevelFilter::Debug,
        None => log::LevelFilter::Info,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let options = file.scan_options();
    let grammar = file
        .into_grammar(&HandlerRegistry::with_builtins())
        .context("invalid grammar")?;
    let text = read_input(args.input.as_ref())?;
    log::debug!("scanning {} bytes", text.len());

    let mut scanner = Scanner::new(&grammar).with_options(options);
    if let Some(sink) = trace.as_mut() {
        scanner = scanner.with_trace(sink);
    }
    let parts = scanner.scan(&text, &mut ())?;

    println!("{}", render(&parts, args.pretty)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["blockscan", "--split", ",", "--pretty", "input.txt"]);
        assert_eq!(args.split.as_deref(), Some(","));
        assert!(args.pretty);
        assert!(!args.trace);
        assert_eq!(args.input, Some(PathBuf::from("input.txt")));
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let parts = Part::Group(vec!["a".into(), Part::Group(vec!["b".into()])]);
        assert_eq!(render(&parts, false).unwrap(), r#"["a",["b"]]"#);
        assert_eq!(
            render(&parts, true).unwrap(),
            "[\n  \"a\",\n  [\n    \"b\"\n  ]\n]"
        );
    }
}
