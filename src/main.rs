use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use englang::codegen::Target;
use englang::config::Config;
use englang::errors::{find_similar_keyword, render_diagnostic, SourceFile};
use englang::lexer::{TokenKind, KEYWORDS};
use englang::parser::ast::{ParagraphList, Statement};
use englang::segmenter::Segmenter;
use englang::vm::Vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Debug dump of the syntax tree
    Tree,
    /// Syntax tree as JSON
    Json,
    /// Converted source in the target language
    Code,
    /// Execute and print the variables
    Run,
}

#[derive(Parser)]
#[command(name = "englang")]
#[command(version, about = "Parse, convert and run EngLang documents")]
struct Args {
    /// Path to the EngLang document
    file: PathBuf,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Code)]
    emit: Emit,

    /// Converter target, overrides the config file
    #[arg(long, value_enum)]
    target: Option<Target>,

    /// Config file to use instead of the discovered one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let source = match fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };
    let filename = args.file.display().to_string();
    log::debug!("parsing {} ({} bytes)", filename, source.len());

    let document = Segmenter::new(&config.parser).parse_document(&source);
    let invalid = report_invalid(&document, &SourceFile::new(&filename, &source));

    match args.emit {
        Emit::Tree => println!("{:#?}", document),
        Emit::Json => match serde_json::to_string_pretty(&document) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Emit::Code => {
            let target = args.target.unwrap_or(config.output.target);
            log::debug!("converting to {}", target);
            match target.converter().convert_node(englang::NodeRef::ParagraphList(&document)) {
                Ok(code) => print!("{}", code),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        Emit::Run => {
            let mut vm = Vm::new();
            if let Err(e) = vm.execute(&document) {
                eprintln!("Runtime error: {}", e);
                process::exit(1);
            }
            for slot in vm.variables() {
                println!("{}: {} = {}", slot.name, slot.shape, slot.value);
            }
        }
    }

    if invalid > 0 {
        process::exit(1);
    }
}

/// Print a warning for every sentence nothing could parse. Returns how many.
fn report_invalid(document: &ParagraphList, source: &SourceFile) -> usize {
    let invalid = document.invalid_statements();
    for statement in &invalid {
        let Statement::Invalid { tokens, range } = statement else {
            continue;
        };
        let text = statement.invalid_text().unwrap_or_default();
        let suggestion = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .find_map(|t| find_similar_keyword(&t.text, KEYWORDS));
        let message = format!("could not understand '{}'", text);
        eprint!(
            "{}",
            render_diagnostic("warning", &message, &source.locate(range.start), suggestion.as_deref())
        );
    }
    invalid.len()
}
