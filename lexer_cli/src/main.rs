//! CP Lexer - command line front end for the tokenization engine.
//!
//! Usage: cp-lexer [--config FILE] <dump|match|languages> ...

use clap::{Parser, Subcommand};
use cp_lexer_core::{Document, EngineConfig, Language, LanguageRegistry, TokenErrorParser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cp-lexer")]
#[command(about = "Tokenize files and match brackets with the CP lexer engine")]
struct Args {
    /// TOML file with engine settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every line's tokens and end state
    Dump {
        file: PathBuf,
        /// Language identifier overriding extension detection
        #[arg(long)]
        language: Option<String>,
        /// Also list error tokens found by the token error parser
        #[arg(long)]
        errors: bool,
    },
    /// Find the bracket matching the one at a character offset
    Match {
        file: PathBuf,
        #[arg(long)]
        offset: usize,
        #[arg(long)]
        language: Option<String>,
        /// Treat the offset as a caret and look on both sides of it
        #[arg(long)]
        caret: bool,
    },
    /// List registered language identifiers
    Languages,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> cp_lexer_core::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match args.command {
        Command::Dump {
            file,
            language,
            errors,
        } => {
            let mut doc = open(&file, language.as_deref(), config)?;
            dump(&doc)?;
            if errors {
                doc.register_parser(Box::new(TokenErrorParser));
                doc.run_parsers();
                for (parser, notice) in doc.parsers().all_notices() {
                    println!(
                        "{}: line {} offset {}: {}",
                        parser,
                        notice.line + 1,
                        notice.offset,
                        notice.message
                    );
                }
            }
        }
        Command::Match {
            file,
            offset,
            language,
            caret,
        } => {
            let doc = open(&file, language.as_deref(), config)?;
            let found = if caret {
                doc.match_near_caret(offset)?
            } else {
                doc.match_bracket(offset)?
            };
            match found {
                Some(m) => println!("{} -> {}", m.origin, m.target),
                None => println!("no match"),
            }
        }
        Command::Languages => {
            let registry = LanguageRegistry::with_builtin();
            for id in registry.ids() {
                let name = Language::from_id(id).map(|l| l.name()).unwrap_or(id);
                println!("{:<18} {}", id, name);
            }
        }
    }
    Ok(())
}

fn open(
    file: &Path,
    language: Option<&str>,
    config: EngineConfig,
) -> cp_lexer_core::Result<Document> {
    log::info!("Opening file: {}", file.display());
    let mut doc = Document::open_file(file, config)?;
    if let Some(id) = language {
        doc.set_language(id)?;
    }
    log::info!("Language: {}", doc.language_id());
    Ok(doc)
}

fn dump(doc: &Document) -> cp_lexer_core::Result<()> {
    let buffer = doc.buffer();
    for line in 0..buffer.len_lines() {
        let chars: Vec<char> = buffer.line(line).unwrap_or_default().chars().collect();
        let seq = doc.token_sequence_for_line(line)?;
        let state = doc.highlighter().state_after(line)?;
        println!("{:>5} [{}]", line + 1, state);
        for token in seq.iter() {
            println!(
                "      {:<28} {:?}{}",
                token.kind.name(),
                token.text_string(&chars),
                if token.is_hyperlink { " (link)" } else { "" }
            );
        }
    }
    Ok(())
}
