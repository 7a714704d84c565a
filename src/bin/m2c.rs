//! `m2c`: drives [`m2fc`] from the command line.
//!
//! Reads one source file, parses it under the dialect selected by `--pim3`/`--pim4` or
//! individual `--flag`/`--no-flag` overrides, writes the resulting AST as an S-expression,
//! and renders any diagnostics to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use m2fc::options::{Flag, Options, Preset};
use m2fc::parser::SourceType;
use m2fc::{compile_file, writer};

/// Command-line surface for the Modula-2 front end.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// The Modula-2 source file to compile.
    #[arg(index = 1)]
    file: PathBuf,

    /// Where to write the S-expression AST. Defaults to `<FILE>.ast`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Echo the offending source line and a caret under every diagnostic.
    #[arg(short, long)]
    verbose: bool,

    /// Apply the PIM3 dialect preset. Mutually exclusive with `--pim4` and with every
    /// individual `--flag`/`--no-flag` override.
    #[arg(long, conflicts_with = "pim4")]
    pim3: bool,

    /// Apply the PIM4 dialect preset. Mutually exclusive with `--pim3` and with every
    /// individual `--flag`/`--no-flag` override.
    #[arg(long, conflicts_with = "pim3")]
    pim4: bool,

    #[arg(long)]
    synonyms: bool,
    #[arg(long)]
    no_synonyms: bool,

    #[arg(long)]
    line_comments: bool,
    #[arg(long)]
    no_line_comments: bool,

    #[arg(long)]
    prefix_literals: bool,
    #[arg(long)]
    no_prefix_literals: bool,

    #[arg(long)]
    octal_literals: bool,
    #[arg(long)]
    no_octal_literals: bool,

    #[arg(long)]
    escape_tab_and_newline: bool,
    #[arg(long)]
    no_escape_tab_and_newline: bool,

    #[arg(long)]
    subtype_cardinals: bool,
    #[arg(long)]
    no_subtype_cardinals: bool,

    #[arg(long)]
    safe_string_termination: bool,
    #[arg(long)]
    no_safe_string_termination: bool,

    #[arg(long)]
    errant_semicolon: bool,
    #[arg(long)]
    no_errant_semicolon: bool,

    #[arg(long)]
    lowline_identifiers: bool,
    #[arg(long)]
    no_lowline_identifiers: bool,

    #[arg(long)]
    const_parameters: bool,
    #[arg(long)]
    no_const_parameters: bool,

    #[arg(long)]
    additional_types: bool,
    #[arg(long)]
    no_additional_types: bool,

    #[arg(long)]
    unified_conversion: bool,
    #[arg(long)]
    no_unified_conversion: bool,

    #[arg(long)]
    unified_cast: bool,
    #[arg(long)]
    no_unified_cast: bool,

    #[arg(long)]
    coroutines: bool,
    #[arg(long)]
    no_coroutines: bool,

    #[arg(long)]
    variant_records: bool,
    #[arg(long)]
    no_variant_records: bool,

    #[arg(long)]
    local_modules: bool,
    #[arg(long)]
    no_local_modules: bool,

    #[arg(long)]
    lexer_debug: bool,
    #[arg(long)]
    no_lexer_debug: bool,

    #[arg(long)]
    parser_debug: bool,
    #[arg(long)]
    no_parser_debug: bool,
}

impl Cli {
    /// The preset the user selected, `None` if neither `--pim3` nor `--pim4` was given.
    fn preset(&self) -> Preset {
        if self.pim3 {
            Preset::Pim3
        } else if self.pim4 {
            Preset::Pim4
        } else {
            Preset::None
        }
    }

    /// Every `--flag`/`--no-flag` pair the user actually passed, in declaration order.
    /// `clap` rejects a flag appearing alongside its own negation, but not a flag appearing
    /// alongside an unrelated one, so [`Options::from_cli`] is left to enforce the
    /// preset-vs-override exclusion.
    ///
    /// `--verbose` is deliberately not among these: it selects diagnostics rendering, not
    /// a dialect, so it must not trip the preset-vs-override exclusion check below.
    fn overrides(&self) -> Vec<(Flag, bool)> {
        let mut overrides = Vec::new();
        macro_rules! push_pair {
            ($flag:ident, $pos:ident, $neg:ident) => {
                if self.$pos {
                    overrides.push((Flag::$flag, true));
                } else if self.$neg {
                    overrides.push((Flag::$flag, false));
                }
            };
        }
        push_pair!(Synonyms, synonyms, no_synonyms);
        push_pair!(LineComments, line_comments, no_line_comments);
        push_pair!(PrefixLiterals, prefix_literals, no_prefix_literals);
        push_pair!(OctalLiterals, octal_literals, no_octal_literals);
        push_pair!(
            EscapeTabAndNewline,
            escape_tab_and_newline,
            no_escape_tab_and_newline
        );
        push_pair!(SubtypeCardinals, subtype_cardinals, no_subtype_cardinals);
        push_pair!(
            SafeStringTermination,
            safe_string_termination,
            no_safe_string_termination
        );
        push_pair!(ErrantSemicolon, errant_semicolon, no_errant_semicolon);
        push_pair!(
            LowlineIdentifiers,
            lowline_identifiers,
            no_lowline_identifiers
        );
        push_pair!(ConstParameters, const_parameters, no_const_parameters);
        push_pair!(AdditionalTypes, additional_types, no_additional_types);
        push_pair!(
            UnifiedConversion,
            unified_conversion,
            no_unified_conversion
        );
        push_pair!(UnifiedCast, unified_cast, no_unified_cast);
        push_pair!(Coroutines, coroutines, no_coroutines);
        push_pair!(VariantRecords, variant_records, no_variant_records);
        push_pair!(LocalModules, local_modules, no_local_modules);
        push_pair!(LexerDebug, lexer_debug, no_lexer_debug);
        push_pair!(ParserDebug, parser_debug, no_parser_debug);
        overrides
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let mut name = self.file.clone().into_os_string();
                name.push(".ast");
                PathBuf::from(name)
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose || cli.lexer_debug || cli.parser_debug {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level).unwrap();

    let mut options = match Options::from_cli(cli.preset(), &cli.overrides()) {
        Ok(options) => options,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(1);
        }
    };
    options.verbose = cli.verbose;

    let outcome = match compile_file(&cli.file, options, SourceType::Any) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    if outcome.diagnostics.borrow().warning_count() > 0 || outcome.had_errors() {
        let mut stderr = std::io::stderr();
        let _ = outcome
            .diagnostics
            .borrow()
            .render(&mut stderr, &outcome.reader, &outcome.pool);
    }

    let output_path = cli.output_path();
    match writer::write_to_path(&outcome.root, &output_path) {
        writer::WriteStatus::Success { chars_written } => {
            info!("wrote {chars_written} characters to {}", output_path.display());
        }
        status => {
            error!("{status}");
            return ExitCode::from(4);
        }
    }

    if outcome.had_errors() {
        ExitCode::from(3)
    } else {
        ExitCode::from(0)
    }
}
