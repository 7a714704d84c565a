//! Read-only dialect flags consumed by the lexer and parser.
//!
//! Values are seeded from [`Options::defaults`], then optionally overlaid by a PIM3 or
//! PIM4 preset (mutually exclusive), then overlaid by individual flag arguments. Nothing
//! downstream of construction ever mutates an `Options` value.

/// One boolean dialect toggle. Used both as a struct field selector (via
/// [`Options::set`]) and as the vocabulary the CLI's `--flag`/`--no-flag` pairs bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Verbose,
    Synonyms,
    LineComments,
    PrefixLiterals,
    OctalLiterals,
    EscapeTabAndNewline,
    SubtypeCardinals,
    SafeStringTermination,
    ErrantSemicolon,
    LowlineIdentifiers,
    ConstParameters,
    AdditionalTypes,
    UnifiedConversion,
    UnifiedCast,
    Coroutines,
    VariantRecords,
    LocalModules,
    LexerDebug,
    ParserDebug,
}

impl Flag {
    pub const ALL: [Flag; 19] = [
        Flag::Verbose,
        Flag::Synonyms,
        Flag::LineComments,
        Flag::PrefixLiterals,
        Flag::OctalLiterals,
        Flag::EscapeTabAndNewline,
        Flag::SubtypeCardinals,
        Flag::SafeStringTermination,
        Flag::ErrantSemicolon,
        Flag::LowlineIdentifiers,
        Flag::ConstParameters,
        Flag::AdditionalTypes,
        Flag::UnifiedConversion,
        Flag::UnifiedCast,
        Flag::Coroutines,
        Flag::VariantRecords,
        Flag::LocalModules,
        Flag::LexerDebug,
        Flag::ParserDebug,
    ];

    /// The `--flag` / `--no-flag` spelling used by the CLI, e.g. `"errant-semicolon"`.
    pub fn cli_name(self) -> &'static str {
        match self {
            Flag::Verbose => "verbose",
            Flag::Synonyms => "synonyms",
            Flag::LineComments => "line-comments",
            Flag::PrefixLiterals => "prefix-literals",
            Flag::OctalLiterals => "octal-literals",
            Flag::EscapeTabAndNewline => "escape-tab-and-newline",
            Flag::SubtypeCardinals => "subtype-cardinals",
            Flag::SafeStringTermination => "safe-string-termination",
            Flag::ErrantSemicolon => "errant-semicolon",
            Flag::LowlineIdentifiers => "lowline-identifiers",
            Flag::ConstParameters => "const-parameters",
            Flag::AdditionalTypes => "additional-types",
            Flag::UnifiedConversion => "unified-conversion",
            Flag::UnifiedCast => "unified-cast",
            Flag::Coroutines => "coroutines",
            Flag::VariantRecords => "variant-records",
            Flag::LocalModules => "local-modules",
            Flag::LexerDebug => "lexer-debug",
            Flag::ParserDebug => "parser-debug",
        }
    }
}

/// A dialect preset applied before individual flag overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Plain defaults, no preset selected.
    None,
    Pim3,
    Pim4,
}

/// Raised by [`Options::from_cli`] when the CLI surface's mutual-exclusion rule is
/// violated: `--pim3`/`--pim4` may not be combined with each other, nor with any
/// individual `--flag`/`--no-flag` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictingPresetError {
    BothPresets,
    PresetWithIndividualFlag(Flag),
}

impl std::fmt::Display for ConflictingPresetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictingPresetError::BothPresets => {
                f.write_str("--pim3 and --pim4 are mutually exclusive")
            }
            ConflictingPresetError::PresetWithIndividualFlag(flag) => write!(
                f,
                "--pim3/--pim4 may not be combined with --{}",
                flag.cli_name()
            ),
        }
    }
}

impl std::error::Error for ConflictingPresetError {}

/// Read-only boolean flags consumed by the Lexer and Parser.
///
/// The core depends only on `synonyms`, `line_comments`, `prefix_literals`,
/// `octal_literals`, `escape_tab_and_newline`, `errant_semicolon`, `lowline_identifiers`,
/// `variant_records`, and the `*_debug` flags; the remaining flags are carried for
/// completeness and for semantic-analysis stages outside this crate's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub verbose: bool,
    pub synonyms: bool,
    pub line_comments: bool,
    pub prefix_literals: bool,
    pub octal_literals: bool,
    pub escape_tab_and_newline: bool,
    pub subtype_cardinals: bool,
    pub safe_string_termination: bool,
    pub errant_semicolon: bool,
    pub lowline_identifiers: bool,
    pub const_parameters: bool,
    pub additional_types: bool,
    pub unified_conversion: bool,
    pub unified_cast: bool,
    pub coroutines: bool,
    pub variant_records: bool,
    pub local_modules: bool,
    pub lexer_debug: bool,
    pub parser_debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Options {
    /// The baseline values before any preset or individual flag is applied.
    pub fn defaults() -> Self {
        Options {
            verbose: false,
            synonyms: false,
            line_comments: true,
            prefix_literals: false,
            octal_literals: false,
            escape_tab_and_newline: true,
            subtype_cardinals: false,
            safe_string_termination: false,
            errant_semicolon: true,
            lowline_identifiers: false,
            const_parameters: false,
            additional_types: false,
            unified_conversion: false,
            unified_cast: false,
            coroutines: false,
            variant_records: false,
            local_modules: false,
            lexer_debug: false,
            parser_debug: false,
        }
    }

    /// Build options for a given preset, ready to be overlaid with individual flags.
    pub fn with_preset(preset: Preset) -> Self {
        let mut opts = Self::defaults();
        match preset {
            Preset::None => {}
            Preset::Pim3 => {
                opts.synonyms = true;
                opts.prefix_literals = false;
                opts.octal_literals = true;
                opts.variant_records = true;
                opts.local_modules = true;
            }
            Preset::Pim4 => {
                opts.synonyms = true;
                opts.prefix_literals = true;
                opts.octal_literals = false;
                opts.const_parameters = true;
                opts.unified_conversion = true;
                opts.unified_cast = true;
                opts.variant_records = false;
            }
        }
        opts
    }

    /// Overlay a single named flag, as the CLI does per `--flag`/`--no-flag` argument.
    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Verbose => self.verbose = value,
            Flag::Synonyms => self.synonyms = value,
            Flag::LineComments => self.line_comments = value,
            Flag::PrefixLiterals => self.prefix_literals = value,
            Flag::OctalLiterals => self.octal_literals = value,
            Flag::EscapeTabAndNewline => self.escape_tab_and_newline = value,
            Flag::SubtypeCardinals => self.subtype_cardinals = value,
            Flag::SafeStringTermination => self.safe_string_termination = value,
            Flag::ErrantSemicolon => self.errant_semicolon = value,
            Flag::LowlineIdentifiers => self.lowline_identifiers = value,
            Flag::ConstParameters => self.const_parameters = value,
            Flag::AdditionalTypes => self.additional_types = value,
            Flag::UnifiedConversion => self.unified_conversion = value,
            Flag::UnifiedCast => self.unified_cast = value,
            Flag::Coroutines => self.coroutines = value,
            Flag::VariantRecords => self.variant_records = value,
            Flag::LocalModules => self.local_modules = value,
            Flag::LexerDebug => self.lexer_debug = value,
            Flag::ParserDebug => self.parser_debug = value,
        }
    }

    /// Build the effective options the CLI passes to the Lexer/Parser: `preset` overlaid
    /// by `overrides` in order, rejecting a preset combined with either another preset or
    /// any individual flag.
    pub fn from_cli(
        preset: Preset,
        overrides: &[(Flag, bool)],
    ) -> Result<Options, ConflictingPresetError> {
        if preset != Preset::None && !overrides.is_empty() {
            return Err(ConflictingPresetError::PresetWithIndividualFlag(overrides[0].0));
        }
        let mut opts = Self::with_preset(preset);
        for &(flag, value) in overrides {
            opts.set(flag, value);
        }
        Ok(opts)
    }

    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Verbose => self.verbose,
            Flag::Synonyms => self.synonyms,
            Flag::LineComments => self.line_comments,
            Flag::PrefixLiterals => self.prefix_literals,
            Flag::OctalLiterals => self.octal_literals,
            Flag::EscapeTabAndNewline => self.escape_tab_and_newline,
            Flag::SubtypeCardinals => self.subtype_cardinals,
            Flag::SafeStringTermination => self.safe_string_termination,
            Flag::ErrantSemicolon => self.errant_semicolon,
            Flag::LowlineIdentifiers => self.lowline_identifiers,
            Flag::ConstParameters => self.const_parameters,
            Flag::AdditionalTypes => self.additional_types,
            Flag::UnifiedConversion => self.unified_conversion,
            Flag::UnifiedCast => self.unified_cast,
            Flag::Coroutines => self.coroutines,
            Flag::VariantRecords => self.variant_records,
            Flag::LocalModules => self.local_modules,
            Flag::LexerDebug => self.lexer_debug,
            Flag::ParserDebug => self.parser_debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_errant_semicolon_warning_mode() {
        let opts = Options::defaults();
        assert!(opts.errant_semicolon);
        assert!(!opts.variant_records);
    }

    #[test]
    fn pim3_preset_enables_octal_and_variant_records() {
        let opts = Options::with_preset(Preset::Pim3);
        assert!(opts.octal_literals);
        assert!(opts.variant_records);
        assert!(!opts.prefix_literals);
    }

    #[test]
    fn pim4_preset_prefers_prefix_literals_and_const_parameters() {
        let opts = Options::with_preset(Preset::Pim4);
        assert!(opts.prefix_literals);
        assert!(opts.const_parameters);
        assert!(!opts.variant_records);
    }

    #[test]
    fn individual_flag_overlay_wins_over_preset() {
        let mut opts = Options::with_preset(Preset::Pim3);
        opts.set(Flag::OctalLiterals, false);
        assert!(!opts.octal_literals);
    }

    #[test]
    fn from_cli_with_no_preset_applies_overrides_in_order() {
        let opts = Options::from_cli(Preset::None, &[(Flag::Verbose, true)]).unwrap();
        assert!(opts.verbose);
    }

    #[test]
    fn from_cli_rejects_preset_combined_with_an_individual_flag() {
        let err = Options::from_cli(Preset::Pim3, &[(Flag::OctalLiterals, false)]).unwrap_err();
        assert_eq!(err, ConflictingPresetError::PresetWithIndividualFlag(Flag::OctalLiterals));
    }

    #[test]
    fn from_cli_with_a_preset_and_no_overrides_succeeds() {
        let opts = Options::from_cli(Preset::Pim4, &[]).unwrap();
        assert!(opts.prefix_literals);
    }
}
