//! LALRPOP-based parser and compiler front end for datapol policies
//!
//! Uses a LALRPOP grammar over the logos lexer to build a raw syntax tree,
//! then converts it into formulas with `SyntaxConverter`.

use std::fmt;
use std::path::Path;

use datapol_ast::{DatapolError, Formula, SourceMap, Span, Spanned, Theories};
use datapol_lexer::{Lexer, SpannedToken, Token};
use lalrpop_util::ParseError;
use tracing::debug;

lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all, clippy::pedantic, clippy::nursery, unused_imports)]
    pub datapol
);

// String processing utilities
pub mod string_utils;

pub mod syntax;
pub mod tree;

// Fresh variable naming for column references
pub mod variable_resolver;

pub use syntax::SyntaxConverter;
pub use tree::{RawFormula, TreeNode, program_tree, render_tree};

pub struct Parser {
    input: String,
    source_map: SourceMap,
    filename: String,
    tokens: Vec<SpannedToken>,
}

impl Parser {
    /// Create a new parser for the given input
    ///
    /// # Errors
    ///
    /// Returns `DatapolError` if there are lexical errors in the input
    pub fn new(input: &str) -> Result<Self, DatapolError> {
        Self::new_with_filename(input, "<input>")
    }

    /// Create a new parser for the given input with a filename
    ///
    /// # Errors
    ///
    /// Returns `DatapolError` if there are lexical errors in the input
    pub fn new_with_filename(input: &str, filename: &str) -> Result<Self, DatapolError> {
        let source_map = SourceMap::new(input);

        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();

        if let Some(token) = tokens.iter().find(|token| token.token == Token::Error) {
            return Err(DatapolError::lex(
                format!("Unexpected character: {}", token.text),
                token.span,
                &source_map,
                filename,
            ));
        }

        Ok(Self {
            input: input.to_string(),
            source_map,
            filename: filename.to_string(),
            tokens,
        })
    }

    /// Parse the input into a raw syntax tree
    ///
    /// # Errors
    ///
    /// Returns `DatapolError` if there are syntax errors during parsing
    pub fn parse(&self) -> Result<Vec<Spanned<RawFormula>>, DatapolError> {
        // Comments and the end marker never reach the grammar
        let lalrpop_tokens = self
            .tokens
            .iter()
            .filter(|token| !matches!(token.token, Token::Comment | Token::Eof))
            .cloned()
            .map(|token| {
                let start = token.span.start;
                let end = token.span.end;
                Ok::<_, ()>((start, token, end))
            });

        let parser = datapol::ProgramParser::new();
        parser.parse(lalrpop_tokens).map_err(|err| self.syntax_error(err))
    }

    fn syntax_error(&self, err: ParseError<usize, SpannedToken, ()>) -> DatapolError {
        let end = self.input.len();
        let (message, span) = match err {
            ParseError::InvalidToken { location } => {
                ("Invalid token".to_string(), Span::new(location, location))
            }
            ParseError::UnrecognizedEof { expected, .. } => (
                format!("Unexpected end of input, expected one of {}", expected.join(", ")),
                Span::new(end, end),
            ),
            ParseError::UnrecognizedToken {
                token: (start, token, stop),
                expected,
            } => (
                format!(
                    "Unexpected token '{}', expected one of {}",
                    token.text,
                    expected.join(", ")
                ),
                Span::new(start, stop),
            ),
            ParseError::ExtraToken {
                token: (start, token, stop),
            } => (
                format!("Extra token '{}'", token.text),
                Span::new(start, stop),
            ),
            ParseError::User { .. } => ("Parse error".to_string(), Span::new(0, end)),
        };
        DatapolError::syntax(message, span, &self.source_map, &self.filename)
    }

    /// Get access to the source map for error reporting
    #[must_use]
    pub const fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Get access to the tokens (useful for debugging)
    #[must_use]
    pub fn tokens(&self) -> &[SpannedToken] {
        &self.tokens
    }
}

/// Accumulates formulas, errors and warnings across policy sources
#[derive(Debug, Default)]
pub struct Compiler {
    pub theory: Vec<Formula>,
    pub errors: Vec<DatapolError>,
    pub warnings: Vec<DatapolError>,
    raw_tree: Option<TreeNode>,
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `input` and append its formulas to `theory`
    ///
    /// # Errors
    ///
    /// Returns the lexical or syntax error that stopped parsing, or
    /// `DatapolError::Compile` with every conversion error found
    pub fn read_source(
        &mut self,
        input: &str,
        filename: &str,
        theories: &Theories,
        use_modules: bool,
    ) -> Result<(), DatapolError> {
        let parser = Parser::new_with_filename(input, filename)?;
        let program = parser.parse()?;
        self.raw_tree = Some(program_tree(&program));

        let mut converter = SyntaxConverter::new(theories, use_modules, parser.source_map(), input);
        let formulas = converter.convert(&program);
        let errors = converter.into_errors();
        debug!(
            filename,
            formulas = formulas.len(),
            errors = errors.len(),
            "compiled policy source"
        );

        self.theory.extend(formulas);
        self.errors.extend(errors);
        self.raise_errors()
    }

    /// Read and compile a policy file
    ///
    /// # Errors
    ///
    /// Returns `DatapolError::Io` when the file cannot be read, otherwise as
    /// [`Compiler::read_source`]
    pub fn read_file(
        &mut self,
        path: &Path,
        theories: &Theories,
        use_modules: bool,
    ) -> Result<(), DatapolError> {
        let name = path.display().to_string();
        let input = std::fs::read_to_string(path).map_err(|err| DatapolError::io(&name, &err))?;
        self.read_source(&input, &name, theories, use_modules)
    }

    pub fn sigerr(&mut self, error: DatapolError) {
        self.errors.push(error);
    }

    pub fn sigwarn(&mut self, warning: DatapolError) {
        self.warnings.push(warning);
    }

    /// # Errors
    ///
    /// Returns `DatapolError::Compile` when any error has been signalled
    pub fn raise_errors(&self) -> Result<(), DatapolError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DatapolError::Compile {
                errors: self.errors.clone(),
            })
        }
    }

    /// Raw tree of the most recent source
    #[must_use]
    pub const fn raw_tree(&self) -> Option<&TreeNode> {
        self.raw_tree.as_ref()
    }

    /// Rendering of the most recent raw tree, empty before any source is read
    #[must_use]
    pub fn print_parse_result(&self) -> String {
        self.raw_tree
            .as_ref()
            .map(|tree| render_tree(tree, 1))
            .unwrap_or_default()
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**Theory**")?;
        let formulas = self
            .theory
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        write!(f, "{formulas}")
    }
}

/// Compile a policy string
///
/// # Errors
///
/// Returns the first lexical/syntax error or the aggregated compile errors
pub fn parse(
    policy: &str,
    theories: &Theories,
    use_modules: bool,
) -> Result<Vec<Formula>, DatapolError> {
    let mut compiler = Compiler::new();
    compiler.read_source(policy, "<input>", theories, use_modules)?;
    Ok(compiler.theory)
}

/// Compile a policy string and return its first formula
///
/// # Errors
///
/// As [`parse`], or a policy error when the string holds no formula
pub fn parse1(policy: &str, theories: &Theories, use_modules: bool) -> Result<Formula, DatapolError> {
    parse(policy, theories, use_modules)?
        .into_iter()
        .next()
        .ok_or_else(|| DatapolError::policy("Policy contains no formulas"))
}

/// Compile a policy file with service prefixes enabled
///
/// # Errors
///
/// As [`Compiler::read_file`]
pub fn parse_file(path: &Path, theories: &Theories) -> Result<Vec<Formula>, DatapolError> {
    let mut compiler = Compiler::new();
    compiler.read_file(path, theories, true)?;
    Ok(compiler.theory)
}
