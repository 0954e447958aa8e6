use winnow::prelude::*;
use winnow::ascii::{digit0, digit1, line_ending, multispace0, space0, space1, till_line_ending};
use winnow::combinator::{alt, fail, opt, separated};
use winnow::error::{ContextError, ParserError, StrContext};
use winnow::token::{one_of, take_while};

use crate::snippet_ast::*;

/// Deepest nesting of brackets, subscripts and unary minus in one expression.
pub const MAX_NESTING: usize = 64;

const TOO_DEEP: &str = "nesting limit";

const BLOCK_KEYWORDS: [&str; 14] = [
    "for", "while", "if", "elif", "else", "def", "class", "with", "try", "except", "lambda",
    "return", "del", "async",
];

pub fn parse_snippet(source: &str) -> Result<Snippet, String> {
    let mut input = source;
    let mut statements = Vec::new();

    loop {
        skip_blank_lines(&mut input);
        if input.is_empty() {
            break;
        }
        let line = line_number(source, input);
        if let Some(keyword) = leading_keyword(input) {
            return Err(format!(
                "unsupported statement on line {line}: `{keyword}` is not allowed, \
                 only imports, assignments and calls are"
            ));
        }
        let kind = statement(&mut input).map_err(|e| statement_error(source, input, line, &e))?;
        end_of_statement(&mut input).map_err(|_| syntax_error(source, input))?;
        statements.push(Stmt { line, kind });
    }

    Ok(Snippet { statements })
}

fn line_number(source: &str, rest: &str) -> usize {
    source[..source.len() - rest.len()].matches('\n').count() + 1
}

fn statement_error(source: &str, rest: &str, line: usize, error: &ContextError) -> String {
    let too_deep = error
        .context()
        .any(|c| matches!(c, StrContext::Label(label) if *label == TOO_DEEP));
    if too_deep {
        return format!(
            "syntax error on line {line}: expression nests more than {MAX_NESTING} levels deep"
        );
    }
    syntax_error(source, rest)
}

fn syntax_error(source: &str, rest: &str) -> String {
    let line = line_number(source, rest);
    let context = rest.lines().next().unwrap_or("").trim();
    if context.is_empty() {
        return format!("syntax error on line {line}: unexpected end of input");
    }
    let context_display = if context.chars().count() > 40 {
        format!("{}...", context.chars().take(40).collect::<String>())
    } else {
        context.to_string()
    };
    format!("syntax error on line {line}: unexpected `{context_display}`")
}

fn leading_keyword(input: &str) -> Option<&'static str> {
    let word = input
        .trim_start_matches([' ', '\t'])
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()?;
    BLOCK_KEYWORDS.into_iter().find(|k| *k == word)
}

fn skip_blank_lines(input: &mut &str) {
    loop {
        let rest = input.trim_start_matches([' ', '\t']);
        let rest = if rest.starts_with('#') {
            rest.find('\n').map_or("", |i| &rest[i..])
        } else {
            rest
        };
        if let Some(next) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
            *input = next;
        } else {
            if rest.is_empty() {
                *input = rest;
            }
            return;
        }
    }
}

fn statement(input: &mut &str) -> winnow::Result<StmtKind> {
    space0.parse_next(input)?;
    alt((import_stmt, from_import_stmt, assign_or_expr)).parse_next(input)
}

fn end_of_statement(input: &mut &str) -> winnow::Result<()> {
    space0.parse_next(input)?;
    if opt(';').parse_next(input)?.is_some() {
        return Ok(());
    }
    opt(comment).parse_next(input)?;
    if input.is_empty() {
        return Ok(());
    }
    line_ending.void().parse_next(input)
}

fn comment(input: &mut &str) -> winnow::Result<()> {
    '#'.parse_next(input)?;
    till_line_ending.void().parse_next(input)
}

/// Whitespace inside brackets, where newlines and comments are allowed.
fn ws(input: &mut &str) -> winnow::Result<()> {
    loop {
        multispace0.parse_next(input)?;
        if input.starts_with('#') {
            comment.parse_next(input)?;
        } else {
            return Ok(());
        }
    }
}

fn expect_char(input: &mut &str, c: char) -> winnow::Result<()> {
    match input.strip_prefix(c) {
        Some(rest) => {
            *input = rest;
            Ok(())
        }
        None => Err(ParserError::from_input(input)),
    }
}

// =============================================================================
// Imports
// =============================================================================

fn import_stmt(input: &mut &str) -> winnow::Result<StmtKind> {
    ("import", space1).parse_next(input)?;
    let names: Vec<ImportName> =
        separated(1.., module_alias, (space0, ',', space0)).parse_next(input)?;
    Ok(StmtKind::Import(names))
}

fn from_import_stmt(input: &mut &str) -> winnow::Result<StmtKind> {
    ("from", space1).parse_next(input)?;
    let module = dotted_name.parse_next(input)?;
    (space1, "import", space1).parse_next(input)?;

    let names = if opt('*').parse_next(input)?.is_some() {
        vec![ImportName {
            name: "*".to_string(),
            alias: None,
        }]
    } else {
        separated(1.., name_alias, (space0, ',', space0)).parse_next(input)?
    };
    Ok(StmtKind::FromImport { module, names })
}

fn module_alias(input: &mut &str) -> winnow::Result<ImportName> {
    let name = dotted_name.parse_next(input)?;
    let alias = opt(alias).parse_next(input)?;
    Ok(ImportName { name, alias })
}

fn name_alias(input: &mut &str) -> winnow::Result<ImportName> {
    let name = identifier.parse_next(input)?.to_string();
    let alias = opt(alias).parse_next(input)?;
    Ok(ImportName { name, alias })
}

fn alias(input: &mut &str) -> winnow::Result<String> {
    (space1, "as", space1).parse_next(input)?;
    Ok(identifier.parse_next(input)?.to_string())
}

fn dotted_name(input: &mut &str) -> winnow::Result<String> {
    let mut name = identifier.parse_next(input)?.to_string();
    while input.starts_with('.') {
        expect_char(input, '.')?;
        name.push('.');
        name.push_str(identifier.parse_next(input)?);
    }
    Ok(name)
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

// =============================================================================
// Assignments and expressions
// =============================================================================

fn assign_or_expr(input: &mut &str) -> winnow::Result<StmtKind> {
    let target = expr(input, 0)?;
    space0.parse_next(input)?;
    if input.starts_with('=') && !input.starts_with("==") {
        expect_char(input, '=')?;
        space0.parse_next(input)?;
        let value = expr(input, 0)?;
        return Ok(StmtKind::Assign { target, value });
    }
    Ok(StmtKind::Expr(target))
}

fn too_deep(input: &mut &str) -> winnow::Result<Expr> {
    fail::<_, Expr, _>
        .context(StrContext::Label(TOO_DEEP))
        .parse_next(input)
}

/// `depth` counts the enclosing brackets, negations and postfix operations.
fn expr(input: &mut &str, mut depth: usize) -> winnow::Result<Expr> {
    if depth > MAX_NESTING {
        return too_deep(input);
    }
    if input.starts_with('-') {
        expect_char(input, '-')?;
        space0.parse_next(input)?;
        let operand = expr(input, depth + 1)?;
        return Ok(Expr::Neg(Box::new(operand)));
    }

    let mut value = primary(input, depth)?;
    loop {
        let checkpoint = *input;
        space0.parse_next(input)?;
        if input.starts_with(['.', '(', '[']) {
            depth += 1;
            if depth > MAX_NESTING {
                return too_deep(input);
            }
        }
        match input.chars().next() {
            Some('.') => {
                expect_char(input, '.')?;
                let attr = identifier.parse_next(input)?.to_string();
                value = Expr::Attr {
                    value: Box::new(value),
                    attr,
                };
            }
            Some('(') => {
                let (args, kwargs) = call_args(input, depth)?;
                value = Expr::Call {
                    func: Box::new(value),
                    args,
                    kwargs,
                };
            }
            Some('[') => {
                expect_char(input, '[')?;
                ws(input)?;
                let index = expr(input, depth)?;
                ws(input)?;
                expect_char(input, ']')?;
                value = Expr::Index {
                    value: Box::new(value),
                    index: Box::new(index),
                };
            }
            _ => {
                *input = checkpoint;
                break;
            }
        }
    }
    Ok(value)
}

fn primary(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    match input.chars().next() {
        Some('\'' | '"') => string_literal.map(Expr::Str).parse_next(input),
        Some('[') => sequence(input, '[', ']', depth + 1).map(|(items, _)| Expr::List(items)),
        Some('(') => paren_or_tuple(input, depth + 1),
        Some('{') => dict(input, depth + 1),
        Some(c) if c.is_ascii_digit() => number(input),
        Some(c) if c.is_alphabetic() || c == '_' => {
            let name = identifier.parse_next(input)?;
            Ok(match name {
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                "None" => Expr::None,
                _ => Expr::Name(name.to_string()),
            })
        }
        _ => Err(ParserError::from_input(input)),
    }
}

fn number(input: &mut &str) -> winnow::Result<Expr> {
    let text = (
        digit1,
        opt(('.', digit0)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;
    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(Expr::Float)
    } else {
        text.parse::<i64>().ok().map(Expr::Int)
    };
    parsed.ok_or_else(|| ParserError::from_input(input))
}

fn string_literal(input: &mut &str) -> winnow::Result<String> {
    let quote: char = one_of(['\'', '"']).parse_next(input)?;
    let mut text = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => {
                *input = &input[i + c.len_utf8()..];
                return Ok(text);
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            '\n' => break,
            c => text.push(c),
        }
    }
    Err(ParserError::from_input(input))
}

/// Items between `open` and `close`; the flag reports a trailing comma.
fn sequence(
    input: &mut &str,
    open: char,
    close: char,
    depth: usize,
) -> winnow::Result<(Vec<Expr>, bool)> {
    expect_char(input, open)?;
    let mut items = Vec::new();
    let mut trailing_comma = false;
    loop {
        ws(input)?;
        if input.starts_with(close) {
            expect_char(input, close)?;
            return Ok((items, trailing_comma));
        }
        items.push(expr(input, depth)?);
        ws(input)?;
        trailing_comma = opt(',').parse_next(input)?.is_some();
        if !trailing_comma {
            ws(input)?;
            expect_char(input, close)?;
            return Ok((items, false));
        }
    }
}

fn paren_or_tuple(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    let (mut items, trailing_comma) = sequence(input, '(', ')', depth)?;
    if items.len() == 1 && !trailing_comma {
        return Ok(items.remove(0));
    }
    Ok(Expr::Tuple(items))
}

fn dict(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    expect_char(input, '{')?;
    let mut entries = Vec::new();
    loop {
        ws(input)?;
        if input.starts_with('}') {
            break;
        }
        let key = expr(input, depth)?;
        ws(input)?;
        expect_char(input, ':')?;
        ws(input)?;
        let value = expr(input, depth)?;
        entries.push((key, value));
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            ws(input)?;
            break;
        }
    }
    expect_char(input, '}')?;
    Ok(Expr::Dict(entries))
}

fn call_args(input: &mut &str, depth: usize) -> winnow::Result<(Vec<Expr>, Vec<(String, Expr)>)> {
    expect_char(input, '(')?;
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    loop {
        ws(input)?;
        if input.starts_with(')') {
            break;
        }
        if let Some(name) = opt(keyword_name).parse_next(input)? {
            ws(input)?;
            kwargs.push((name.to_string(), expr(input, depth)?));
        } else if kwargs.is_empty() {
            args.push(expr(input, depth)?);
        } else {
            // positional argument after a keyword argument
            return Err(ParserError::from_input(input));
        }
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            ws(input)?;
            break;
        }
    }
    expect_char(input, ')')?;
    Ok((args, kwargs))
}

fn keyword_name<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    let name = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    expect_char(input, '=')?;
    if input.starts_with('=') {
        return Err(ParserError::from_input(input));
    }
    Ok(name)
}
