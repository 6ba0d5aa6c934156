//! Tokenizer for the decorated-class source language (`SPEC_FULL.md §4.2`).

/// A token with source position information (teacher idiom: `parser::Token`
/// tracks 0-indexed line/column so positions convert directly to the
/// 1-indexed form `CompileError` displays).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    // Keywords
    Class,
    Interface,
    Const,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    New,
    True,
    False,
    Null,
    This,
    Public,
    Private,
    Protected,
    Static,
    // Punctuation
    At,       // @
    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Semi,     // ;
    Comma,    // ,
    Dot,      // .
    Colon,    // :
    Eof,
    // Operators, longest-match-first
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    ShiftL,
    ShiftR,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Lt,
    Gt,
    Not,
    Amp,
    Pipe,
    Caret,
    Tilde,
}

/// Tokenize a whole source file. Unterminated string literals are reported
/// as a `StringLit` containing everything up to EOF; the parser surfaces the
/// error with position info rather than the tokenizer panicking.
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 0;
    let mut col = 0;

    macro_rules! push {
        ($kind:expr, $len:expr) => {{
            tokens.push(Token {
                kind: $kind,
                line,
                column: col,
            });
            for _ in 0..$len {
                advance(&chars, &mut i, &mut line, &mut col);
            }
        }};
    }

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            advance(&chars, &mut i, &mut line, &mut col);
            continue;
        }
        if c.is_whitespace() {
            advance(&chars, &mut i, &mut line, &mut col);
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                advance(&chars, &mut i, &mut line, &mut col);
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            advance(&chars, &mut i, &mut line, &mut col);
            advance(&chars, &mut i, &mut line, &mut col);
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                advance(&chars, &mut i, &mut line, &mut col);
            }
            if i < chars.len() {
                advance(&chars, &mut i, &mut line, &mut col);
                advance(&chars, &mut i, &mut line, &mut col);
            }
            continue;
        }
        if c.is_ascii_digit() {
            let (start_line, start_col) = (line, col);
            let mut text = String::new();
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    if is_float || chars.get(i + 1) == Some(&'.') {
                        break;
                    }
                    is_float = true;
                }
                text.push(chars[i]);
                advance(&chars, &mut i, &mut line, &mut col);
            }
            let kind = if is_float {
                TokenKind::FloatLit(text.parse().unwrap_or(0.0))
            } else {
                TokenKind::IntLit(text.parse().unwrap_or(0))
            };
            tokens.push(Token {
                kind,
                line: start_line,
                column: start_col,
            });
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let (start_line, start_col) = (line, col);
            let mut text = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                text.push(chars[i]);
                advance(&chars, &mut i, &mut line, &mut col);
            }
            let kind = keyword_or_ident(&text);
            tokens.push(Token {
                kind,
                line: start_line,
                column: start_col,
            });
            continue;
        }
        if c == '"' {
            let (start_line, start_col) = (line, col);
            advance(&chars, &mut i, &mut line, &mut col);
            let mut text = String::new();
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    advance(&chars, &mut i, &mut line, &mut col);
                    match chars[i] {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        '"' => text.push('"'),
                        '\\' => text.push('\\'),
                        other => text.push(other),
                    }
                    advance(&chars, &mut i, &mut line, &mut col);
                } else {
                    text.push(chars[i]);
                    advance(&chars, &mut i, &mut line, &mut col);
                }
            }
            if i < chars.len() {
                advance(&chars, &mut i, &mut line, &mut col); // closing quote
            }
            tokens.push(Token {
                kind: TokenKind::StringLit(text),
                line: start_line,
                column: start_col,
            });
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('+', Some('=')) => push!(TokenKind::PlusEq, 2),
            ('-', Some('=')) => push!(TokenKind::MinusEq, 2),
            ('*', Some('=')) => push!(TokenKind::StarEq, 2),
            ('/', Some('=')) => push!(TokenKind::SlashEq, 2),
            ('=', Some('=')) => push!(TokenKind::EqEq, 2),
            ('!', Some('=')) => push!(TokenKind::NotEq, 2),
            ('<', Some('=')) => push!(TokenKind::LtEq, 2),
            ('>', Some('=')) => push!(TokenKind::GtEq, 2),
            ('&', Some('&')) => push!(TokenKind::AndAnd, 2),
            ('|', Some('|')) => push!(TokenKind::OrOr, 2),
            ('<', Some('<')) => push!(TokenKind::ShiftL, 2),
            ('>', Some('>')) => push!(TokenKind::ShiftR, 2),
            ('@', _) => push!(TokenKind::At, 1),
            ('{', _) => push!(TokenKind::LBrace, 1),
            ('}', _) => push!(TokenKind::RBrace, 1),
            ('(', _) => push!(TokenKind::LParen, 1),
            (')', _) => push!(TokenKind::RParen, 1),
            ('[', _) => push!(TokenKind::LBracket, 1),
            (']', _) => push!(TokenKind::RBracket, 1),
            (';', _) => push!(TokenKind::Semi, 1),
            (',', _) => push!(TokenKind::Comma, 1),
            ('.', _) => push!(TokenKind::Dot, 1),
            (':', _) => push!(TokenKind::Colon, 1),
            ('+', _) => push!(TokenKind::Plus, 1),
            ('-', _) => push!(TokenKind::Minus, 1),
            ('*', _) => push!(TokenKind::Star, 1),
            ('/', _) => push!(TokenKind::Slash, 1),
            ('%', _) => push!(TokenKind::Percent, 1),
            ('=', _) => push!(TokenKind::Eq, 1),
            ('<', _) => push!(TokenKind::Lt, 1),
            ('>', _) => push!(TokenKind::Gt, 1),
            ('!', _) => push!(TokenKind::Not, 1),
            ('&', _) => push!(TokenKind::Amp, 1),
            ('|', _) => push!(TokenKind::Pipe, 1),
            ('^', _) => push!(TokenKind::Caret, 1),
            ('~', _) => push!(TokenKind::Tilde, 1),
            _ => {
                // Unrecognized character: skip it. The parser will trip on
                // the resulting malformed token stream and report a
                // position-accurate syntax error rather than the tokenizer
                // guessing at recovery.
                advance(&chars, &mut i, &mut line, &mut col);
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
        column: col,
    });
    tokens
}

fn advance(chars: &[char], i: &mut usize, line: &mut usize, col: &mut usize) {
    if chars.get(*i) == Some(&'\n') {
        *line += 1;
        *col = 0;
    } else {
        *col += 1;
    }
    *i += 1;
}

fn keyword_or_ident(text: &str) -> TokenKind {
    match text {
        "class" => TokenKind::Class,
        "interface" => TokenKind::Interface,
        "const" => TokenKind::Const,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "return" => TokenKind::Return,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "new" => TokenKind::New,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "this" => TokenKind::This,
        "public" => TokenKind::Public,
        "private" => TokenKind::Private,
        "protected" => TokenKind::Protected,
        "static" => TokenKind::Static,
        _ => TokenKind::Ident(text.to_string()),
    }
}
