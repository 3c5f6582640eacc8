// Formula parser - converts rule formula strings into `Expr`
// Supports: numbers, column refs ([name]), + - * /, unary minus, postfix %,
// max(...), min(...), if(a <cmp> b, then, else)

use crate::expr::{ArithOp, Comparison, Expr, Extremum};

/// Parse a formula string. Column names inside `[...]` are trimmed and
/// lower-cased the same way sheet headers are.
pub fn parse(formula: &str) -> Result<Expr, String> {
    let tokens = tokenize(formula.trim())?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos < tokens.len() {
        return Err(format!("Unexpected token {:?} at position {}", tokens[pos], pos));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Column(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Cmp(Comparison),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '%' => { tokens.push(Token::Percent); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            ',' => { tokens.push(Token::Comma); chars.next(); }
            '=' => { tokens.push(Token::Cmp(Comparison::Eq)); chars.next(); }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => { tokens.push(Token::Cmp(Comparison::Le)); chars.next(); }
                    Some('>') => { tokens.push(Token::Cmp(Comparison::Ne)); chars.next(); }
                    _ => tokens.push(Token::Cmp(Comparison::Lt)),
                }
            }
            '>' => {
                chars.next();
                if let Some(&'=') = chars.peek() {
                    tokens.push(Token::Cmp(Comparison::Ge));
                    chars.next();
                } else {
                    tokens.push(Token::Cmp(Comparison::Gt));
                }
            }
            '[' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => name.push(ch),
                        None => return Err("Unterminated column reference".to_string()),
                    }
                }
                let name = name.trim().to_lowercase();
                if name.is_empty() {
                    return Err("Empty column reference".to_string());
                }
                tokens.push(Token::Column(name));
            }
            '0'..='9' | '.' => {
                let mut num = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        num.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = num
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number: {num}"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident.to_lowercase()));
            }
            other => return Err(format!("Unexpected character: {other}")),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => ArithOp::Add,
            Token::Minus => ArithOp::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::binary(op, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => ArithOp::Mul,
            Token::Slash => ArithOp::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::binary(op, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    match tokens.get(pos) {
        Some(Token::Minus) => {
            let (inner, pos) = parse_unary(tokens, pos + 1)?;
            Ok((Expr::Neg(Box::new(inner)), pos))
        }
        Some(Token::Plus) => parse_unary(tokens, pos + 1),
        _ => parse_percent(tokens, pos),
    }
}

// Postfix %: divides by 100 so `2%` evaluates to exactly the literal 0.02
fn parse_percent(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut expr, mut pos) = parse_primary(tokens, pos)?;

    while let Some(Token::Percent) = tokens.get(pos) {
        expr = Expr::Percent(Box::new(expr));
        pos += 1;
    }

    Ok((expr, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let Some(token) = tokens.get(pos) else {
        return Err("Unexpected end of expression".to_string());
    };

    match token {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::Column(name) => Ok((Expr::Column(name.clone()), pos + 1)),
        Token::LParen => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1)?;
            expect(tokens, pos, &Token::RParen)?;
            Ok((expr, pos + 1))
        }
        Token::Ident(name) => {
            expect(tokens, pos + 1, &Token::LParen)?;
            match name.as_str() {
                "max" | "min" => {
                    let (args, pos) = parse_function_args(tokens, pos + 2)?;
                    if args.len() < 2 {
                        return Err(format!("{name}() needs at least two arguments"));
                    }
                    let kind = if name == "max" { Extremum::Max } else { Extremum::Min };
                    Ok((Expr::Extremum { kind, args }, pos))
                }
                "if" => parse_select(tokens, pos + 2),
                other => Err(format!("Unknown function: {other}")),
            }
        }
        other => Err(format!("Unexpected token {other:?} at position {pos}")),
    }
}

// if(left <cmp> right, then, otherwise); pos points past the opening paren
fn parse_select(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (left, pos) = parse_add_sub(tokens, pos)?;
    let cmp = match tokens.get(pos) {
        Some(Token::Cmp(cmp)) => *cmp,
        _ => return Err("if() condition needs a comparison operator".to_string()),
    };
    let (right, pos) = parse_add_sub(tokens, pos + 1)?;
    expect(tokens, pos, &Token::Comma)?;
    let (then, pos) = parse_add_sub(tokens, pos + 1)?;
    expect(tokens, pos, &Token::Comma)?;
    let (otherwise, pos) = parse_add_sub(tokens, pos + 1)?;
    expect(tokens, pos, &Token::RParen)?;
    Ok((
        Expr::Select {
            left: Box::new(left),
            cmp,
            right: Box::new(right),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        pos + 1,
    ))
}

// Comma-separated arguments up to and including the closing paren
fn parse_function_args(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), String> {
    let mut args = Vec::new();
    let mut pos = pos;

    if let Some(Token::RParen) = tokens.get(pos) {
        return Ok((args, pos + 1));
    }

    loop {
        let (arg, new_pos) = parse_add_sub(tokens, pos)?;
        args.push(arg);
        match tokens.get(new_pos) {
            Some(Token::Comma) => pos = new_pos + 1,
            Some(Token::RParen) => return Ok((args, new_pos + 1)),
            _ => return Err("Expected , or ) in argument list".to_string()),
        }
    }
}

fn expect(tokens: &[Token], pos: usize, want: &Token) -> Result<(), String> {
    match tokens.get(pos) {
        Some(t) if t == want => Ok(()),
        Some(t) => Err(format!("Expected {want:?}, found {t:?}")),
        None => Err(format!("Expected {want:?}, found end of expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        let e = parse("[a] + [b] * 2").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                ArithOp::Add,
                Expr::column("a"),
                Expr::binary(ArithOp::Mul, Expr::column("b"), Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let e = parse("[a] - [b] - [c]").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                ArithOp::Sub,
                Expr::binary(ArithOp::Sub, Expr::column("a"), Expr::column("b")),
                Expr::column("c"),
            )
        );
    }

    #[test]
    fn column_names_keep_inner_spacing() {
        let e = parse("[Training New Joining  Staff ]").unwrap();
        assert_eq!(e, Expr::column("training new joining  staff"));
    }

    #[test]
    fn column_names_allow_punctuation() {
        let e = parse("[partners(direct cash sales) +employee 50%]").unwrap();
        assert_eq!(e, Expr::column("partners(direct cash sales) +employee 50%"));
    }

    #[test]
    fn percent_and_unary_minus() {
        assert_eq!(parse("2%").unwrap(), Expr::Percent(Box::new(Expr::Number(2.0))));
        assert_eq!(parse("-[a]").unwrap(), Expr::Neg(Box::new(Expr::column("a"))));
    }

    #[test]
    fn if_with_comparison() {
        let e = parse("if([a] <> 0, [b], [c])").unwrap();
        match e {
            Expr::Select { cmp, .. } => assert_eq!(cmp, Comparison::Ne),
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn max_needs_two_args() {
        assert!(parse("max([a])").unwrap_err().contains("two arguments"));
        assert!(parse("min([a], [b], 0)").is_ok());
    }

    #[test]
    fn errors() {
        assert!(parse("").is_err());
        assert!(parse("[a] +").is_err());
        assert!(parse("[a").is_err());
        assert!(parse("[]").is_err());
        assert!(parse("sum([a], [b])").unwrap_err().contains("Unknown function"));
        assert!(parse("if([a], 1, 2)").unwrap_err().contains("comparison"));
        assert!(parse("([a] + 1").is_err());
        assert!(parse("[a] [b]").is_err());
        assert!(parse("1.2.3").unwrap_err().contains("Invalid number"));
    }
}
