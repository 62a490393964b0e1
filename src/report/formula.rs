//! Evaluator for the spreadsheet formulas the report emits.
//!
//! Supports numbers, `TRUE`/`FALSE`, cell and range references (optionally
//! qualified with a quoted or bare sheet name, `$` anchors allowed), the four
//! arithmetic operators, unary minus, and the functions `SUM`, `AVERAGE` and
//! `VLOOKUP`. That is the whole vocabulary of [`crate::report::layout`].

use anyhow::{Result, anyhow, bail};

use crate::analyzers::utility::{mean, sum};
use crate::report::layout::{CellValue, WorkbookModel};

const MAX_DEPTH: usize = 64;

/// Result of evaluating a formula or reading a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
}

impl Value {
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Empty => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(t) => bail!("#VALUE! text '{t}' used as a number"),
        }
    }

    /// String stored as the cached result of a formula cell.
    pub fn to_cached(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Text(t) => t.clone(),
            Value::Bool(true) => "TRUE".into(),
            Value::Bool(false) => "FALSE".into(),
            Value::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CellAddr {
    sheet: Option<String>,
    row: u32,
    col: u16,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Bool(bool),
    Ref(CellAddr),
    Range(CellAddr, CellAddr),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Sheet(String),
    Op(char),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' | '-' | '*' | '/' | '(' | ')' | ',' | ':' | '!' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '\'' => {
                let mut name = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            name.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            name.push(*ch);
                            i += 1;
                        }
                        None => bail!("unterminated sheet name in '{input}'"),
                    }
                }
                tokens.push(Token::Sheet(name));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| anyhow!("bad number '{text}' in '{input}'"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '$' || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '$' || chars[i] == '_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => bail!("unexpected character '{other}' in '{input}'"),
        }
    }

    Ok(tokens)
}

/// Parses `A1`, `$B$11` or `AA7` into a zero-based `(row, col)`.
pub fn parse_cell(text: &str) -> Option<(u32, u16)> {
    let text = text.replace('$', "");
    let split = text.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    let col = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1));
    Some((row - 1, u16::try_from(col - 1).ok()?))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, op: char) -> bool {
        if self.peek() == Some(&Token::Op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: char) -> Result<()> {
        if self.eat(op) {
            Ok(())
        } else {
            bail!("expected '{op}', found {:?}", self.peek())
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(c @ ('+' | '-'))) => *c,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.term()?));
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(c @ ('*' | '/'))) => *c,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat('-') {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat('+') {
            return self.unary();
        }
        self.primary()
    }

    fn reference(&mut self, sheet: Option<String>, first: &str) -> Result<Expr> {
        let (row, col) = parse_cell(first).ok_or_else(|| anyhow!("bad cell reference '{first}'"))?;
        let start = CellAddr {
            sheet: sheet.clone(),
            row,
            col,
        };
        if !self.eat(':') {
            return Ok(Expr::Ref(start));
        }
        match self.next() {
            Some(Token::Ident(second)) => {
                let (row, col) =
                    parse_cell(&second).ok_or_else(|| anyhow!("bad cell reference '{second}'"))?;
                Ok(Expr::Range(start, CellAddr { sheet, row, col }))
            }
            other => bail!("expected range end, found {other:?}"),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Op('(')) => {
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(Token::Sheet(sheet)) => {
                self.expect('!')?;
                match self.next() {
                    Some(Token::Ident(cell)) => self.reference(Some(sheet), &cell),
                    other => bail!("expected cell after sheet name, found {other:?}"),
                }
            }
            Some(Token::Ident(ident)) => {
                if self.eat('(') {
                    let mut args = Vec::new();
                    if !self.eat(')') {
                        loop {
                            args.push(self.expr()?);
                            if self.eat(')') {
                                break;
                            }
                            self.expect(',')?;
                        }
                    }
                    return Ok(Expr::Call(ident.to_uppercase(), args));
                }
                if self.eat('!') {
                    return match self.next() {
                        Some(Token::Ident(cell)) => self.reference(Some(ident), &cell),
                        other => bail!("expected cell after sheet name, found {other:?}"),
                    };
                }
                match ident.to_uppercase().as_str() {
                    "TRUE" => Ok(Expr::Bool(true)),
                    "FALSE" => Ok(Expr::Bool(false)),
                    _ => self.reference(None, &ident),
                }
            }
            other => bail!("unexpected token {other:?}"),
        }
    }
}

fn parse(formula: &str) -> Result<Expr> {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let mut parser = Parser {
        tokens: tokenize(body)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        bail!("trailing input in formula '{formula}'");
    }
    Ok(expr)
}

/// Evaluates formulas against a [`WorkbookModel`].
pub struct Evaluator<'a> {
    book: &'a WorkbookModel,
}

impl<'a> Evaluator<'a> {
    pub fn new(book: &'a WorkbookModel) -> Self {
        Self { book }
    }

    /// Evaluates `formula` as if it were written on `sheet`.
    pub fn evaluate(&self, sheet: &str, formula: &str) -> Result<Value> {
        self.eval_formula(sheet, formula, 0)
    }

    /// Current value of a cell, evaluating it if it holds a formula.
    pub fn cell_value(&self, sheet: &str, row: u32, col: u16) -> Result<Value> {
        self.read(sheet, row, col, 0)
    }

    fn eval_formula(&self, sheet: &str, formula: &str, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            bail!("formula nesting too deep (circular reference?)");
        }
        let expr = parse(formula)?;
        self.eval(sheet, &expr, depth)
    }

    fn read(&self, sheet: &str, row: u32, col: u16, depth: usize) -> Result<Value> {
        let target = self
            .book
            .sheet(sheet)
            .ok_or_else(|| anyhow!("#REF! unknown sheet '{sheet}'"))?;
        Ok(match target.cell(row, col).map(|c| &c.value) {
            None | Some(CellValue::Blank) => Value::Empty,
            Some(CellValue::Number(n)) => Value::Number(*n),
            Some(CellValue::Text(t)) => Value::Text(t.clone()),
            Some(CellValue::Formula(f)) => self.eval_formula(sheet, f, depth + 1)?,
        })
    }

    fn range_values(&self, sheet: &str, a: &CellAddr, b: &CellAddr, depth: usize) -> Result<Vec<Vec<Value>>> {
        let name = a.sheet.as_deref().unwrap_or(sheet);
        let mut rows = Vec::new();
        for row in a.row.min(b.row)..=a.row.max(b.row) {
            let mut values = Vec::new();
            for col in a.col.min(b.col)..=a.col.max(b.col) {
                values.push(self.read(name, row, col, depth)?);
            }
            rows.push(values);
        }
        Ok(rows)
    }

    /// Numbers of the arguments; text and empty cells inside ranges are skipped.
    fn numbers(&self, sheet: &str, args: &[Expr], depth: usize) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(a, b) => {
                    for value in self.range_values(sheet, a, b, depth)?.into_iter().flatten() {
                        if let Value::Number(n) = value {
                            out.push(n);
                        }
                    }
                }
                other => out.push(self.eval(sheet, other, depth)?.as_number()?),
            }
        }
        Ok(out)
    }

    fn eval(&self, sheet: &str, expr: &Expr, depth: usize) -> Result<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Ref(addr) => self.read(addr.sheet.as_deref().unwrap_or(sheet), addr.row, addr.col, depth),
            Expr::Range(..) => bail!("#VALUE! range used outside a function"),
            Expr::Neg(inner) => Ok(Value::Number(-self.eval(sheet, inner, depth)?.as_number()?)),
            Expr::Binary(op, lhs, rhs) => {
                let a = self.eval(sheet, lhs, depth)?.as_number()?;
                let b = self.eval(sheet, rhs, depth)?.as_number()?;
                let n = match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' if b == 0.0 => bail!("#DIV/0!"),
                    '/' => a / b,
                    _ => bail!("unknown operator '{op}'"),
                };
                Ok(Value::Number(n))
            }
            Expr::Call(name, args) => self.call(sheet, name, args, depth),
        }
    }

    fn call(&self, sheet: &str, name: &str, args: &[Expr], depth: usize) -> Result<Value> {
        match name {
            "SUM" => Ok(Value::Number(sum(self.numbers(sheet, args, depth)?))),
            "AVERAGE" => {
                let values = self.numbers(sheet, args, depth)?;
                if values.is_empty() {
                    bail!("#DIV/0! AVERAGE of no numbers");
                }
                Ok(Value::Number(mean(&values)))
            }
            "VLOOKUP" => {
                let [key, Expr::Range(a, b), index, rest @ ..] = args else {
                    bail!("VLOOKUP expects (key, range, column[, approximate])");
                };
                let key = self.eval(sheet, key, depth)?.as_number()?;
                let index = self.eval(sheet, index, depth)?.as_number()? as usize;
                let approximate = match rest.first() {
                    Some(flag) => self.eval(sheet, flag, depth)?.as_number()? != 0.0,
                    None => true,
                };
                let table = self.range_values(sheet, a, b, depth)?;
                if index == 0 || table.first().is_none_or(|row| index > row.len()) {
                    bail!("#REF! VLOOKUP column {index} outside the table");
                }

                let mut found = None;
                for row in &table {
                    let Value::Number(first) = &row[0] else { continue };
                    if approximate {
                        if *first <= key {
                            found = Some(row);
                        } else {
                            break;
                        }
                    } else if *first == key {
                        found = Some(row);
                        break;
                    }
                }
                found
                    .map(|row| row[index - 1].clone())
                    .ok_or_else(|| anyhow!("#N/A VLOOKUP found no match for {key}"))
            }
            other => bail!("#NAME? unsupported function {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::layout::{Sheet, Style};

    fn book() -> WorkbookModel {
        let mut data = Sheet::new("Data Sheet");
        data.number(0, 0, 1.0, Style::Score);
        data.number(1, 0, 2.0, Style::Score);
        data.number(2, 0, 4.0, Style::Score);
        data.text(3, 0, "label", Style::Plain);
        data.formula(4, 0, "SUM(A1:A4)", Style::Percent);

        let mut lookup = Sheet::new("Map");
        for (i, (p, g)) in [(0.0, "low"), (0.5, "mid"), (0.9, "high")].iter().enumerate() {
            lookup.number(i as u32, 0, *p, Style::Plain);
            lookup.text(i as u32, 1, *g, Style::Plain);
        }

        WorkbookModel {
            sheets: vec![data, lookup],
        }
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1"), Some((0, 0)));
        assert_eq!(parse_cell("$B$11"), Some((10, 1)));
        assert_eq!(parse_cell("AA7"), Some((6, 26)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("7"), None);
    }

    #[test]
    fn test_arithmetic_precedence() {
        let book = book();
        let eval = Evaluator::new(&book);
        assert_eq!(eval.evaluate("Map", "=1+2*3").unwrap(), Value::Number(7.0));
        assert_eq!(eval.evaluate("Map", "(1+2)*3").unwrap(), Value::Number(9.0));
        assert_eq!(eval.evaluate("Map", "-2+5").unwrap(), Value::Number(3.0));
        assert_eq!(eval.evaluate("Map", "1-2-3").unwrap(), Value::Number(-4.0));
    }

    #[test]
    fn test_references_and_sum() {
        let book = book();
        let eval = Evaluator::new(&book);
        assert_eq!(
            eval.evaluate("Map", "='Data Sheet'!A2*'Data Sheet'!A3").unwrap(),
            Value::Number(8.0)
        );
        assert_eq!(eval.evaluate("Data Sheet", "A5").unwrap(), Value::Number(7.0));
        assert_eq!(
            eval.cell_value("Data Sheet", 4, 0).unwrap(),
            Value::Number(7.0)
        );
        assert_eq!(
            eval.evaluate("Data Sheet", "SUM((A1/A2)*0.5,A3)").unwrap(),
            Value::Number(4.25)
        );
    }

    #[test]
    fn test_average_skips_text() {
        let book = book();
        let eval = Evaluator::new(&book);
        let value = eval.evaluate("Data Sheet", "AVERAGE(A1:A4)").unwrap();
        assert_eq!(value, Value::Number(7.0 / 3.0));
        assert!(eval.evaluate("Data Sheet", "AVERAGE(B1:B3)").is_err());
    }

    #[test]
    fn test_vlookup_approximate() {
        let book = book();
        let eval = Evaluator::new(&book);
        let lookup = |key: &str| {
            eval.evaluate("Data Sheet", &format!("VLOOKUP({key},Map!$A$1:$B$3,2,TRUE)"))
                .unwrap()
        };
        assert_eq!(lookup("0.2"), Value::Text("low".into()));
        assert_eq!(lookup("0.5"), Value::Text("mid".into()));
        assert_eq!(lookup("0.89"), Value::Text("mid".into()));
        assert_eq!(lookup("1"), Value::Text("high".into()));
        assert!(
            eval.evaluate("Data Sheet", "VLOOKUP(-1,Map!$A$1:$B$3,2,TRUE)")
                .is_err()
        );
    }

    #[test]
    fn test_errors() {
        let book = book();
        let eval = Evaluator::new(&book);
        assert!(eval.evaluate("Map", "1/0").is_err());
        assert!(eval.evaluate("Map", "FOO(1)").is_err());
        assert!(eval.evaluate("Map", "'Nope'!A1").is_err());
        assert!(eval.evaluate("Data Sheet", "A4+1").is_err());
        assert!(eval.evaluate("Map", "1 2").is_err());
    }

    #[test]
    fn test_circular_reference_fails() {
        let mut sheet = Sheet::new("Loop");
        sheet.formula(0, 0, "B1", Style::Plain);
        sheet.formula(0, 1, "A1", Style::Plain);
        let book = WorkbookModel {
            sheets: vec![sheet],
        };
        assert!(Evaluator::new(&book).cell_value("Loop", 0, 0).is_err());
    }

    #[test]
    fn test_quoted_sheet_with_apostrophe() {
        let mut sheet = Sheet::new("o'neil");
        sheet.number(0, 0, 3.0, Style::Score);
        let book = WorkbookModel {
            sheets: vec![sheet],
        };
        let eval = Evaluator::new(&book);
        assert_eq!(eval.evaluate("o'neil", "'o''neil'!A1").unwrap(), Value::Number(3.0));
    }
}
