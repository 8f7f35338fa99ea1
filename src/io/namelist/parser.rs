// src/io/namelist/parser.rs

use super::{Namelist, NamelistGroup};
use crate::error::ParseError;
use crate::model::Value;
use indexmap::IndexMap;

// ============================================================================
// TOKENS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// One subscript of `name(...)`. Indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Subscript {
    All,
    At(usize),
}

type Assignment = (String, Option<Vec<Subscript>>, Vec<Scalar>);

/// Largest array extent or repeat count accepted from a file.
const MAX_EXTENT: usize = 1_000_000;

// ============================================================================
// PARSER
// ============================================================================

/// Parses namelist text into its groups.
///
/// Every assignment must sit inside a `&group ... /` (or `&end`) block.
/// A document without any group is rejected.
pub fn parse(content: &str) -> Result<Namelist, ParseError> {
    let mut parser = Parser::new(content);
    let namelist = parser.document()?;

    if namelist.groups.is_empty() {
        return Err(ParseError::NoGroup);
    }

    log::debug!(
        "Parsed namelist: {}",
        namelist
            .groups
            .iter()
            .map(|g| format!("&{} ({} keys)", g.name, g.entries.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(namelist)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(format!("expected '{}', found end of input", want))),
        }
    }

    /// Skips whitespace, newlines and `!` comments.
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            if c == '!' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_separators(&mut self) {
        loop {
            self.skip_blank();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                break;
            }
        }
    }

    // =======================
    //   STRUCTURE
    // =======================

    fn document(&mut self) -> Result<Namelist, ParseError> {
        let mut groups = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => break,
                Some('&') => groups.push(self.group()?),
                Some(c) => {
                    return Err(self.error(format!("expected '&' to open a group, found '{}'", c)))
                }
            }
        }
        Ok(Namelist { groups })
    }

    fn group(&mut self) -> Result<NamelistGroup, ParseError> {
        self.expect('&')?;
        let name = self.identifier()?;
        if name == "end" {
            return Err(self.error("'&end' without an open group"));
        }

        let mut builder = GroupBuilder::default();
        loop {
            self.skip_separators();
            match self.peek() {
                None => return Err(ParseError::UnterminatedGroup(name)),
                Some('/') => {
                    self.bump();
                    break;
                }
                Some('&') => {
                    self.bump();
                    if self.identifier()? == "end" {
                        break;
                    }
                    return Err(ParseError::UnterminatedGroup(name));
                }
                Some(_) => {
                    let (key, index, items) = self.assignment()?;
                    builder.assign(key, index, items)?;
                }
            }
        }

        Ok(NamelistGroup {
            entries: builder.finish()?,
            name,
        })
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {}
            Some(c) => return Err(self.error(format!("expected a name, found '{}'", c))),
            None => return Err(self.error("expected a name, found end of input")),
        }

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c.to_ascii_lowercase());
                self.bump();
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn assignment(&mut self) -> Result<Assignment, ParseError> {
        let key = self.identifier()?;
        self.skip_blank();

        let index = if self.peek() == Some('(') {
            Some(self.subscripts(&key)?)
        } else {
            None
        };

        self.skip_blank();
        self.expect('=')?;

        let items = self.values()?;
        if items.is_empty() {
            return Err(ParseError::EmptyValue { key });
        }
        Ok((key, index, items))
    }

    fn subscripts(&mut self, key: &str) -> Result<Vec<Subscript>, ParseError> {
        self.expect('(')?;
        let mut subs = Vec::new();

        loop {
            self.skip_blank();
            match self.peek() {
                Some(':') => {
                    self.bump();
                    subs.push(Subscript::All);
                }
                Some(c) if c.is_ascii_digit() => {
                    let n = self.unsigned()?;
                    if n == 0 {
                        return Err(invalid_index(key, "indices start at 1"));
                    }
                    if n > MAX_EXTENT {
                        return Err(invalid_index(
                            key,
                            &format!("index {} is above the limit of {}", n, MAX_EXTENT),
                        ));
                    }
                    self.skip_blank();
                    if self.peek() == Some(':') {
                        return Err(invalid_index(key, "index ranges are not supported"));
                    }
                    subs.push(Subscript::At(n));
                }
                _ => return Err(invalid_index(key, "expected ':' or a positive integer")),
            }

            self.skip_blank();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                _ => return Err(invalid_index(key, "expected ',' or ')'")),
            }
        }

        if subs.len() > 2 {
            return Err(invalid_index(key, "arrays of rank above 2 are not supported"));
        }
        Ok(subs)
    }

    fn unsigned(&mut self) -> Result<usize, ParseError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.bump();
        }
        digits
            .parse()
            .map_err(|_| self.error(format!("'{}' is not a valid count", digits)))
    }

    // =======================
    //   VALUES
    // =======================

    fn values(&mut self) -> Result<Vec<Scalar>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            if self.at_value_end() {
                break;
            }
            self.item(&mut items)?;

            self.skip_blank();
            if self.peek() == Some(',') {
                self.bump();
                self.skip_blank();
                if self.peek() == Some(',') {
                    return Err(self.error("null values are not supported"));
                }
            }
        }
        Ok(items)
    }

    fn at_value_end(&self) -> bool {
        match self.peek() {
            None | Some('/') | Some('&') => true,
            Some(c) if c.is_ascii_alphabetic() => self.at_assignment(),
            _ => false,
        }
    }

    /// True when the next word is the name of a new assignment
    /// (`t = 500` rather than the bare logical `T`).
    fn at_assignment(&self) -> bool {
        let mut i = self.pos;
        while matches!(self.chars.get(i), Some(c) if c.is_ascii_alphanumeric() || *c == '_') {
            i += 1;
        }
        while matches!(self.chars.get(i), Some(c) if c.is_whitespace()) {
            i += 1;
        }
        matches!(self.chars.get(i), Some('=') | Some('('))
    }

    fn item(&mut self, items: &mut Vec<Scalar>) -> Result<(), ParseError> {
        // Repeat count: `3*0.0`
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let mut i = self.pos;
            while self.chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if self.chars.get(i) == Some(&'*') {
                let count = self.unsigned()?;
                self.bump();
                if count == 0 {
                    return Err(self.error("repeat count must be positive"));
                }
                if count > MAX_EXTENT - items.len().min(MAX_EXTENT) {
                    return Err(self.error(format!(
                        "repeat count {} takes the list above {} items",
                        count, MAX_EXTENT
                    )));
                }
                match self.peek() {
                    None | Some(',') | Some('/') => {
                        return Err(self.error("null repeat values are not supported"))
                    }
                    Some(c) if c.is_whitespace() => {
                        return Err(self.error("null repeat values are not supported"))
                    }
                    _ => {}
                }
                let value = self.scalar()?;
                items.extend(std::iter::repeat(value).take(count));
                return Ok(());
            }
        }

        let value = self.scalar()?;
        items.push(value);
        Ok(())
    }

    fn scalar(&mut self) -> Result<Scalar, ParseError> {
        match self.peek() {
            Some('\'') | Some('"') => self.string(),
            Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) => {
                self.logical()
            }
            Some(c) if c.is_ascii_alphabetic() => self.logical(),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.number(),
            Some(c) => Err(self.error(format!("expected a value, found '{}'", c))),
            None => Err(self.error("expected a value, found end of input")),
        }
    }

    fn logical(&mut self) -> Result<Scalar, ParseError> {
        let (line, column) = (self.line, self.column);
        let dotted = self.peek() == Some('.');
        if dotted {
            self.bump();
        }

        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c.to_ascii_lowercase());
                self.bump();
            } else {
                break;
            }
        }
        if dotted && self.peek() == Some('.') {
            self.bump();
        }

        match word.as_str() {
            "t" | "true" => Ok(Scalar::Bool(true)),
            "f" | "false" => Ok(Scalar::Bool(false)),
            _ if !dotted => special_real(&word, false).ok_or_else(|| ParseError::Syntax {
                line,
                column,
                message: format!("'{}' is neither a logical nor a quoted string", word),
            }),
            _ => Err(ParseError::Syntax {
                line,
                column,
                message: format!("'{}' is neither a logical nor a quoted string", word),
            }),
        }
    }

    fn string(&mut self) -> Result<Scalar, ParseError> {
        let (line, column) = (self.line, self.column);
        let Some(quote) = self.bump() else {
            return Err(self.error("expected a string"));
        };

        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::Syntax {
                        line,
                        column,
                        message: "unterminated string".to_string(),
                    })
                }
                // A doubled quote stands for one literal quote
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        text.push(quote);
                    } else {
                        break;
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(Scalar::Str(text))
    }

    /// Integers and reals, including Fortran `d` exponents (`1.0d-8`).
    fn number(&mut self) -> Result<Scalar, ParseError> {
        let (line, column) = (self.line, self.column);
        let syntax = |message: String| ParseError::Syntax {
            line,
            column,
            message,
        };

        let mut text = String::new();
        let mut is_real = false;
        let mut digits = 0;

        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.bump();
        }
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            let mut word = String::new();
            while let Some(c) = self.peek() {
                if !c.is_ascii_alphabetic() {
                    break;
                }
                word.push(c.to_ascii_lowercase());
                self.bump();
            }
            return special_real(&word, text == "-")
                .ok_or_else(|| syntax(format!("malformed number '{}{}'", text, word)));
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == '.' && !is_real {
                is_real = true;
            } else {
                break;
            }
            text.push(c);
            self.bump();
        }
        if digits == 0 {
            return Err(syntax(format!("malformed number '{}'", text)));
        }

        if let Some('e' | 'E' | 'd' | 'D') = self.peek() {
            is_real = true;
            text.push('e');
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            let mut exp_digits = 0;
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                exp_digits += 1;
                text.push(c);
                self.bump();
            }
            if exp_digits == 0 {
                return Err(syntax(format!("missing exponent in '{}'", text)));
            }
        }

        if let Some(c) = self.peek() {
            if !(c.is_whitespace() || matches!(c, ',' | '/' | '&' | '!')) {
                return Err(syntax(format!("unexpected '{}' after number '{}'", c, text)));
            }
        }

        if is_real {
            text.parse::<f64>()
                .map(Scalar::Float)
                .map_err(|_| syntax(format!("malformed real '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Scalar::Int)
                .map_err(|_| syntax(format!("integer '{}' out of range", text)))
        }
    }
}

/// `NaN`, `Inf` and `Infinity`, as Fortran list-directed input accepts them.
fn special_real(word: &str, negative: bool) -> Option<Scalar> {
    let value = match word {
        "nan" => f64::NAN,
        "inf" | "infinity" => f64::INFINITY,
        _ => return None,
    };
    Some(Scalar::Float(if negative { -value } else { value }))
}

fn invalid_index(key: &str, message: &str) -> ParseError {
    ParseError::InvalidIndex {
        key: key.to_string(),
        message: message.to_string(),
    }
}

// ============================================================================
// ARRAY ASSEMBLY
// ============================================================================
//
// Two-dimensional arrays follow Fortran storage: `a(i, j)` is component `i`
// of vector `j`. A Value matrix holds one inner Vec per vector, so
// `lattvec(:,2)` fills row 1 and `lattvec(1,:)` fills column 0 of every row.

enum Slot {
    Plain(Vec<Scalar>),
    Vector(Vec<Option<Scalar>>),
    Matrix(Vec<Vec<Option<Scalar>>>),
}

#[derive(Default)]
struct GroupBuilder {
    slots: IndexMap<String, Slot>,
}

impl GroupBuilder {
    fn assign(
        &mut self,
        key: String,
        index: Option<Vec<Subscript>>,
        items: Vec<Scalar>,
    ) -> Result<(), ParseError> {
        match index.as_deref() {
            None => {
                self.slots.insert(key, Slot::Plain(items));
            }
            Some([Subscript::All]) => {
                self.slots
                    .insert(key, Slot::Vector(items.into_iter().map(Some).collect()));
            }
            Some([Subscript::At(start)]) => {
                let start = *start;
                place(&key, self.vector(&key)?, start - 1, items)?;
            }
            Some([Subscript::All, Subscript::At(j)]) => {
                let j = *j;
                let rows = self.matrix(&key)?;
                place(&key, row_mut(&key, rows, j - 1)?, 0, items)?;
            }
            Some([Subscript::At(i), Subscript::All]) => {
                let i = *i;
                let rows = self.matrix(&key)?;
                for (n, item) in items.into_iter().enumerate() {
                    place(&key, row_mut(&key, rows, n)?, i - 1, vec![item])?;
                }
            }
            Some([Subscript::At(i), Subscript::At(j)]) => {
                let (i, j) = (*i, *j);
                let rows = self.matrix(&key)?;
                place(&key, row_mut(&key, rows, j - 1)?, i - 1, items)?;
            }
            Some(_) => {
                return Err(invalid_index(
                    &key,
                    "whole-array assignment needs an explicit vector index",
                ))
            }
        }
        Ok(())
    }

    fn vector(&mut self, key: &str) -> Result<&mut Vec<Option<Scalar>>, ParseError> {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::Vector(Vec::new()));

        // `masses = 28.0` followed by `masses(2) = 72.6` extends the array
        if let Slot::Plain(items) = slot {
            let items = std::mem::take(items);
            *slot = Slot::Vector(items.into_iter().map(Some).collect());
        }

        match slot {
            Slot::Vector(cells) => Ok(cells),
            _ => Err(invalid_index(key, "mixes one- and two-dimensional subscripts")),
        }
    }

    fn matrix(&mut self, key: &str) -> Result<&mut Vec<Vec<Option<Scalar>>>, ParseError> {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::Matrix(Vec::new()));

        match slot {
            Slot::Matrix(rows) => Ok(rows),
            _ => Err(invalid_index(key, "mixes one- and two-dimensional subscripts")),
        }
    }

    fn finish(self) -> Result<IndexMap<String, Value>, ParseError> {
        let mut entries = IndexMap::with_capacity(self.slots.len());
        for (key, slot) in self.slots {
            let value = match slot {
                Slot::Plain(mut items) if items.len() == 1 => scalar_value(items.remove(0)),
                Slot::Plain(items) => list_value(&key, items)?,
                Slot::Vector(cells) => list_value(&key, filled(&key, cells)?)?,
                Slot::Matrix(rows) => {
                    let rows = rows
                        .into_iter()
                        .map(|r| {
                            if r.is_empty() {
                                Err(ParseError::IncompleteArray { key: key.clone() })
                            } else {
                                filled(&key, r)
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    if rows.iter().any(|r| r.len() != rows[0].len()) {
                        return Err(ParseError::RaggedMatrix { key });
                    }
                    matrix_value(&key, rows)?
                }
            };
            entries.insert(key, value);
        }
        Ok(entries)
    }
}

fn extent(key: &str, start: usize, len: usize) -> Result<usize, ParseError> {
    start
        .checked_add(len)
        .filter(|&end| end <= MAX_EXTENT)
        .ok_or_else(|| invalid_index(key, &format!("array extends past {} items", MAX_EXTENT)))
}

fn row_mut<'a>(
    key: &str,
    rows: &'a mut Vec<Vec<Option<Scalar>>>,
    index: usize,
) -> Result<&'a mut Vec<Option<Scalar>>, ParseError> {
    let end = extent(key, index, 1)?;
    if rows.len() < end {
        rows.resize_with(end, Vec::new);
    }
    Ok(&mut rows[index])
}

fn place(
    key: &str,
    cells: &mut Vec<Option<Scalar>>,
    start: usize,
    items: Vec<Scalar>,
) -> Result<(), ParseError> {
    let end = extent(key, start, items.len())?;
    if cells.len() < end {
        cells.resize(end, None);
    }
    for (cell, item) in cells[start..end].iter_mut().zip(items) {
        *cell = Some(item);
    }
    Ok(())
}

fn filled(key: &str, cells: Vec<Option<Scalar>>) -> Result<Vec<Scalar>, ParseError> {
    cells
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ParseError::IncompleteArray {
            key: key.to_string(),
        })
}

// ============================================================================
// TYPE INFERENCE
// ============================================================================

fn scalar_value(s: Scalar) -> Value {
    match s {
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::Int(i) => Value::Int(i),
        Scalar::Float(f) => Value::Float(f),
        Scalar::Str(s) => Value::Str(s),
    }
}

fn as_number(s: &Scalar) -> Option<f64> {
    match s {
        Scalar::Int(i) => Some(*i as f64),
        Scalar::Float(f) => Some(*f),
        _ => None,
    }
}

fn list_value(key: &str, items: Vec<Scalar>) -> Result<Value, ParseError> {
    if items.iter().all(|s| matches!(s, Scalar::Int(_))) {
        return Ok(Value::IntList(
            items
                .iter()
                .filter_map(|s| match s {
                    Scalar::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        ));
    }
    if let Some(reals) = items.iter().map(as_number).collect::<Option<Vec<_>>>() {
        return Ok(Value::FloatList(reals));
    }
    if let Some(strings) = items
        .iter()
        .map(|s| match s {
            Scalar::Str(s) => Some(s.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        return Ok(Value::StrList(strings));
    }
    Err(ParseError::UnsupportedValue {
        key: key.to_string(),
        message: "arrays must be all numbers or all strings".to_string(),
    })
}

fn matrix_value(key: &str, rows: Vec<Vec<Scalar>>) -> Result<Value, ParseError> {
    let all_int = rows
        .iter()
        .flatten()
        .all(|s| matches!(s, Scalar::Int(_)));
    if all_int {
        return Ok(Value::IntMatrix(
            rows.iter()
                .map(|r| {
                    r.iter()
                        .filter_map(|s| match s {
                            Scalar::Int(i) => Some(*i),
                            _ => None,
                        })
                        .collect()
                })
                .collect(),
        ));
    }

    rows.iter()
        .map(|r| r.iter().map(as_number).collect::<Option<Vec<_>>>())
        .collect::<Option<Vec<_>>>()
        .map(Value::FloatMatrix)
        .ok_or_else(|| ParseError::UnsupportedValue {
            key: key.to_string(),
            message: "matrices must hold numbers".to_string(),
        })
}
