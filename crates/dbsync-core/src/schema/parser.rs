//! DDL-like schema parser.
//!
//! Accepts the subset of SQLite `CREATE TABLE` syntax that describes one
//! table with scalar columns:
//!
//! ```text
//! [CREATE TABLE [IF NOT EXISTS]] name (
//!     column [TYPE] [NOT NULL | NULL] [PRIMARY KEY [ASC|DESC]] [UNIQUE]
//!            [DEFAULT literal] [COLLATE name] [CHECK (...)] [REFERENCES ...],
//!     ...,
//!     [CONSTRAINT name] PRIMARY KEY (a, b, ...)
//! ) [WITHOUT ROWID] [;]
//! ```
//!
//! Type names map by affinity (checked in this order): `BOOL` → boolean,
//! `INT` → integer, `CHAR`/`CLOB`/`TEXT`/`STRING` → text,
//! `REAL`/`FLOA`/`DOUB`/`NUMERIC`/`DECIMAL` → real. A column without a
//! type is nullable text. Table-level `UNIQUE`, `CHECK` and `FOREIGN KEY`
//! constraints are accepted and not enforced.

use crate::errors::{Result, SyncError};
use crate::model::{ColumnType, Value};
use crate::schema::validate::coerce_value;
use crate::schema::{Column, TableSchema};

/// Parse schema text into a validated `TableSchema`
///
/// # Errors
///
/// - `InvalidSchema` — empty text, unbalanced parentheses, bad identifiers,
///   unsupported clauses, or more than one primary key declaration
/// - `DuplicateColumn` — a column name repeats (case-insensitive)
/// - `UnsupportedType` — a type name with no known affinity
/// - `UnknownKeyColumn` — a `PRIMARY KEY (...)` names an undeclared column
/// - `MissingPrimaryKey` — no primary key at all
pub fn parse_schema(ddl: &str) -> Result<TableSchema> {
    let text = strip_suffixes(ddl.trim());
    if text.is_empty() {
        return Err(invalid("schema text is empty"));
    }
    let text = strip_create_prefix(text);

    let open = text
        .find('(')
        .ok_or_else(|| invalid("expected '(' after table name"))?;
    let name = unquote_identifier(text[..open].trim())?;
    let body = text[open..].trim();
    if !body.ends_with(')') || matching_paren(body) != Some(body.len() - 1) {
        return Err(invalid("unbalanced parentheses in column list"));
    }
    let body = &body[1..body.len() - 1];

    let mut columns: Vec<Column> = Vec::new();
    let mut inline_key: Vec<usize> = Vec::new();
    let mut table_key: Option<Vec<String>> = None;

    for item in split_top_level(body, ',') {
        let tokens = tokenize(item.trim())?;
        if tokens.is_empty() {
            return Err(invalid("empty column definition"));
        }
        let mut rest: &[String] = &tokens;
        if keyword(&rest[0], "CONSTRAINT") {
            rest = rest.get(2..).ok_or_else(|| invalid("CONSTRAINT without body"))?;
        }
        let head = rest.first().map(|t| t.to_ascii_uppercase()).unwrap_or_default();
        match head.as_str() {
            "PRIMARY" => {
                if table_key.is_some() {
                    return Err(invalid("more than one PRIMARY KEY declaration"));
                }
                table_key = Some(parse_key_list(rest)?);
            }
            "UNIQUE" | "CHECK" | "FOREIGN" => {}
            _ => {
                let (column, is_key) = parse_column(rest)?;
                if columns
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(&column.name))
                {
                    return Err(SyncError::DuplicateColumn {
                        column: column.name,
                    });
                }
                if is_key {
                    inline_key.push(columns.len());
                }
                columns.push(column);
            }
        }
    }

    if columns.is_empty() {
        return Err(invalid("table declares no columns"));
    }

    let primary_key = match (table_key, inline_key.len()) {
        (Some(_), n) if n > 0 => {
            return Err(invalid("more than one PRIMARY KEY declaration"));
        }
        (Some(names), _) => resolve_key_columns(&columns, &names)?,
        (None, 0) => return Err(SyncError::MissingPrimaryKey { table: name }),
        (None, 1) => inline_key,
        (None, _) => return Err(invalid("more than one PRIMARY KEY declaration")),
    };

    for &i in &primary_key {
        let column = &mut columns[i];
        if matches!(column.default, Some(Value::Null)) {
            column.default = None;
        }
        column.nullable = false;
    }

    Ok(TableSchema::from_parts(name, columns, primary_key))
}

fn invalid(reason: impl Into<String>) -> SyncError {
    SyncError::InvalidSchema {
        reason: reason.into(),
    }
}

fn keyword(token: &str, word: &str) -> bool {
    token.eq_ignore_ascii_case(word)
}

fn strip_suffixes(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim_end().trim_end_matches(';').trim_end();
        let upper = trimmed.to_ascii_uppercase();
        let stripped = if upper.ends_with("WITHOUT ROWID") {
            trimmed[..trimmed.len() - "WITHOUT ROWID".len()].trim_end()
        } else {
            trimmed
        };
        if stripped.len() == text.len() {
            return stripped;
        }
        text = stripped;
    }
}

fn strip_create_prefix(text: &str) -> &str {
    let words: Vec<&str> = text.split_whitespace().take(5).collect();
    let upper: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
    let skip = match upper.as_slice() {
        [c, t, i, n, e, ..] if c == "CREATE" && t == "TABLE" && i == "IF" && n == "NOT" && e.starts_with("EXISTS") => 5,
        [c, t, ..] if c == "CREATE" && t == "TABLE" => 2,
        _ => 0,
    };
    let mut rest = text;
    for _ in 0..skip {
        rest = rest.trim_start();
        let word_end = rest
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(rest.len());
        // "EXISTS(" can be glued to the column list
        let word = &rest[..word_end];
        rest = &rest[word.len()..];
    }
    rest.trim()
}

/// Index of the parenthesis closing the one at position 0
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '[' => quote = Some(']'),
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '[' => quote = Some(']'),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                c if c == sep && depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split one definition into words, quoted identifiers/literals and
/// parenthesised groups (each group is a single token including parens).
fn tokenize(text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '(' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let end = matching_paren(&text[i..])
                    .ok_or_else(|| invalid(format!("unbalanced parentheses in '{}'", text)))?;
                tokens.push(text[i..=i + end].to_string());
                while let Some(&(j, _)) = chars.peek() {
                    if j > i + end {
                        break;
                    }
                    chars.next();
                }
            }
            '\'' | '"' | '`' | '[' => {
                let close = if ch == '[' { ']' } else { ch };
                current.push(ch);
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    current.push(c);
                    if c == close {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(invalid(format!("unterminated quote in '{}'", text)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn unquote_identifier(raw: &str) -> Result<String> {
    let inner = match raw.chars().next() {
        Some('"') | Some('`') | Some('[') if raw.len() >= 2 => &raw[1..raw.len() - 1],
        _ => raw,
    };
    let mut chars = inner.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(format!("invalid identifier '{}'", raw)));
    }
    Ok(inner.to_string())
}

fn parse_key_list(tokens: &[String]) -> Result<Vec<String>> {
    let group = match tokens {
        [p, k, group, ..] if keyword(p, "PRIMARY") && keyword(k, "KEY") && group.starts_with('(') => {
            group
        }
        _ => return Err(invalid("expected PRIMARY KEY (columns)")),
    };
    let names = split_top_level(&group[1..group.len() - 1], ',')
        .into_iter()
        .map(|part| {
            // "col ASC" / "col DESC" / "col COLLATE x"
            let ident = part.split_whitespace().next().unwrap_or("");
            unquote_identifier(ident)
        })
        .collect::<Result<Vec<_>>>()?;
    if names.is_empty() {
        return Err(invalid("empty PRIMARY KEY column list"));
    }
    Ok(names)
}

fn resolve_key_columns(columns: &[Column], names: &[String]) -> Result<Vec<usize>> {
    let mut key = Vec::with_capacity(names.len());
    for name in names {
        let index = columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SyncError::UnknownKeyColumn {
                column: name.clone(),
            })?;
        if key.contains(&index) {
            return Err(invalid(format!("column {} repeated in PRIMARY KEY", name)));
        }
        key.push(index);
    }
    Ok(key)
}

const CONSTRAINT_WORDS: &[&str] = &[
    "NOT",
    "NULL",
    "PRIMARY",
    "UNIQUE",
    "DEFAULT",
    "CHECK",
    "REFERENCES",
    "COLLATE",
    "CONSTRAINT",
];

fn affinity(type_name: &str) -> Option<ColumnType> {
    let upper = type_name.to_ascii_uppercase();
    if upper.contains("BOOL") {
        Some(ColumnType::Boolean)
    } else if upper.contains("INT") {
        Some(ColumnType::Integer)
    } else if ["CHAR", "CLOB", "TEXT", "STRING"]
        .iter()
        .any(|w| upper.contains(w))
    {
        Some(ColumnType::Text)
    } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
        .iter()
        .any(|w| upper.contains(w))
    {
        Some(ColumnType::Real)
    } else {
        None
    }
}

fn parse_column(tokens: &[String]) -> Result<(Column, bool)> {
    let name = unquote_identifier(&tokens[0])?;

    let mut i = 1;
    let mut type_words: Vec<&str> = Vec::new();
    while i < tokens.len() && !CONSTRAINT_WORDS.iter().any(|w| keyword(&tokens[i], w)) {
        // size qualifiers such as VARCHAR(255) carry no meaning here
        if !tokens[i].starts_with('(') {
            type_words.push(&tokens[i]);
        }
        i += 1;
    }
    let column_type = if type_words.is_empty() {
        ColumnType::Text
    } else {
        let type_name = type_words.join(" ");
        affinity(&type_name).ok_or_else(|| SyncError::UnsupportedType {
            column: name.clone(),
            type_name: type_name.clone(),
        })?
    };

    let mut nullable = true;
    let mut is_key = false;
    let mut default_literal: Option<&str> = None;

    while i < tokens.len() {
        let token = tokens[i].to_ascii_uppercase();
        match token.as_str() {
            "NOT" if tokens.get(i + 1).map(|t| keyword(t, "NULL")).unwrap_or(false) => {
                nullable = false;
                i += 2;
            }
            "NULL" => {
                i += 1;
            }
            "PRIMARY" if tokens.get(i + 1).map(|t| keyword(t, "KEY")).unwrap_or(false) => {
                is_key = true;
                i += 2;
                while i < tokens.len()
                    && ["ASC", "DESC", "AUTOINCREMENT"]
                        .iter()
                        .any(|w| keyword(&tokens[i], w))
                {
                    i += 1;
                }
            }
            "UNIQUE" => i += 1,
            "DEFAULT" => {
                let literal = tokens
                    .get(i + 1)
                    .ok_or_else(|| invalid(format!("DEFAULT without value for {}", name)))?;
                default_literal = Some(literal);
                i += 2;
            }
            "COLLATE" => i += 2,
            "CONSTRAINT" => i += 2,
            "CHECK" => i += 2,
            // REFERENCES consumes the rest of the definition
            "REFERENCES" => i = tokens.len(),
            _ => {
                return Err(invalid(format!(
                    "unexpected '{}' in definition of column {}",
                    tokens[i], name
                )))
            }
        }
    }

    let default = match default_literal {
        Some(literal) => {
            let json = literal_to_json(literal)
                .ok_or_else(|| invalid(format!("unsupported DEFAULT for {}: {}", name, literal)))?;
            let value = coerce_value(&name, column_type, &json)?;
            if value.is_null() && !nullable {
                return Err(invalid(format!("NOT NULL column {} defaults to NULL", name)));
            }
            Some(value)
        }
        None => None,
    };

    Ok((
        Column {
            name,
            column_type,
            nullable,
            default,
        },
        is_key,
    ))
}

fn literal_to_json(literal: &str) -> Option<serde_json::Value> {
    if literal.len() >= 2 && literal.starts_with('\'') && literal.ends_with('\'') {
        return Some(serde_json::Value::String(
            literal[1..literal.len() - 1].replace("''", "'"),
        ));
    }
    match literal.to_ascii_uppercase().as_str() {
        "NULL" => return Some(serde_json::Value::Null),
        "TRUE" => return Some(serde_json::Value::Bool(true)),
        "FALSE" => return Some(serde_json::Value::Bool(false)),
        _ => {}
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Some(serde_json::Value::from(i));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}
