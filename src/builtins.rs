//! The builtin registry.
//!
//! Builtins are named operators with custom syntax: the handler controls
//! its own token consumption, which is what lets `if` and `for` capture
//! their blocks lazily and `func` capture a raw body slice. The registry is
//! built once in [`Parser::new`](crate::Parser::new).

use std::collections::HashMap;

use crate::error::{Location, ParseError};
use crate::lexer::{Token, TokenKind};
use crate::parser::{fold_values, Cursor, Parser};
use crate::scope::ScopeStack;
use crate::types::Field;
use crate::value::{CompoundValue, FunctionValue, Value, ValueKind};

/// A builtin handler. Invoked with the cursor just past the builtin's name;
/// consumes whatever argument syntax the builtin defines.
pub(crate) type BuiltinFn =
    fn(&Parser, &mut Cursor, &mut ScopeStack) -> Result<Value, ParseError>;

/// Builds the builtin registry.
pub(crate) fn registry() -> HashMap<&'static str, BuiltinFn> {
    let mut map: HashMap<&'static str, BuiltinFn> = HashMap::new();
    map.insert("func", builtin_func);
    map.insert("true", builtin_true);
    map.insert("false", builtin_false);
    map.insert("if", builtin_if);
    map.insert("for", builtin_for);
    map.insert("exists", builtin_exists);
    map.insert("set", builtin_set);
    map
}

/// Collects a balanced `( … )` slice, both parens included.
fn collect_block(cur: &mut Cursor) -> Result<Vec<Token>, ParseError> {
    let open = cur.expect(TokenKind::BlockStart, "'('")?;
    let mut body = vec![open.clone()];
    let mut depth = 1usize;
    while depth > 0 {
        let Some(token) = cur.next() else {
            return Err(cur.eof("')'"));
        };
        match token.kind {
            TokenKind::BlockStart => depth += 1,
            TokenKind::BlockEnd => depth -= 1,
            _ => {}
        }
        body.push(token.clone());
    }
    Ok(body)
}

/// A block for `if`/`for`: either a parenthesized slice or a single token.
fn collect_block_or_token(cur: &mut Cursor) -> Result<Vec<Token>, ParseError> {
    if cur.at(TokenKind::BlockStart) {
        collect_block(cur)
    } else {
        let token = cur.next().ok_or_else(|| cur.eof("a block"))?;
        Ok(vec![token.clone()])
    }
}

/// `func ( (arg : type)* ) ( body )`: constructs a declared function
/// capturing the current scope stack.
fn builtin_func(
    parser: &Parser,
    cur: &mut Cursor,
    scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    cur.expect(TokenKind::BlockStart, "'('")?;
    let mut params = Vec::new();
    loop {
        let token = cur.peek().ok_or_else(|| cur.eof("')'"))?;
        if token.kind == TokenKind::BlockEnd {
            cur.next();
            break;
        }
        let name = cur
            .expect(TokenKind::Identifier, "an argument name")?
            .lexeme
            .clone();
        cur.expect(TokenKind::Colon, "':'")?;
        let ty = parser.parse_type(cur, scope)?;
        params.push(Field::new(name, ty));
    }
    let body = collect_block(cur)?;
    Ok(Value {
        key: String::new(),
        kind: ValueKind::Function(FunctionValue::declared(params, body, scope.clone())),
    })
}

/// `true`: the number 1.
fn builtin_true(
    _parser: &Parser,
    _cur: &mut Cursor,
    _scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    Ok(Value::number(1.0))
}

/// `false`: the number 0.
fn builtin_false(
    _parser: &Parser,
    _cur: &mut Cursor,
    _scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    Ok(Value::number(0.0))
}

/// `if <cond> <block> [else <block>]`: evaluates only the selected block;
/// a missing else yields the empty string.
fn builtin_if(
    parser: &Parser,
    cur: &mut Cursor,
    scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    let cond_loc = cur.peek().map(Location::of).unwrap_or_default();
    let cond = parser.parse_value(cur, scope)?;
    let cond = match cond.kind {
        ValueKind::Number(n) => n,
        other => {
            return Err(ParseError::Type {
                message: format!("invalid entry type: expected Number but got {}", other.tag()),
                loc: cond_loc,
            })
        }
    };

    let then_block = collect_block_or_token(cur)?;
    let else_block = if cur.peek().is_some_and(|t| {
        t.kind == TokenKind::Identifier && t.lexeme == "else"
    }) {
        cur.next();
        collect_block_or_token(cur)?
    } else {
        vec![Token::new(TokenKind::String, "", "<builtin>", 0, 0)]
    };

    let chosen = if cond != 0.0 { then_block } else { else_block };
    let mut body_cur = Cursor::new(&chosen);
    parser.parse_value(&mut body_cur, scope)
}

/// `for <ident> in <list-expr> <block>`: one frame per element binding
/// the iteration variable; the per-iteration results are folded.
fn builtin_for(
    parser: &Parser,
    cur: &mut Cursor,
    scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    let var = cur
        .expect(TokenKind::Identifier, "an iteration variable")?
        .lexeme
        .clone();
    let keyword = cur.expect(TokenKind::Identifier, "'in'")?;
    if keyword.lexeme != "in" {
        return Err(ParseError::UnexpectedToken {
            expected: "'in'".to_string(),
            found: format!("'{}'", keyword.lexeme),
            loc: Location::of(keyword),
        });
    }

    let list_loc = cur.peek().map(Location::of).unwrap_or_default();
    let source = parser.parse_value(cur, scope)?;
    let list = match source.kind {
        ValueKind::List(list) => list,
        other => {
            return Err(ParseError::Type {
                message: format!("invalid entry type: expected List but got {}", other.tag()),
                loc: list_loc,
            })
        }
    };

    let body = collect_block_or_token(cur)?;

    let mut result: Option<Value> = None;
    for item in list.into_items() {
        let frame = std::rc::Rc::new(std::cell::RefCell::new(CompoundValue::new()));
        frame.borrow_mut().add(item.with_key(var.clone()));
        scope.push(frame);
        let mut body_cur = Cursor::new(&body);
        let next = parser.parse_value(&mut body_cur, scope);
        scope.pop();
        let next = next?;
        result = Some(match result {
            None => next,
            Some(acc) => fold_values(acc, next).map_err(|message| ParseError::Type {
                message,
                loc: list_loc.clone(),
            })?,
        });
    }
    Ok(result.unwrap_or_else(|| Value::string("")))
}

/// `exists <dotted-path>`: 1 when the path resolves, else 0.
fn builtin_exists(
    parser: &Parser,
    cur: &mut Cursor,
    scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    let (path, _) = parser.parse_dotted_path(cur)?;
    let found = scope.lookup(&path).is_some();
    Ok(Value::number(if found { 1.0 } else { 0.0 }))
}

/// `set <ident> <expr>`: binds a clone in the innermost frame and returns
/// the bound value.
fn builtin_set(
    parser: &Parser,
    cur: &mut Cursor,
    scope: &mut ScopeStack,
) -> Result<Value, ParseError> {
    let name = cur
        .expect(TokenKind::Identifier, "an identifier")?
        .lexeme
        .clone();
    let value = parser.parse_value(cur, scope)?.with_key(name);
    let top = scope.top().ok_or_else(|| ParseError::Fatal {
        message: "scope stack is empty".to_string(),
    })?;
    top.borrow_mut().add(value.clone());
    Ok(value)
}
