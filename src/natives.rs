//! The native-function registry.
//!
//! Native functions are fixed-arity callables with ordinary call syntax;
//! their arguments are parsed, cloned, and validated by the shared call
//! machinery before the host callback runs with the argument compound.
//! The registry is built once in [`Parser::new`](crate::Parser::new).

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ParseError;
use crate::parser::Parser;
use crate::scope::ScopeStack;
use crate::types::{Field, Type};
use crate::value::{CompoundValue, FunctionValue, ListValue, Value, ValueKind};

/// A native handler: invoked with the argument frame already pushed onto
/// the scope stack and the argument compound itself.
pub type NativeFn = fn(&Parser, &mut ScopeStack, &CompoundValue) -> Result<Value, ParseError>;

/// Builds the native registry.
pub(crate) fn registry() -> HashMap<&'static str, FunctionValue> {
    let mut map = HashMap::new();

    insert(&mut map, "print", vec![any("value")], native_print);
    insert(&mut map, "printLn", vec![any("value")], native_print_ln);
    insert(&mut map, "printErr", vec![any("value")], native_print_err);
    insert(&mut map, "printErrLn", vec![any("value")], native_print_err_ln);
    insert(&mut map, "readLn", vec![], native_read_ln);
    insert(&mut map, "use", vec![string("file")], native_use);
    insert(&mut map, "runshell", vec![string("command")], native_runshell);
    insert(&mut map, "exit", vec![number("value")], native_exit);

    insert(&mut map, "eq", binary_params(), native_eq);
    insert(&mut map, "ne", binary_params(), native_ne);
    insert(&mut map, "add", binary_params(), native_add);
    insert(&mut map, "sub", binary_params(), native_sub);
    insert(&mut map, "mul", binary_params(), native_mul);
    insert(&mut map, "div", binary_params(), native_div);
    insert(&mut map, "gt", binary_params(), native_gt);
    insert(&mut map, "lt", binary_params(), native_lt);
    insert(&mut map, "ge", binary_params(), native_ge);
    insert(&mut map, "le", binary_params(), native_le);
    insert(&mut map, "and", binary_params(), native_and);
    insert(&mut map, "or", binary_params(), native_or);
    insert(&mut map, "mod", binary_params(), native_mod);
    insert(&mut map, "shl", binary_params(), native_shl);
    insert(&mut map, "shr", binary_params(), native_shr);
    insert(&mut map, "range", binary_params(), native_range);
    insert(&mut map, "not", vec![number("value")], native_not);
    insert(&mut map, "inc", vec![number("value")], native_inc);
    insert(&mut map, "dec", vec![number("value")], native_dec);

    insert(&mut map, "string-length", vec![string("value")], native_string_length);
    insert(
        &mut map,
        "string-substring",
        vec![string("string"), number("start"), number("end")],
        native_string_substring,
    );

    insert(&mut map, "list-length", vec![list("list")], native_list_length);
    insert(
        &mut map,
        "list-get",
        vec![list("list"), number("index")],
        native_list_get,
    );
    insert(
        &mut map,
        "list-set",
        vec![list("list"), number("index"), any("value")],
        native_list_set,
    );
    insert(
        &mut map,
        "list-append",
        vec![list("list"), any("value")],
        native_list_append,
    );
    insert(
        &mut map,
        "list-remove",
        vec![list("list"), number("index")],
        native_list_remove,
    );

    insert(&mut map, "file-read", vec![string("filename")], native_file_read);
    insert(
        &mut map,
        "file-write",
        vec![string("path"), string("content")],
        native_file_write,
    );
    insert(&mut map, "file-exists", vec![string("filename")], native_file_exists);
    insert(&mut map, "file-isdir", vec![string("filename")], native_file_isdir);
    insert(&mut map, "file-isfile", vec![string("filename")], native_file_isfile);
    insert(&mut map, "file-mkdir", vec![string("path")], native_file_mkdir);
    insert(&mut map, "file-rmdir", vec![string("path")], native_file_rmdir);
    insert(&mut map, "file-remove", vec![string("path")], native_file_remove);
    insert(
        &mut map,
        "file-copy",
        vec![string("from"), string("to")],
        native_file_copy,
    );
    insert(&mut map, "file-dirname", vec![string("filename")], native_file_dirname);
    insert(&mut map, "file-basename", vec![string("filename")], native_file_basename);
    insert(&mut map, "file-extname", vec![string("filename")], native_file_extname);

    map
}

fn insert(
    map: &mut HashMap<&'static str, FunctionValue>,
    name: &'static str,
    params: Vec<Field>,
    handler: NativeFn,
) {
    map.insert(name, FunctionValue::native(name, params, handler));
}

fn any(name: &str) -> Field {
    Field::new(name, Type::any())
}

fn string(name: &str) -> Field {
    Field::new(name, Type::string())
}

fn number(name: &str) -> Field {
    Field::new(name, Type::number())
}

fn list(name: &str) -> Field {
    Field::new(name, Type::list(Type::any()))
}

fn binary_params() -> Vec<Field> {
    vec![number("a"), number("b")]
}

// === argument accessors ===

fn arg<'a>(args: &'a CompoundValue, key: &str) -> Result<&'a Value, ParseError> {
    args.get(key)
        .ok_or_else(|| ParseError::runtime(format!("missing argument '{key}'")))
}

fn string_arg<'a>(args: &'a CompoundValue, key: &str) -> Result<&'a str, ParseError> {
    args.get_string(key)
        .ok_or_else(|| ParseError::runtime(format!("missing string argument '{key}'")))
}

fn number_arg(args: &CompoundValue, key: &str) -> Result<f64, ParseError> {
    args.get_number(key)
        .ok_or_else(|| ParseError::runtime(format!("missing number argument '{key}'")))
}

fn list_arg<'a>(args: &'a CompoundValue, key: &str) -> Result<&'a ListValue, ParseError> {
    args.get_list(key)
        .ok_or_else(|| ParseError::runtime(format!("missing list argument '{key}'")))
}

// === console I/O ===

fn write_value<W: Write>(value: &Value, out: &mut W, what: &str) -> Result<(), ParseError> {
    let result = match &value.kind {
        ValueKind::String(s) => write!(out, "{s}"),
        ValueKind::Number(n) => write!(out, "{n}"),
        ValueKind::List(_) | ValueKind::Compound(_) => value.print(out, 0),
        other => {
            return Err(ParseError::runtime(format!(
                "invalid entry type in {what}: expected String or Number but got {}",
                other.tag()
            )))
        }
    };
    result.map_err(|err| ParseError::runtime(format!("failed to write output: {err}")))
}

fn native_print(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = arg(args, "value")?;
    write_value(value, &mut io::stdout().lock(), "print")?;
    Ok(value.clone())
}

fn native_print_ln(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = arg(args, "value")?;
    let mut out = io::stdout().lock();
    write_value(value, &mut out, "printLn")?;
    writeln!(out).map_err(|err| ParseError::runtime(format!("failed to write output: {err}")))?;
    Ok(value.clone())
}

fn native_print_err(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = arg(args, "value")?;
    write_value(value, &mut io::stderr().lock(), "printErr")?;
    Ok(value.clone())
}

fn native_print_err_ln(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = arg(args, "value")?;
    let mut out = io::stderr().lock();
    write_value(value, &mut out, "printErrLn")?;
    writeln!(out).map_err(|err| ParseError::runtime(format!("failed to write output: {err}")))?;
    Ok(value.clone())
}

fn native_read_ln(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    _args: &CompoundValue,
) -> Result<Value, ParseError> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| ParseError::runtime(format!("failed to read stdin: {err}")))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::string(line))
}

// === includes and the shell ===

fn native_use(
    parser: &Parser,
    scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let file = string_arg(args, "file")?;
    let mut path = PathBuf::from(file);
    if !path.exists() && path.is_relative() {
        path = Path::new("lynx-libs").join(&path);
    }
    if !path.exists() {
        return Err(ParseError::runtime(format!("file '{file}' does not exist")));
    }

    log::debug!("including '{}'", path.display());
    let included = parser.parse_include(&path, scope)?;

    // the frame below the argument compound is the caller's enclosing
    // compound; that is where the include lands
    let target = scope
        .nth_from_top(1)
        .ok_or_else(|| ParseError::Fatal {
            message: format!("invalid compound stack depth {} for include", scope.depth()),
        })?
        .clone();
    if let ValueKind::Compound(compound) = &included.kind {
        target.borrow_mut().merge(compound.clone());
    }
    Ok(included)
}

fn native_runshell(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let command = string_arg(args, "command")?;
    let output = shell(command)
        .output()
        .map_err(|err| ParseError::runtime(format!("failed to run shell command: {err}")))?;
    if !output.status.success() {
        return Err(ParseError::runtime(format!(
            "shell command exited with {}",
            output.status
        )));
    }
    Ok(Value::string(
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn native_exit(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    std::process::exit(number_arg(args, "value")? as i32);
}

// === numeric operators ===

macro_rules! arith_native {
    ($name:ident, $op:tt) => {
        fn $name(
            _parser: &Parser,
            _scope: &mut ScopeStack,
            args: &CompoundValue,
        ) -> Result<Value, ParseError> {
            let a = number_arg(args, "a")?;
            let b = number_arg(args, "b")?;
            Ok(Value::number(a $op b))
        }
    };
}

macro_rules! cmp_native {
    ($name:ident, $op:tt) => {
        fn $name(
            _parser: &Parser,
            _scope: &mut ScopeStack,
            args: &CompoundValue,
        ) -> Result<Value, ParseError> {
            let a = number_arg(args, "a")?;
            let b = number_arg(args, "b")?;
            Ok(Value::number(if a $op b { 1.0 } else { 0.0 }))
        }
    };
}

arith_native!(native_add, +);
arith_native!(native_sub, -);
arith_native!(native_mul, *);
arith_native!(native_div, /);
arith_native!(native_mod, %);

cmp_native!(native_eq, ==);
cmp_native!(native_ne, !=);
cmp_native!(native_gt, >);
cmp_native!(native_lt, <);
cmp_native!(native_ge, >=);
cmp_native!(native_le, <=);

fn native_and(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let a = number_arg(args, "a")? != 0.0;
    let b = number_arg(args, "b")? != 0.0;
    Ok(Value::number(if a && b { 1.0 } else { 0.0 }))
}

fn native_or(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let a = number_arg(args, "a")? != 0.0;
    let b = number_arg(args, "b")? != 0.0;
    Ok(Value::number(if a || b { 1.0 } else { 0.0 }))
}

fn native_not(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = number_arg(args, "value")?;
    Ok(Value::number(if value == 0.0 { 1.0 } else { 0.0 }))
}

fn native_shl(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let a = number_arg(args, "a")? as i64;
    let b = number_arg(args, "b")? as i64;
    Ok(Value::number(a.wrapping_shl(b as u32) as f64))
}

fn native_shr(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let a = number_arg(args, "a")? as i64;
    let b = number_arg(args, "b")? as i64;
    Ok(Value::number(a.wrapping_shr(b as u32) as f64))
}

fn native_range(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let start = number_arg(args, "a")? as i64;
    let end = number_arg(args, "b")? as i64;
    let mut result = ListValue::new();
    for i in start..end {
        // homogeneous by construction
        let _ = result.add(Value::number(i as f64));
    }
    Ok(Value {
        key: String::new(),
        kind: ValueKind::List(result),
    })
}

fn native_inc(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    Ok(Value::number(number_arg(args, "value")? + 1.0))
}

fn native_dec(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    Ok(Value::number(number_arg(args, "value")? - 1.0))
}

// === strings ===

fn native_string_length(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = string_arg(args, "value")?;
    Ok(Value::number(value.chars().count() as f64))
}

fn native_string_substring(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let value = string_arg(args, "string")?;
    let start = number_arg(args, "start")? as i64;
    let end = number_arg(args, "end")? as i64;
    let len = value.chars().count() as i64;
    if start < 0 || start > end || end >= len {
        return Err(ParseError::runtime(
            "invalid start or end value in string-substring",
        ));
    }
    let result: String = value
        .chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();
    Ok(Value::string(result))
}

// === lists ===

fn native_list_length(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    Ok(Value::number(list_arg(args, "list")?.len() as f64))
}

fn list_index(args: &CompoundValue, len: usize) -> Result<usize, ParseError> {
    let index = number_arg(args, "index")? as i64;
    if index < 0 || index as usize >= len {
        return Err(ParseError::runtime("index out of bounds"));
    }
    Ok(index as usize)
}

fn native_list_get(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let list = list_arg(args, "list")?;
    let index = list_index(args, list.len())?;
    list.get(index)
        .cloned()
        .ok_or_else(|| ParseError::runtime("index out of bounds"))
}

fn native_list_set(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let mut result = list_arg(args, "list")?.clone();
    let index = list_index(args, result.len())?;
    let value = arg(args, "value")?.clone().with_key("");
    result
        .set(index, value)
        .map_err(|(expected, got)| {
            ParseError::runtime(format!(
                "invalid entry type in set: expected {expected} but got {got}"
            ))
        })?;
    Ok(Value {
        key: String::new(),
        kind: ValueKind::List(result),
    })
}

fn native_list_append(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let mut result = list_arg(args, "list")?.clone();
    let value = arg(args, "value")?.clone().with_key("");
    result.add(value).map_err(|(expected, got)| {
        ParseError::runtime(format!(
            "invalid entry type in append: expected {expected} but got {got}"
        ))
    })?;
    Ok(Value {
        key: String::new(),
        kind: ValueKind::List(result),
    })
}

fn native_list_remove(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let mut result = list_arg(args, "list")?.clone();
    let index = list_index(args, result.len())?;
    result.remove(index);
    Ok(Value {
        key: String::new(),
        kind: ValueKind::List(result),
    })
}

// === filesystem ===

fn nonempty_path<'a>(args: &'a CompoundValue, key: &str, what: &str) -> Result<&'a str, ParseError> {
    let path = string_arg(args, key)?;
    if path.is_empty() {
        return Err(ParseError::runtime(format!("invalid path in {what}")));
    }
    Ok(path)
}

fn native_file_read(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-read")?;
    let content = fs::read_to_string(path)
        .map_err(|err| ParseError::runtime(format!("failed to read file '{path}': {err}")))?;
    Ok(Value::string(content))
}

fn native_file_write(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "path", "file-write")?;
    let content = string_arg(args, "content")?;
    let target = Path::new(path);
    if target.is_dir() {
        fs::remove_dir_all(target)
            .map_err(|err| ParseError::runtime(format!("failed to remove '{path}': {err}")))?;
    }
    fs::write(target, content)
        .map_err(|err| ParseError::runtime(format!("failed to write file '{path}': {err}")))?;
    Ok(Value::string(path))
}

fn native_file_exists(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-exists")?;
    Ok(Value::number(if Path::new(path).exists() { 1.0 } else { 0.0 }))
}

fn native_file_isdir(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-isdir")?;
    Ok(Value::number(if Path::new(path).is_dir() { 1.0 } else { 0.0 }))
}

fn native_file_isfile(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-isfile")?;
    Ok(Value::number(if Path::new(path).is_file() { 1.0 } else { 0.0 }))
}

fn native_file_mkdir(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "path", "file-mkdir")?;
    if Path::new(path).exists() {
        return Err(ParseError::runtime(format!("path already exists: {path}")));
    }
    fs::create_dir_all(path)
        .map_err(|err| ParseError::runtime(format!("failed to create directory '{path}': {err}")))?;
    Ok(Value::string(""))
}

fn native_file_rmdir(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "path", "file-rmdir")?;
    let target = Path::new(path);
    if !target.exists() {
        return Err(ParseError::runtime(format!("path does not exist: {path}")));
    }
    let result = if target.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };
    result.map_err(|err| ParseError::runtime(format!("failed to remove '{path}': {err}")))?;
    Ok(Value::string(""))
}

fn native_file_remove(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "path", "file-remove")?;
    if !Path::new(path).exists() {
        return Err(ParseError::runtime(format!("path does not exist: {path}")));
    }
    fs::remove_file(path)
        .map_err(|err| ParseError::runtime(format!("failed to remove '{path}': {err}")))?;
    Ok(Value::string(""))
}

fn native_file_copy(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let from = nonempty_path(args, "from", "file-copy")?;
    let to = nonempty_path(args, "to", "file-copy")?;
    let source = Path::new(from);
    let dest = Path::new(to);
    if !source.exists() {
        return Err(ParseError::runtime(format!(
            "source file does not exist: {from}"
        )));
    }
    if source.is_dir() {
        return Err(ParseError::runtime(format!(
            "source path is a directory: {from}"
        )));
    }
    if dest.is_dir() {
        return Err(ParseError::runtime(format!(
            "destination path is a directory: {to}"
        )));
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|err| {
                ParseError::runtime(format!(
                    "failed to create directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }
    }
    fs::copy(source, dest)
        .map_err(|err| ParseError::runtime(format!("failed to copy '{from}' to '{to}': {err}")))?;
    Ok(Value::string(to))
}

fn native_file_dirname(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-dirname")?;
    let parent = Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Value::string(parent))
}

fn native_file_basename(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-basename")?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Value::string(name))
}

fn native_file_extname(
    _parser: &Parser,
    _scope: &mut ScopeStack,
    args: &CompoundValue,
) -> Result<Value, ParseError> {
    let path = nonempty_path(args, "filename", "file-extname")?;
    let ext = Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Ok(Value::string(ext))
}
