//! Example template rendering.
//!
//! Response examples in the API document are templates in the familiar
//! `{{ .Field }}` action syntax. The render context exposes `.Params` (path
//! parameters), `.ItemCount` and `.Index`, along with a fixed set of
//! operations:
//!
//! - `JSONArray count template` renders `template` once per item into a JSON array
//! - `ToLower s`
//! - `RandomFirstName`
//! - `RandomFrom a b ...`
//! - `RandomPassword n`
//!
//! Operations may be written as methods (`.RandomFirstName`) or bare
//! functions (`RandomFirstName`), and take part in `|` pipelines.
//!
//! ```text
//! {{.JSONArray .ItemCount `{"id":{{.Index}},"name":"{{.RandomFirstName}}"}`}}
//! ```

mod lexer;
mod parser;

use crate::error::TemplateError;
use crate::random;
use parser::{Command, Node, Operand, Pipeline};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Request data available to a template.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Path parameters from route matching
    pub params: HashMap<String, String>,
    /// Requested repeat count
    pub item_count: i64,
    /// 1-based position inside a `JSONArray` expansion, 0 outside one
    pub index: i64,
    items: ItemBudget,
}

impl RenderContext {
    pub fn new(params: HashMap<String, String>, item_count: i64) -> Self {
        Self {
            params,
            item_count,
            index: 0,
            items: ItemBudget::default(),
        }
    }

    /// Limit the number of `JSONArray` items produced by one render, counted
    /// across every nesting level.
    pub fn with_item_limit(mut self, limit: i64) -> Self {
        self.items = ItemBudget(Arc::new(AtomicI64::new(limit)));
        self
    }

    fn with_index(&self, index: i64) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}

/// Items left for the whole render. Copies made for array items share it.
#[derive(Debug, Clone)]
struct ItemBudget(Arc<AtomicI64>);

impl Default for ItemBudget {
    fn default() -> Self {
        Self(Arc::new(AtomicI64::new(i64::MAX)))
    }
}

impl ItemBudget {
    fn claim(&self) -> bool {
        self.0.fetch_sub(1, Ordering::Relaxed) > 0
    }
}

/// Operations callable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    JsonArray,
    ToLower,
    RandomFirstName,
    RandomFrom,
    RandomPassword,
}

impl Operation {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "JSONArray" => Self::JsonArray,
            "ToLower" => Self::ToLower,
            "RandomFirstName" => Self::RandomFirstName,
            "RandomFrom" => Self::RandomFrom,
            "RandomPassword" => Self::RandomPassword,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::JsonArray => "JSONArray",
            Self::ToLower => "ToLower",
            Self::RandomFirstName => "RandomFirstName",
            Self::RandomFrom => "RandomFrom",
            Self::RandomPassword => "RandomPassword",
        }
    }

    fn call(self, ctx: &RenderContext, args: Vec<Value<'_>>) -> Result<Value<'static>, TemplateError> {
        match self {
            Self::JsonArray => {
                let [count, template] = self.exact_args::<2>(args)?;
                let count = count.as_int(self)?;
                let template = template.as_str(self)?;
                Ok(Value::Str(json_array(ctx, count, &template)))
            }
            Self::ToLower => {
                let [s] = self.exact_args::<1>(args)?;
                Ok(Value::Str(s.as_str(self)?.to_lowercase()))
            }
            Self::RandomFirstName => {
                let [] = self.exact_args::<0>(args)?;
                Ok(Value::Str(random::random_first_name().to_string()))
            }
            Self::RandomFrom => {
                let candidates = args
                    .into_iter()
                    .map(|arg| arg.as_str(self))
                    .collect::<Result<Vec<_>, _>>()?;
                random::random_from(&candidates)
                    .map(|picked| Value::Str(picked.clone()))
                    .ok_or_else(|| {
                        TemplateError::Exec("RandomFrom needs at least one candidate".to_string())
                    })
            }
            Self::RandomPassword => {
                let [len] = self.exact_args::<1>(args)?;
                let len = usize::try_from(len.as_int(self)?).unwrap_or(0);
                Ok(Value::Str(random::random_password(len)))
            }
        }
    }

    fn exact_args<const N: usize>(
        self,
        args: Vec<Value<'_>>,
    ) -> Result<[Value<'_>; N], TemplateError> {
        let got = args.len();
        args.try_into().map_err(|_| {
            TemplateError::Exec(format!(
                "wrong number of args for {}: want {N} got {got}",
                self.name()
            ))
        })
    }
}

/// Render a template against a context.
pub fn render(template: &str, ctx: &RenderContext) -> Result<Vec<u8>, TemplateError> {
    render_string(template, ctx).map(String::into_bytes)
}

/// Render every string in a structured example as a template and serialize
/// the result as JSON.
pub fn render_json(value: &serde_json::Value, ctx: &RenderContext) -> Result<Vec<u8>, TemplateError> {
    let rendered = render_json_value(value, ctx)?;
    serde_json::to_vec(&rendered).map_err(|e| TemplateError::Exec(e.to_string()))
}

fn render_json_value(
    value: &serde_json::Value,
    ctx: &RenderContext,
) -> Result<serde_json::Value, TemplateError> {
    match value {
        serde_json::Value::String(s) if s.contains(lexer::LEFT_DELIM) => {
            Ok(serde_json::Value::String(render_string(s, ctx)?))
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| render_json_value(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        serde_json::Value::Object(fields) => {
            let mut rendered = serde_json::Map::new();
            for (key, field) in fields {
                rendered.insert(key.clone(), render_json_value(field, ctx)?);
            }
            Ok(serde_json::Value::Object(rendered))
        }
        _ => Ok(value.clone()),
    }
}

fn render_string(template: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
    let nodes = parser::parse(template)?;
    execute(&nodes, ctx)
}

fn execute(nodes: &[Node], ctx: &RenderContext) -> Result<String, TemplateError> {
    let exec = Exec { ctx };
    let mut out = String::new();

    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipeline) => {
                let value = exec.pipeline(pipeline)?;
                write!(out, "{value}").map_err(|e| TemplateError::Exec(e.to_string()))?;
            }
        }
    }

    Ok(out)
}

/// Render `template` once per index in `1..=count` and join the successful
/// items into a JSON array. Items that fail are logged and left out, and
/// rendering stops once the context's item limit is used up.
fn json_array(ctx: &RenderContext, count: i64, template: &str) -> String {
    let nodes = match parser::parse(template) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(count, error = %e, "Skipping all JSONArray items, item template does not parse");
            return "[]".to_string();
        }
    };

    let mut truncated = false;
    let out = join_items((1..=count).map_while(|index| {
        if !ctx.items.claim() {
            truncated = true;
            return None;
        }
        Some((index, execute(&nodes, &ctx.with_index(index))))
    }));
    if truncated {
        warn!(count, "JSONArray item limit reached, array truncated");
    }
    out
}

fn join_items(items: impl IntoIterator<Item = (i64, Result<String, TemplateError>)>) -> String {
    let mut out = String::from("[");
    let mut first = true;

    for (index, item) in items {
        match item {
            Ok(item) => {
                if !first {
                    out.push(',');
                }
                out.push_str(&item);
                first = false;
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping JSONArray item that failed to render");
            }
        }
    }

    out.push(']');
    out
}

#[derive(Debug, Clone)]
enum Value<'a> {
    Str(String),
    Int(i64),
    Params(&'a HashMap<String, String>),
    Context(&'a RenderContext),
    /// A path parameter that was not supplied.
    NoValue,
}

impl Value<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Params(_) => "map",
            Self::Context(_) => "context",
            Self::NoValue => "missing value",
        }
    }

    fn as_int(&self, op: Operation) -> Result<i64, TemplateError> {
        match self {
            Self::Int(n) => Ok(*n),
            other => Err(TemplateError::Exec(format!(
                "wrong type for value in {}; expected int; got {}",
                op.name(),
                other.kind()
            ))),
        }
    }

    fn as_str(&self, op: Operation) -> Result<String, TemplateError> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::NoValue => Err(TemplateError::Exec(format!(
                "invalid value; expected string in {}",
                op.name()
            ))),
            other => Err(TemplateError::Exec(format!(
                "wrong type for value in {}; expected string; got {}",
                op.name(),
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Params(params) => write_params(f, params),
            Self::Context(ctx) => {
                f.write_str("{")?;
                write_params(f, &ctx.params)?;
                write!(f, " {} {}}}", ctx.item_count, ctx.index)
            }
            Self::NoValue => f.write_str("<no value>"),
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &HashMap<String, String>) -> fmt::Result {
    let sorted: BTreeMap<_, _> = params.iter().collect();
    f.write_str("map[")?;
    for (i, (k, v)) in sorted.into_iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{k}:{v}")?;
    }
    f.write_str("]")
}

struct Exec<'a> {
    ctx: &'a RenderContext,
}

impl<'a> Exec<'a> {
    fn pipeline(&self, pipeline: &Pipeline) -> Result<Value<'a>, TemplateError> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.command(command, piped)?);
        }
        piped.ok_or_else(|| TemplateError::Exec("empty pipeline".to_string()))
    }

    fn command(
        &self,
        command: &Command,
        piped: Option<Value<'a>>,
    ) -> Result<Value<'a>, TemplateError> {
        let Some((head, rest)) = command.operands.split_first() else {
            return Err(TemplateError::Exec("empty command".to_string()));
        };

        let op = match head {
            Operand::Function(op) => Some(*op),
            Operand::Field(chain) if !is_data_field(&chain[0]) => {
                Some(self.method(chain)?)
            }
            _ => None,
        };

        let Some(op) = op else {
            if !rest.is_empty() || piped.is_some() {
                return Err(TemplateError::Exec(format!(
                    "can't give argument to non-function {}",
                    describe(head)
                )));
            }
            return self.arg(head);
        };

        let mut args = rest
            .iter()
            .map(|operand| self.arg(operand))
            .collect::<Result<Vec<_>, _>>()?;
        args.extend(piped);
        op.call(self.ctx, args)
    }

    /// Evaluate an operand in argument position. Operations are called with
    /// no arguments.
    fn arg(&self, operand: &Operand) -> Result<Value<'a>, TemplateError> {
        match operand {
            Operand::Dot => Ok(Value::Context(self.ctx)),
            Operand::Field(chain) if is_data_field(&chain[0]) => self.field(chain),
            Operand::Field(chain) => self.method(chain)?.call(self.ctx, Vec::new()),
            Operand::Function(op) => op.call(self.ctx, Vec::new()),
            Operand::Str(s) => Ok(Value::Str(s.clone())),
            Operand::Int(n) => Ok(Value::Int(*n)),
            Operand::Pipeline(pipeline) => self.pipeline(pipeline),
        }
    }

    fn field(&self, chain: &[String]) -> Result<Value<'a>, TemplateError> {
        let value = match chain[0].as_str() {
            "Params" => match chain.get(1) {
                None => Value::Params(&self.ctx.params),
                Some(key) => self
                    .ctx
                    .params
                    .get(key)
                    .map_or(Value::NoValue, |v| Value::Str(v.clone())),
            },
            "ItemCount" => Value::Int(self.ctx.item_count),
            "Index" => Value::Int(self.ctx.index),
            other => {
                return Err(TemplateError::Exec(format!(
                    "can't evaluate field {other} in render context"
                )));
            }
        };

        let depth = if matches!(chain[0].as_str(), "Params") { 2 } else { 1 };
        if let Some(extra) = chain.get(depth) {
            return Err(TemplateError::Exec(format!(
                "can't evaluate field {extra} in type {}",
                value.kind()
            )));
        }
        Ok(value)
    }

    fn method(&self, chain: &[String]) -> Result<Operation, TemplateError> {
        let name = &chain[0];
        let op = Operation::from_name(name).ok_or_else(|| {
            TemplateError::Exec(format!("can't evaluate field {name} in render context"))
        })?;
        if let Some(extra) = chain.get(1) {
            return Err(TemplateError::Exec(format!(
                "can't evaluate field {extra} on result of {name}"
            )));
        }
        Ok(op)
    }
}

fn is_data_field(name: &str) -> bool {
    matches!(name, "Params" | "ItemCount" | "Index")
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Dot => ".".to_string(),
        Operand::Field(chain) => format!(".{}", chain.join(".")),
        Operand::Function(op) => op.name().to_string(),
        Operand::Str(s) => format!("{s:?}"),
        Operand::Int(n) => n.to_string(),
        Operand::Pipeline(_) => "(pipeline)".to_string(),
    }
}
