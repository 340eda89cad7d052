//! Template functions registered with every render.

use super::TemplateContext;
use crate::{bindings::Bindings, error::ResolveError, site::call_builtin};
use serde_json::Value;
use std::collections::HashMap;
use tera::Tera;

type Args = HashMap<String, Value>;

/// Register built-in and user helper functions on `tera`.
pub(super) fn register(tera: &mut Tera, ctx: &TemplateContext) {
    for name in ["is_server", "is_build", "is_production", "is_development"] {
        let ctx = ctx.clone();
        tera.register_function(name, move |_: &Args| {
            call_builtin(ctx.config(), name)
                .ok_or_else(|| tera::Error::msg(format!("unknown built-in `{name}`")))
        });
    }

    let c = ctx.clone();
    tera.register_function("http_prefix", move |_: &Args| {
        Ok(Value::String(c.config().http_prefix()))
    });

    let c = ctx.clone();
    tera.register_function("asset_http_prefix", move |_: &Args| {
        Ok(Value::String(c.config().asset_http_prefix()))
    });

    let c = ctx.clone();
    tera.register_function("asset_path", move |args: &Args| {
        let segments = path_segments("asset_path", args)?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        c.asset_path(&segments)
            .map(Value::String)
            .map_err(resolve_error)
    });

    let c = ctx.clone();
    tera.register_function("canonical_url", move |args: &Args| {
        let segments = path_segments("canonical_url", args)?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        Ok(Value::String(c.canonical_url(&segments)))
    });

    let c = ctx.clone();
    tera.register_function("include_file", move |args: &Args| {
        let path = str_arg("include_file", args, "path")?;
        c.include_file(path).map(Value::String).map_err(anyhow_error)
    });

    let c = ctx.clone();
    tera.register_function("render", move |args: &Args| {
        let path = str_arg("render", args, "path")?;
        let locals: Bindings = args
            .iter()
            .filter(|(key, _)| key.as_str() != "path")
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        c.render(path, locals).map(Value::String).map_err(anyhow_error)
    });

    for (name, helper) in ctx.helpers() {
        let c = ctx.clone();
        let helper = helper.clone();
        let fn_name = name.clone();
        tera.register_function(name, move |args: &Args| {
            helper(c.config(), args).map_err(|err| {
                tera::Error::chain(format!("helper `{fn_name}` failed"), err)
            })
        });
    }
}

fn str_arg<'a>(function: &str, args: &'a Args, key: &str) -> tera::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("`{function}` requires a string `{key}` argument")))
}

/// Path segments from `path="a/b"` or `segments=["a", "b"]`.
fn path_segments(function: &str, args: &Args) -> tera::Result<Vec<String>> {
    match (args.get("path"), args.get("segments")) {
        (Some(Value::String(path)), None) => Ok(vec![path.clone()]),
        (None, Some(Value::Array(items))) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(tera::Error::msg(format!(
                    "`{function}` segments must be strings, got {other}"
                ))),
            })
            .collect(),
        _ => Err(tera::Error::msg(format!(
            "`{function}` takes either `path` (string) or `segments` (array)"
        ))),
    }
}

fn resolve_error(err: ResolveError) -> tera::Error {
    tera::Error::chain(err.to_string(), err)
}

/// Keep a [`ResolveError`] reachable through the engine's error chain.
fn anyhow_error(err: anyhow::Error) -> tera::Error {
    let message = format!("{err:#}");
    match err.downcast::<ResolveError>() {
        Ok(resolve) => tera::Error::chain(message, resolve),
        Err(err) => tera::Error::chain(message, err),
    }
}
