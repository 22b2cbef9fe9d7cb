//! Python `requests` script emission.
//!
//! Renders a `SessionAnalysis` as a runnable script: the baseline becomes
//! one `session.headers.update(...)` call, each request spec becomes one
//! `session.<method>(...)` call, and inferred values become Python
//! variables bound right after the response they were copied from.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use har_replay::{
    Entry, NormalizedSession, Provenance, RequestSpec, ResponseLocation, SessionAnalysis,
    SpecBody,
};

/// Output options for the generated script.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Emit `assert r.status_code == N` after each request.
    pub assertions: bool,
    /// Append each response body as `#` comments.
    pub show_responses: bool,
}

/// A variable bound from a response, emitted after its source request.
struct Binding {
    name: String,
    expression: String,
}

/// Render a session analysis as a Python `requests` script.
pub fn emit_python(
    analysis: &SessionAnalysis,
    session: &NormalizedSession,
    opts: &EmitOptions,
) -> String {
    let (var_names, bindings_by_source) = collect_bindings(analysis, &session.entries);

    let mut out = String::new();
    out.push_str("#!/usr/bin/env python3\nimport requests\n\n");
    out.push_str("session = requests.Session()\n");

    if !analysis.baseline.is_empty() {
        let pairs: Vec<(String, String)> = analysis
            .baseline
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        let _ = writeln!(out, "session.headers.update({})", py_dict(&pairs));
    }
    out.push('\n');

    for spec in &analysis.requests {
        render_request(&mut out, spec, &var_names);

        if opts.assertions {
            let _ = writeln!(
                out,
                "assert r.status_code == {}, f'expected {} but got {{r.status_code}} for {}'",
                spec.status, spec.status, spec.url
            );
        }

        if let Some(bindings) = bindings_by_source.get(&spec.index) {
            out.push_str("# extracted from the response above\n");
            for binding in bindings {
                let _ = writeln!(out, "{} = {}", binding.name, binding.expression);
            }
        }

        if opts.show_responses {
            if let Some(body) = session
                .entries
                .get(spec.index)
                .and_then(|e| e.response.body.as_deref())
            {
                for line in body.lines() {
                    let _ = writeln!(out, "# {line}");
                }
            }
        }

        out.push('\n');
    }

    out
}

/// First pass: assign a variable name to every distinct inferred value and
/// group the bindings by source entry.
fn collect_bindings(
    analysis: &SessionAnalysis,
    entries: &[Entry],
) -> (HashMap<Provenance, String>, HashMap<usize, Vec<Binding>>) {
    let mut var_names: HashMap<Provenance, String> = HashMap::new();
    let mut bindings_by_source: HashMap<usize, Vec<Binding>> = HashMap::new();
    let mut used_names: HashSet<String> = HashSet::new();

    for spec in &analysis.requests {
        for (name, provenance) in &spec.headers {
            bind(
                name,
                provenance,
                entries,
                &mut var_names,
                &mut bindings_by_source,
                &mut used_names,
            );
        }
        match &spec.body {
            Some(SpecBody::Form(fields)) => {
                for (name, provenance) in fields {
                    bind(
                        name,
                        provenance,
                        entries,
                        &mut var_names,
                        &mut bindings_by_source,
                        &mut used_names,
                    );
                }
            }
            Some(SpecBody::Opaque(provenance)) => {
                bind(
                    "body",
                    provenance,
                    entries,
                    &mut var_names,
                    &mut bindings_by_source,
                    &mut used_names,
                );
            }
            None => {}
        }
    }

    (var_names, bindings_by_source)
}

fn bind(
    hint: &str,
    provenance: &Provenance,
    entries: &[Entry],
    var_names: &mut HashMap<Provenance, String>,
    bindings_by_source: &mut HashMap<usize, Vec<Binding>>,
    used_names: &mut HashSet<String>,
) {
    let Provenance::FromResponse {
        entry,
        location,
        value,
    } = provenance
    else {
        return;
    };
    if var_names.contains_key(provenance) {
        return;
    }
    let name = unique_name(hint, used_names);
    let expression = binding_expression(entries.get(*entry), location, value);
    var_names.insert(provenance.clone(), name.clone());
    bindings_by_source
        .entry(*entry)
        .or_default()
        .push(Binding { name, expression });
}

/// Python expression reconstructing `value` from the source response.
/// Falls back to a string literal when the response can no longer be
/// addressed (the script still replays correctly, just less dynamically).
fn binding_expression(entry: Option<&Entry>, location: &ResponseLocation, value: &str) -> String {
    let literal = py_str(value);
    let Some(entry) = entry else {
        return literal;
    };

    match location {
        ResponseLocation::Header { name } => format!("r.headers[{}]", py_str(name)),
        ResponseLocation::JsonField { path } => {
            let mut expr = "r.json()".to_string();
            for segment in path {
                let _ = write!(expr, "[{}]", py_str(segment));
            }
            let leaf = json_leaf(entry, path);
            match leaf {
                Some(leaf) if leaf == value => expr,
                Some(leaf) => wrap_partial(value, &leaf, &expr).unwrap_or(literal),
                None => literal,
            }
        }
        ResponseLocation::BodySpan { start, len } => {
            let Some(body) = entry.response.body.as_deref() else {
                return literal;
            };
            // Python slices count code points; byte offsets only line up
            // for ASCII bodies.
            if !body.is_ascii() {
                return literal;
            }
            let Some(span) = body.get(*start..start + len) else {
                return literal;
            };
            let expr = format!("r.text[{}:{}]", start, start + len);
            if span == value {
                expr
            } else {
                wrap_partial(value, span, &expr).unwrap_or(literal)
            }
        }
    }
}

/// `value` = prefix + fragment + suffix, rendered as Python concatenation.
fn wrap_partial(value: &str, fragment: &str, expr: &str) -> Option<String> {
    let at = value.find(fragment)?;
    let prefix = &value[..at];
    let suffix = &value[at + fragment.len()..];
    let mut parts = Vec::new();
    if !prefix.is_empty() {
        parts.push(py_str(prefix));
    }
    parts.push(expr.to_string());
    if !suffix.is_empty() {
        parts.push(py_str(suffix));
    }
    Some(parts.join(" + "))
}

/// String leaf of the source response's JSON body at `path`.
fn json_leaf(entry: &Entry, path: &[String]) -> Option<String> {
    let body = entry.response.body.as_deref()?;
    let mut node: serde_json::Value = serde_json::from_str(body).ok()?;
    for segment in path {
        node = node.get_mut(segment)?.take();
    }
    match node {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

fn render_request(out: &mut String, spec: &RequestSpec, var_names: &HashMap<Provenance, String>) {
    let method = spec.method.to_ascii_lowercase();
    let known = matches!(
        method.as_str(),
        "get" | "post" | "put" | "delete" | "head" | "options" | "patch"
    );
    if known {
        let _ = writeln!(out, "r = session.{method}(");
    } else {
        let _ = writeln!(out, "r = session.request({},", py_str(&spec.method));
    }
    let _ = writeln!(out, "    {},", py_str(&spec.url));

    if !spec.query.is_empty() {
        let _ = writeln!(out, "    params={},", py_dict(&spec.query));
    }
    if !spec.cookies.is_empty() {
        let _ = writeln!(out, "    cookies={},", py_dict(&spec.cookies));
    }
    if !spec.headers.is_empty() {
        let rendered: Vec<String> = spec
            .headers
            .iter()
            .map(|(name, p)| format!("{}: {}", py_str(name), py_value(p, var_names)))
            .collect();
        let _ = writeln!(out, "    headers={{{}}},", rendered.join(", "));
    }
    match &spec.body {
        Some(SpecBody::Form(fields)) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(name, p)| format!("{}: {}", py_str(name), py_value(p, var_names)))
                .collect();
            let _ = writeln!(out, "    data={{{}}},", rendered.join(", "));
        }
        Some(SpecBody::Opaque(p)) => {
            let _ = writeln!(out, "    data={},", py_value(p, var_names));
        }
        None => {}
    }
    out.push_str(")\n");
}

/// A provenance-resolved value: the bound variable if one exists, a string
/// literal otherwise.
fn py_value(provenance: &Provenance, var_names: &HashMap<Provenance, String>) -> String {
    match var_names.get(provenance) {
        Some(name) => name.clone(),
        None => py_str(provenance.value()),
    }
}

/// Python single-quoted string literal.
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn py_dict(pairs: &[(String, String)]) -> String {
    let rendered: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", py_str(k), py_str(v)))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}

/// Derive an unused Python identifier from a header or field name.
fn unique_name(hint: &str, used: &mut HashSet<String>) -> String {
    let mut base: String = hint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert_str(0, "value_");
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use har_replay::{analyze_har, AnalysisConfig};

    const TOKEN: &str = "tok_4f9a8b7c6d5e4f3a2b1c";

    fn token_flow_har() -> String {
        format!(
            r#"{{"log":{{"entries":[
            {{"startedDateTime":"2024-01-01T00:00:01Z",
              "request":{{"method":"POST","url":"https://api.example.com/login","bodySize":10,
                         "headers":[{{"name":"Accept","value":"*/*"}}],
                         "postData":{{"params":[{{"name":"user","value":"alice"}}]}}}},
              "response":{{"status":200,"headers":[],
                          "content":{{"size":40,"text":"{{\"token\":\"{TOKEN}\"}}"}}}}}},
            {{"startedDateTime":"2024-01-01T00:00:02Z",
              "request":{{"method":"GET","url":"https://api.example.com/me",
                         "headers":[{{"name":"Accept","value":"*/*"}},
                                    {{"name":"Authorization","value":"{TOKEN}"}}]}},
              "response":{{"status":200,"headers":[],"content":{{"size":2,"text":"{{}}"}}}}}}
            ]}}}}"#
        )
    }

    fn emit(opts: &EmitOptions) -> String {
        let config = AnalysisConfig::default();
        let (session, analysis) = analyze_har(&token_flow_har(), &config).unwrap();
        emit_python(&analysis, &session, opts)
    }

    #[test]
    fn test_baseline_rendered_once() {
        let script = emit(&EmitOptions::default());
        assert_eq!(
            script
                .matches("session.headers.update({'Accept': '*/*'})")
                .count(),
            1
        );
        // Accept never shows up in a per-request header dict.
        assert!(!script.contains("headers={'Accept'"));
    }

    #[test]
    fn test_token_bound_after_login_and_reused() {
        let script = emit(&EmitOptions::default());
        let binding = "authorization_1 = r.json()['token']";
        let usage = "'Authorization': authorization_1";
        let bind_at = script.find(binding).expect("binding missing");
        let use_at = script.find(usage).expect("usage missing");
        assert!(bind_at < use_at);
        // The raw token appears nowhere as a header literal.
        assert!(!script.contains(&format!("'Authorization': '{TOKEN}'")));
    }

    #[test]
    fn test_assertions_flag() {
        let script = emit(&EmitOptions {
            assertions: true,
            ..EmitOptions::default()
        });
        assert!(script.contains("assert r.status_code == 200"));
        assert!(!emit(&EmitOptions::default()).contains("assert r.status_code"));
    }

    #[test]
    fn test_show_responses_flag() {
        let script = emit(&EmitOptions {
            show_responses: true,
            ..EmitOptions::default()
        });
        assert!(script.contains(&format!("# {{\"token\":\"{TOKEN}\"}}")));
    }

    #[test]
    fn test_form_body_rendered() {
        let script = emit(&EmitOptions::default());
        assert!(script.contains("data={'user': 'alice'},"));
        assert!(script.contains("r = session.post("));
        assert!(script.contains("r = session.get("));
    }

    #[test]
    fn test_py_str_escaping() {
        assert_eq!(py_str("plain"), "'plain'");
        assert_eq!(py_str("it's"), r"'it\'s'");
        assert_eq!(py_str("a\\b"), r"'a\\b'");
        assert_eq!(py_str("line\nbreak"), r"'line\nbreak'");
        assert_eq!(py_str("\x01"), r"'\x01'");
    }

    #[test]
    fn test_wrap_partial() {
        assert_eq!(
            wrap_partial("Bearer XYZ", "XYZ", "r.json()['t']").as_deref(),
            Some("'Bearer ' + r.json()['t']")
        );
        assert_eq!(
            wrap_partial("XYZ!", "XYZ", "expr").as_deref(),
            Some("expr + '!'")
        );
        assert_eq!(wrap_partial("no-overlap", "zzz", "expr"), None);
    }

    #[test]
    fn test_unique_name_generation() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("Authorization", &mut used), "authorization_1");
        assert_eq!(unique_name("Authorization", &mut used), "authorization_2");
        assert_eq!(unique_name("X-API-Key", &mut used), "x_api_key_1");
        assert_eq!(unique_name("123", &mut used), "value_123_1");
    }

    #[test]
    fn test_deterministic_output() {
        assert_eq!(emit(&EmitOptions::default()), emit(&EmitOptions::default()));
    }
}
