use serde_json::Value;

/// Build the MAC input: `timestamp:nonce:body`
pub fn canonical_string(timestamp: &str, nonce: &str, canonical_body: &str) -> String {
    let mut out = String::with_capacity(timestamp.len() + nonce.len() + canonical_body.len() + 2);
    out.push_str(timestamp);
    out.push(':');
    out.push_str(nonce);
    out.push(':');
    out.push_str(canonical_body);
    out
}

/// Serialize JSON in canonical form.
///
/// Object keys are sorted by byte order at every depth, there is no
/// whitespace, arrays keep their order. The output does not depend on how the
/// value was built or which map implementation serde_json was compiled with.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json escaping is fixed: RFC 8259 minimal escapes
    out.push_str(&Value::String(s.to_owned()).to_string());
}
