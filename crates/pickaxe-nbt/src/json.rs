use crate::NbtValue;
use serde_json::Value;

/// Converts a parsed JSON value into an NBT compound/value tree, for data
/// files that carry pre-baked registry entries as JSON instead of binary
/// NBT. Numbers become `Int`/`Double` depending on whether they carry a
/// fractional component; there is no way to recover a narrower numeric
/// type (Byte/Short/Long/Float) from JSON alone, so callers that need one
/// (e.g. `has_precipitation` as a Byte) convert the relevant fields
/// explicitly rather than relying on this generic path.
pub fn json_to_nbt(value: &Value) -> NbtValue {
    match value {
        Value::Null => NbtValue::Byte(0),
        Value::Bool(b) => NbtValue::Byte(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                NbtValue::Int(i as i32)
            } else {
                NbtValue::Double(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => NbtValue::String(s.clone()),
        Value::Array(items) => NbtValue::List(items.iter().map(json_to_nbt).collect()),
        Value::Object(map) => {
            NbtValue::Compound(map.iter().map(|(k, v)| (k.clone(), json_to_nbt(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_becomes_compound() {
        let v: Value = serde_json::json!({"a": 1, "b": "x"});
        match json_to_nbt(&v) {
            NbtValue::Compound(entries) => assert_eq!(entries.len(), 2),
            _ => panic!("expected compound"),
        }
    }

    #[test]
    fn test_bool_becomes_byte() {
        assert_eq!(json_to_nbt(&Value::Bool(true)), NbtValue::Byte(1));
    }
}
