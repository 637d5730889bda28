use serde_json::Value;

/// Deep-merge `saved` into `base`.
///
/// Objects merge key by key. Anything else in `saved`, arrays included,
/// replaces what is in `base`.
pub fn merge(base: &mut Value, saved: Value) {
    match (base, saved) {
        (Value::Object(base), Value::Object(saved)) => {
            for (key, value) in saved {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, saved) => *base = saved,
    }
}
