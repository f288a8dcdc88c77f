#![no_main]

use ferrous_locator::PropertyRegistry;
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

// Every saved value comes back as exactly one of i64, f64 or String.
fuzz_target!(|data: &str| {
    let registry = PropertyRegistry::new();
    let props = HashMap::from([("key".to_string(), data.to_string())]);
    registry.save_properties(&props);

    let as_int = registry.get_opt::<i64>("key").is_some();
    let as_float = registry.get_opt::<f64>("key").is_some();
    let as_string = registry.get_opt::<String>("key").is_some();
    assert_eq!([as_int, as_float, as_string].iter().filter(|b| **b).count(), 1);

    if let Ok(value) = data.trim().parse::<i64>() {
        assert_eq!(registry.get_opt::<i64>("key"), Some(value));
    }
});
