#![no_main]

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use covenant::collection::{distinct, minus, union};
use covenant::{compare, json, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let Ok(input) = std::str::from_utf8(data) else {
            return;
        };
        let Ok(Value::Coll(items)) = json::parse_str(input) else {
            return;
        };
        let items = items.to_vec();
        for a in &items {
            for b in &items {
                assert_eq!(compare(a, b), compare(b, a).reverse());
                for c in &items {
                    if compare(a, b) != Ordering::Greater && compare(b, c) != Ordering::Greater {
                        assert_ne!(compare(a, c), Ordering::Greater);
                    }
                }
            }
        }
        let all = Value::coll(items);
        let doubled = union(&all, &all).expect("union");
        assert_eq!(distinct(&doubled).expect("distinct"), distinct(&all).expect("distinct"));
        assert_eq!(minus(&doubled, &all).expect("minus"), all);
    }));

    if let Err(panic) = result {
        record_panic("compare_laws", data);
        std::panic::resume_unwind(panic);
    }
});

fn record_panic(target: &str, data: &[u8]) {
    let hash = fnv1a64(data);
    let dir = Path::new("fuzz").join("artifacts").join(target);
    if let Err(err) = fs::create_dir_all(&dir) {
        eprintln!("fuzz panic capture failed: target={} err={}", target, err);
        return;
    }
    let path = dir.join(format!("panic_{:016x}.json", hash));
    if let Err(err) = fs::write(&path, data) {
        eprintln!(
            "fuzz panic capture failed: target={} path={} err={}",
            target,
            path.display(),
            err
        );
        return;
    }
    eprintln!(
        "fuzz panic captured: target={} path={} len={}",
        target,
        path.display(),
        data.len()
    );
}

fn fnv1a64(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
