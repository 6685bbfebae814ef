use serde_json::json;

use crate::convert::is_false_str;
use crate::convert::to_bool;
use crate::convert::to_bytes;
use crate::convert::to_float;
use crate::convert::to_int;
use crate::convert::to_string;
use crate::convert::to_uint;

#[test]
fn test_is_false_str() {
    for s in ["", "0", "false", "f", "off", "FALSE", "Off", "F"] {
        assert!(is_false_str(s), "{s:?} should be false");
    }
    for s in ["1", "true", "yes", "no", "on", "abc", " false ", "off ", " "] {
        assert!(!is_false_str(s), "{s:?} should be true");
    }
}

#[test]
fn test_to_string() {
    assert_eq!(to_string(&json!(null)), "");
    assert_eq!(to_string(&json!("v")), "v");
    assert_eq!(to_string(&json!(3)), "3");
    assert_eq!(to_string(&json!(1.5)), "1.5");
    assert_eq!(to_string(&json!(true)), "true");
    assert_eq!(to_string(&json!({"a": 1})), r#"{"a":1}"#);
    assert_eq!(to_string(&json!([1, 2])), "[1,2]");
    assert_eq!(to_bytes(&json!("v")), b"v".to_vec());
}

#[test]
fn test_to_bool() {
    assert!(to_bool(&json!(true)));
    assert!(!to_bool(&json!(false)));
    assert!(!to_bool(&json!(null)));
    assert!(!to_bool(&json!(0)));
    assert!(to_bool(&json!(2)));
    assert!(!to_bool(&json!("off")));
    // Present but unparseable counts as true
    assert!(to_bool(&json!("maybe")));
    assert!(to_bool(&json!({"a": 1})));
}

#[test]
fn test_to_int() {
    assert_eq!(to_int(&json!(42)), 42);
    assert_eq!(to_int(&json!(-7)), -7);
    assert_eq!(to_int(&json!(3.9)), 3);
    assert_eq!(to_int(&json!("12")), 12);
    assert_eq!(to_int(&json!(" 12 ")), 12);
    assert_eq!(to_int(&json!("-2.5")), -2);
    assert_eq!(to_int(&json!(true)), 1);
    assert_eq!(to_int(&json!(false)), 0);
    assert_eq!(to_int(&json!("abc")), 0);
    assert_eq!(to_int(&json!(null)), 0);
    assert_eq!(to_int(&json!([1])), 0);
    assert_eq!(to_int(&json!(u64::MAX)), i64::MAX);
}

#[test]
fn test_to_uint() {
    assert_eq!(to_uint(&json!(42)), 42);
    assert_eq!(to_uint(&json!(u64::MAX)), u64::MAX);
    assert_eq!(to_uint(&json!(-7)), 0);
    assert_eq!(to_uint(&json!("-7")), 0);
    assert_eq!(to_uint(&json!(3.9)), 3);
    assert_eq!(to_uint(&json!("8")), 8);
    assert_eq!(to_uint(&json!(true)), 1);
    assert_eq!(to_uint(&json!("x")), 0);
}

#[test]
fn test_to_float() {
    assert_eq!(to_float(&json!(1.5)), 1.5);
    assert_eq!(to_float(&json!(2)), 2.0);
    assert_eq!(to_float(&json!("0.25")), 0.25);
    assert_eq!(to_float(&json!(true)), 1.0);
    assert_eq!(to_float(&json!("nope")), 0.0);
    assert_eq!(to_float(&json!(null)), 0.0);
}
