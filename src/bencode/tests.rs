use super::*;

#[test]
fn test_decode_scalars() {
    assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
    assert_eq!(decode(b"i-7e").unwrap().as_integer(), Some(-7));
    assert_eq!(decode(b"4:spam").unwrap().as_str(), Some("spam"));
    assert_eq!(decode(b"0:").unwrap().as_str(), Some(""));
}

#[test]
fn test_decode_nested() {
    let value = decode(b"d4:listli1ei2ee4:name3:fooe").unwrap();
    assert_eq!(value.get(b"name").and_then(|v| v.as_str()), Some("foo"));
    assert_eq!(value.get(b"list").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
    assert!(value.get(b"missing").is_none());
}

#[test]
fn test_accessors_reject_wrong_type() {
    let value = decode(b"d13:downloadSpeed4:faste").unwrap();
    let speed = value.get(b"downloadSpeed").unwrap();
    assert_eq!(speed.as_integer(), None);
    assert_eq!(speed.as_str(), Some("fast"));
    assert!(Value::Integer(3).get(b"x").is_none());
}

#[test]
fn test_invalid_integers() {
    assert!(matches!(decode(b"i03e"), Err(BencodeError::InvalidInteger(_))));
    assert!(matches!(decode(b"i-0e"), Err(BencodeError::InvalidInteger(_))));
    assert!(matches!(decode(b"ie"), Err(BencodeError::InvalidInteger(_))));
    assert!(matches!(decode(b"i12"), Err(BencodeError::UnexpectedEof)));
}

#[test]
fn test_truncated_and_trailing() {
    assert_eq!(decode(b"5:abc"), Err(BencodeError::UnexpectedEof));
    assert_eq!(decode(b"li1e"), Err(BencodeError::UnexpectedEof));
    assert_eq!(decode(b"i1ei2e"), Err(BencodeError::TrailingData));
    assert_eq!(decode(b""), Err(BencodeError::UnexpectedEof));
    assert_eq!(decode(b"x"), Err(BencodeError::UnexpectedChar('x', 0)));
}

#[test]
fn test_non_string_key() {
    assert_eq!(decode(b"di1ei2ee"), Err(BencodeError::NonStringKey));
}

#[test]
fn test_nesting_limit() {
    let mut data = vec![b'l'; 100];
    data.extend(vec![b'e'; 100]);
    assert_eq!(decode(&data), Err(BencodeError::NestingTooDeep));
}
