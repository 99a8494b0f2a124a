use kiss_httpd::http::classify::{classify, Classification, ROOT_PATH_OFFSET};

#[test]
fn test_get_root_is_valid() {
    assert_eq!(classify(b"GET / HTTP/1.1\r\n"), Classification::Valid);
    assert_eq!(
        classify(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"),
        Classification::Valid
    );
}

#[test]
fn test_non_root_path_is_invalid() {
    assert_eq!(classify(b"POST /x HTTP/1.1\r\n"), Classification::Invalid);
    assert_eq!(classify(b"GET /index.html HTTP/1.1\r\n"), Classification::Invalid);
}

#[test]
fn test_other_method_lengths_are_invalid() {
    // The marker has to sit right after a three-letter method.
    assert_eq!(classify(b"POST / HTTP/1.1\r\n"), Classification::Invalid);
    assert_eq!(classify(b"HEAD / HTTP/1.1\r\n"), Classification::Invalid);
    assert_eq!(classify(b"DELETE / HTTP/1.1\r\n"), Classification::Invalid);
}

#[test]
fn test_method_is_not_checked() {
    assert_eq!(classify(b"PUT / HTTP/1.1\r\n"), Classification::Valid);
    assert_eq!(classify(b"xyz / "), Classification::Valid);
    assert_eq!(classify(b"\0\0\0\0/ \0"), Classification::Valid);
}

#[test]
fn test_short_input_is_invalid() {
    assert_eq!(classify(b""), Classification::Invalid);
    assert_eq!(classify(b"GET"), Classification::Invalid);
    assert_eq!(classify(b"GET /"), Classification::Invalid);
}

#[test]
fn test_every_prefix_of_a_valid_request() {
    let req = b"GET / HTTP/1.1\r\n";
    for len in 0..=req.len() {
        let expected = if len >= ROOT_PATH_OFFSET + 2 {
            Classification::Valid
        } else {
            Classification::Invalid
        };
        assert_eq!(classify(&req[..len]), expected, "prefix length {len}");
    }
}

#[test]
fn test_slash_without_space_is_invalid() {
    assert_eq!(classify(b"GET /\r\n"), Classification::Invalid);
    assert_eq!(classify(b"GET //  "), Classification::Invalid);
    assert_eq!(classify(b"GET  / "), Classification::Invalid);
}
