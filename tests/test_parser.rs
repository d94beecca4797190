mod common;

use common::Fragmented;
use warden::http::parser::{read_message, read_request, read_response, DecodeError, MAX_HEAD_BYTES};
use warden::http::request::Method;

#[tokio::test]
async fn test_parse_simple_get_request() {
    let mut input = Fragmented::new([&b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]]);
    let parsed = read_request(&mut input).await.unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("Host"), Some("example.com"));
    assert!(parsed.body.is_empty());
}

#[tokio::test]
async fn test_header_names_are_lower_cased_and_last_wins() {
    let raw = b"GET / HTTP/1.1\r\nX-Token: first\r\nx-token: second\r\nAccept: */*\r\n\r\n";
    let parsed = read_request(&mut Fragmented::new([&raw[..]])).await.unwrap();

    let names: Vec<_> = parsed.headers.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["x-token", "accept"]);
    assert_eq!(parsed.header("X-TOKEN"), Some("second"));
}

#[tokio::test]
async fn test_malformed_header_lines_are_skipped() {
    let raw = b"GET / HTTP/1.1\r\nBrokenHeader\r\nNoSpace:value\r\nHost: a\r\n\r\n";
    let parsed = read_request(&mut Fragmented::new([&raw[..]])).await.unwrap();

    assert_eq!(parsed.headers.len(), 1);
    assert_eq!(parsed.header("host"), Some("a"));
}

#[tokio::test]
async fn test_body_split_across_fragments_including_delimiter() {
    let body: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut raw = format!("POST /upload HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    let head_len = raw.len();
    raw.extend_from_slice(&body);

    // Cut inside the delimiter, then at odd places through the body
    let cuts = [3, head_len - 3, head_len - 1, head_len + 1, head_len + 17, head_len + 600];
    let parsed = read_request(&mut Fragmented::split_at(&raw, &cuts)).await.unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.body, body);
}

#[tokio::test]
async fn test_one_byte_fragments() {
    let raw = b"PUT /a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
    let mut input = Fragmented::new(raw.iter().map(|b| vec![*b]));
    let parsed = read_request(&mut input).await.unwrap();

    assert_eq!(parsed.body, b"hello".to_vec());
}

#[tokio::test]
async fn test_surplus_bytes_are_dropped() {
    let raw = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloGET /next HTTP/1.1\r\n\r\n";
    let mut input = Fragmented::new([&raw[..]]);

    let parsed = read_request(&mut input).await.unwrap();
    assert_eq!(parsed.body, b"hello".to_vec());

    // The surplus went with the first message's buffer
    let next = read_request(&mut input).await;
    assert!(matches!(next, Err(DecodeError::EndOfStream)));
}

#[tokio::test]
async fn test_missing_or_invalid_content_length_means_empty_body() {
    for header in ["", "Content-Length: abc\r\n", "Content-Length: -3\r\n"] {
        let raw = format!("POST / HTTP/1.1\r\n{}\r\ntrailing", header);
        let parsed = read_request(&mut Fragmented::new([raw.as_bytes()])).await.unwrap();
        assert!(parsed.body.is_empty(), "header {:?}", header);
    }
}

#[tokio::test]
async fn test_stream_closing_before_delimiter_is_end_of_stream() {
    let mut input = Fragmented::new([&b"GET / HTTP/1.1\r\nHost: example.com\r\n"[..]]);
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(DecodeError::EndOfStream)));
}

#[tokio::test]
async fn test_stream_closing_mid_body_is_end_of_stream() {
    let mut input = Fragmented::new([&b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello"[..]]);
    let result = read_request(&mut input).await;

    assert!(matches!(result, Err(DecodeError::EndOfStream)));
}

#[tokio::test]
async fn test_request_line_needs_three_fields() {
    for line in ["GET /", "GET / HTTP/1.1 extra", ""] {
        let raw = format!("{}\r\nHost: a\r\n\r\n", line);
        let result = read_request(&mut Fragmented::new([raw.as_bytes()])).await;
        assert!(
            matches!(result, Err(DecodeError::Malformed(_))),
            "line {:?}",
            line
        );
    }
}

#[tokio::test]
async fn test_unknown_method_is_still_framed() {
    let raw = b"BREW /pot HTTP/1.1\r\n\r\n";
    let parsed = read_request(&mut Fragmented::new([&raw[..]])).await.unwrap();

    assert_eq!(parsed.method, Method::Extension("BREW".to_string()));
}

#[tokio::test]
async fn test_oversized_head_is_rejected() {
    let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
    while raw.len() <= MAX_HEAD_BYTES + 1024 {
        raw.extend_from_slice(b"X-Filler: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n");
    }
    let result = read_message(&mut Fragmented::split_at(&raw, &[1000, 40_000])).await;

    assert!(matches!(result, Err(DecodeError::HeadTooLarge)));
}

#[tokio::test]
async fn test_parse_response_with_multi_word_reason() {
    let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\nContent-Type: text/html\r\n\r\nnope";
    let parsed = read_response(&mut Fragmented::new([&raw[..]])).await.unwrap();

    assert_eq!(parsed.status.as_u16(), 404);
    assert_eq!(parsed.header("content-type"), Some("text/html"));
    assert_eq!(parsed.body, b"nope".to_vec());
}

#[tokio::test]
async fn test_response_with_non_numeric_status_is_malformed() {
    let raw = b"HTTP/1.1 abc Broken\r\n\r\n";
    let result = read_response(&mut Fragmented::new([&raw[..]])).await;

    assert!(matches!(result, Err(DecodeError::Malformed(_))));
}
