//! Incremental `paths.*` parser for batch request bodies
//!
//! Batch bodies look like `{"paths": ["/a", "/b", ...]}` and can be of any
//! length. The parser is a byte-level state machine that is fed chunks as
//! they arrive and emits each path as soon as its closing quote is seen, so
//! work can start long before the body ends.
//!
//! It only understands one shape: a root object whose `paths` key is bound to
//! an array of strings. Values of other keys are scanned with the same
//! structural checks (keys, colons, commas, balanced brackets, string escapes
//! and literals) but nothing inside them is emitted. Anything malformed fails
//! fast with a [`ParseError`].
//!
//! String escapes are not decoded here. The raw bytes between the quotes are
//! collected and handed to `serde_json` once the string closes.

use crate::error::ParseError;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;

/// A single path extracted from the `paths` array
pub type PathToken = String;

/// The key whose array elements are emitted
const PATHS_KEY: &str = "paths";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the root `{`
    RootStart,
    /// Just after `{`: a key or `}`
    ObjectStart,
    /// After `,` in the root object: a key
    KeyStart,
    /// Inside a key string
    Key,
    /// After a key: `:`
    Colon,
    /// After `:`: the value
    Value,
    /// Inside a skipped string value
    SkipString,
    /// Inside a key of a skipped object
    SkipKeyString,
    /// Inside a skipped bare literal
    SkipLiteral,
    /// Just after `{` of a skipped object: a key or `}`
    SkipObjectStart,
    /// After `,` in a skipped object: a key
    SkipKeyStart,
    /// After a key in a skipped object: `:`
    SkipColon,
    /// Just after `[` of a skipped array: a value or `]`
    SkipArrayStart,
    /// A value inside a skipped container
    SkipValue,
    /// After a value inside a skipped container: `,` or its closer
    SkipAfter,
    /// Just after `[` of `paths`: a string or `]`
    ArrayStart,
    /// After `,` in `paths`: a string
    ElementStart,
    /// Inside a path string
    Element,
    /// After a path string: `,` or `]`
    AfterElement,
    /// After any value in the root object: `,` or `}`
    AfterValue,
    /// Root object closed
    Done,
}

impl State {
    fn expected(&self) -> &'static str {
        match self {
            State::RootStart => "'{'",
            State::ObjectStart | State::SkipObjectStart => "'\"' or '}'",
            State::KeyStart | State::SkipKeyStart => "'\"'",
            State::Key | State::Element | State::SkipString | State::SkipKeyString => "closing '\"'",
            State::Colon | State::SkipColon => "':'",
            State::Value | State::SkipValue => "a value",
            State::SkipLiteral => "end of literal",
            State::SkipArrayStart => "a value or ']'",
            State::SkipAfter => "',' or closing bracket",
            State::ArrayStart => "'\"' or ']'",
            State::ElementStart => "'\"'",
            State::AfterElement => "',' or ']'",
            State::AfterValue => "',' or '}'",
            State::Done => "end of body",
        }
    }
}

/// Open container inside a skipped value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

enum Step {
    Consumed,
    Reprocess,
}

/// Push parser for `{"paths": [...]}` bodies
#[derive(Debug)]
pub struct PathStreamParser {
    state: State,
    offset: u64,
    /// Raw bytes of the string or literal being scanned
    buf: Vec<u8>,
    escaped: bool,
    key_is_paths: bool,
    /// Containers opened inside the value being skipped
    nest: Vec<Container>,
    failed: Option<ParseError>,
}

impl Default for PathStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PathStreamParser {
    /// Create a parser positioned before the root object
    pub fn new() -> Self {
        Self {
            state: State::RootStart,
            offset: 0,
            buf: Vec::new(),
            escaped: false,
            key_is_paths: false,
            nest: Vec::new(),
            failed: None,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True once the root object has closed
    pub fn is_complete(&self) -> bool {
        self.state == State::Done
    }

    /// Feed the next chunk, appending every completed path to `out`
    ///
    /// Paths completed before an error in the same chunk are still appended.
    /// After an error the parser stays failed.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<PathToken>) -> Result<(), ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let mut i = 0;
        while i < chunk.len() {
            match self.step(chunk[i], out) {
                Ok(Step::Consumed) => {
                    i += 1;
                    self.offset += 1;
                }
                Ok(Step::Reprocess) => {}
                Err(err) => {
                    self.failed = Some(err.clone());
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Signal end of body
    pub fn finish(&mut self) -> Result<(), ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        if self.state == State::Done {
            return Ok(());
        }

        let err = ParseError::UnexpectedEof {
            expected: self.state.expected(),
        };
        self.failed = Some(err.clone());
        Err(err)
    }

    fn step(&mut self, byte: u8, out: &mut VecDeque<PathToken>) -> Result<Step, ParseError> {
        match self.state {
            State::Key | State::Element | State::SkipString | State::SkipKeyString => {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.close_string(out)?;
                    return Ok(Step::Consumed);
                }
                self.buf.push(byte);
                return Ok(Step::Consumed);
            }
            State::SkipLiteral => {
                if is_literal_byte(byte) {
                    self.buf.push(byte);
                    return Ok(Step::Consumed);
                }
                self.check_literal()?;
                self.end_skipped_value();
                return Ok(Step::Reprocess);
            }
            _ => {}
        }

        if is_whitespace(byte) {
            return Ok(Step::Consumed);
        }

        match (self.state, byte) {
            (State::RootStart, b'{') => self.state = State::ObjectStart,
            (State::ObjectStart, b'}') => self.state = State::Done,
            (State::ObjectStart | State::KeyStart, b'"') => self.begin_string(State::Key),
            (State::Colon, b':') => self.state = State::Value,
            (State::Value, _) if self.key_is_paths => {
                if byte != b'[' {
                    return Err(ParseError::PathsNotArray { offset: self.offset });
                }
                self.state = State::ArrayStart;
            }
            (State::Value | State::SkipValue, _) => self.begin_skipped_value(byte)?,
            (State::SkipObjectStart, b'}') => self.close_container(byte)?,
            (State::SkipObjectStart | State::SkipKeyStart, b'"') => {
                self.begin_string(State::SkipKeyString)
            }
            (State::SkipColon, b':') => self.state = State::SkipValue,
            (State::SkipArrayStart, b']') => self.close_container(byte)?,
            (State::SkipArrayStart, _) => self.begin_skipped_value(byte)?,
            (State::SkipAfter, b',') => {
                self.state = match self.nest.last() {
                    Some(Container::Object) => State::SkipKeyStart,
                    _ => State::SkipValue,
                };
            }
            (State::SkipAfter, b'}' | b']') => self.close_container(byte)?,
            (State::ArrayStart, b']') => self.state = State::AfterValue,
            (State::ArrayStart | State::ElementStart, b'"') => self.begin_string(State::Element),
            (State::ArrayStart | State::ElementStart, _) if is_value_start(byte) => {
                return Err(ParseError::NonStringPath { offset: self.offset });
            }
            (State::AfterElement, b',') => self.state = State::ElementStart,
            (State::AfterElement, b']') => self.state = State::AfterValue,
            (State::AfterValue, b',') => self.state = State::KeyStart,
            (State::AfterValue, b'}') => self.state = State::Done,
            (State::Done, _) => return Err(ParseError::TrailingData { offset: self.offset }),
            (state, _) => return Err(self.unexpected(byte, state)),
        }

        Ok(Step::Consumed)
    }

    fn unexpected(&self, byte: u8, state: State) -> ParseError {
        ParseError::UnexpectedByte {
            byte,
            offset: self.offset,
            expected: state.expected(),
        }
    }

    fn begin_string(&mut self, state: State) {
        self.buf.clear();
        self.escaped = false;
        self.state = state;
    }

    /// Start a value that is validated but not emitted
    fn begin_skipped_value(&mut self, byte: u8) -> Result<(), ParseError> {
        match byte {
            b'"' => self.begin_string(State::SkipString),
            b'{' => {
                self.nest.push(Container::Object);
                self.state = State::SkipObjectStart;
            }
            b'[' => {
                self.nest.push(Container::Array);
                self.state = State::SkipArrayStart;
            }
            _ if is_literal_start(byte) => {
                self.buf.clear();
                self.buf.push(byte);
                self.state = State::SkipLiteral;
            }
            _ => return Err(self.unexpected(byte, self.state)),
        }
        Ok(())
    }

    fn close_container(&mut self, closer: u8) -> Result<(), ParseError> {
        let expected = match self.nest.last() {
            Some(Container::Object) => b'}',
            Some(Container::Array) => b']',
            None => return Err(ParseError::Unbalanced { offset: self.offset }),
        };
        if closer != expected {
            return Err(ParseError::Unbalanced { offset: self.offset });
        }

        self.nest.pop();
        self.end_skipped_value();
        Ok(())
    }

    fn end_skipped_value(&mut self) {
        self.state = if self.nest.is_empty() {
            State::AfterValue
        } else {
            State::SkipAfter
        };
    }

    fn close_string(&mut self, out: &mut VecDeque<PathToken>) -> Result<(), ParseError> {
        let value = decode_string(&self.buf, self.offset)?;
        self.buf.clear();

        match self.state {
            State::Key => {
                self.key_is_paths = value == PATHS_KEY;
                self.state = State::Colon;
            }
            State::Element => {
                out.push_back(value);
                self.state = State::AfterElement;
            }
            State::SkipKeyString => self.state = State::SkipColon,
            _ => self.end_skipped_value(),
        }

        Ok(())
    }

    fn check_literal(&mut self) -> Result<(), ParseError> {
        let valid = serde_json::from_slice::<serde_json::Value>(&self.buf)
            .map(|v| !v.is_string() && !v.is_array() && !v.is_object())
            .unwrap_or(false);

        if !valid {
            return Err(ParseError::InvalidLiteral {
                literal: String::from_utf8_lossy(&self.buf).into_owned(),
                offset: self.offset,
            });
        }

        self.buf.clear();
        Ok(())
    }
}

fn decode_string(raw: &[u8], offset: u64) -> Result<String, ParseError> {
    let mut quoted = Vec::with_capacity(raw.len() + 2);
    quoted.push(b'"');
    quoted.extend_from_slice(raw);
    quoted.push(b'"');

    serde_json::from_slice::<String>(&quoted).map_err(|e| ParseError::InvalidString {
        offset,
        reason: e.to_string(),
    })
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_literal_start(byte: u8) -> bool {
    matches!(byte, b'-' | b'0'..=b'9' | b't' | b'f' | b'n')
}

fn is_literal_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'+' | b'.')
}

fn is_value_start(byte: u8) -> bool {
    is_literal_start(byte) || matches!(byte, b'{' | b'[')
}

struct StreamState<S> {
    body: std::pin::Pin<Box<S>>,
    parser: PathStreamParser,
    pending: VecDeque<PathToken>,
    error: Option<ParseError>,
    done: bool,
}

/// Adapt a body chunk stream into a lazy stream of paths
///
/// Each path is yielded as soon as it is parsed. A parse failure, a body
/// failure, or an unterminated document is yielded once as `Err` after any
/// paths that preceded it, and ends the stream.
pub fn path_stream<S, B, E>(body: S) -> impl Stream<Item = Result<PathToken, ParseError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = StreamState {
        body: Box::pin(body),
        parser: PathStreamParser::new(),
        pending: VecDeque::new(),
        error: None,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(path) = st.pending.pop_front() {
                return Some((Ok(path), st));
            }
            if let Some(err) = st.error.take() {
                st.done = true;
                return Some((Err(err), st));
            }
            if st.done {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    if let Err(err) = st.parser.feed(chunk.as_ref(), &mut st.pending) {
                        st.error = Some(err);
                    }
                }
                Some(Err(err)) => st.error = Some(ParseError::Body(err.to_string())),
                None => {
                    st.done = true;
                    if let Err(err) = st.parser.finish() {
                        st.error = Some(err);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn parse_all(body: &[u8]) -> Result<Vec<String>, ParseError> {
        let mut parser = PathStreamParser::new();
        let mut out = VecDeque::new();
        parser.feed(body, &mut out)?;
        parser.finish()?;
        Ok(out.into_iter().collect())
    }

    fn parse_split(body: &[u8], at: usize) -> Result<Vec<String>, ParseError> {
        let mut parser = PathStreamParser::new();
        let mut out = VecDeque::new();
        parser.feed(&body[..at], &mut out)?;
        parser.feed(&body[at..], &mut out)?;
        parser.finish()?;
        Ok(out.into_iter().collect())
    }

    #[test]
    fn test_simple_paths() {
        let paths = parse_all(br#"{"paths": ["/tmp/a", "/tmp/b"]}"#).unwrap();
        assert_eq!(paths, vec!["/tmp/a", "/tmp/b"]);
    }

    #[test]
    fn test_empty_array_and_object() {
        assert!(parse_all(br#"{"paths": []}"#).unwrap().is_empty());
        assert!(parse_all(b"{}").unwrap().is_empty());
        assert!(parse_all(b"  {\n}\n").unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let paths = parse_all(br#"{"paths":["/a","/a","/a"]}"#).unwrap();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_escapes_are_decoded() {
        let paths = parse_all(r#"{"paths":["/a\"b","/c\\d","/é","/😀"]}"#.as_bytes()).unwrap();
        assert_eq!(paths, vec!["/a\"b", "/c\\d", "/\u{e9}", "/\u{1F600}"]);
    }

    #[test]
    fn test_other_keys_are_skipped() {
        let body = br#"{"before": {"x": [1, "]", {"y": null}]}, "n": -1.5e3, "s": "}", "paths": ["/p"], "after": true}"#;
        assert_eq!(parse_all(body).unwrap(), vec!["/p"]);
    }

    #[test]
    fn test_escaped_key_named_paths() {
        let paths = parse_all(br#"{"pa\u0074hs": ["/x"]}"#).unwrap();
        assert_eq!(paths, vec!["/x"]);
    }

    #[test]
    fn test_every_split_point_gives_same_tokens() {
        let body = r#"{"meta": {"k": "v\"}"}, "paths": ["/tmp/é", "/a\\b", "/ü\n"]}"#.as_bytes();
        let expected = parse_all(body).unwrap();
        assert_eq!(expected.len(), 3);

        for at in 0..=body.len() {
            assert_eq!(parse_split(body, at).unwrap(), expected, "split at {}", at);
        }
    }

    #[test]
    fn test_emits_before_body_ends() {
        let mut parser = PathStreamParser::new();
        let mut out = VecDeque::new();

        parser.feed(br#"{"paths": ["/first", "/sec"#, &mut out).unwrap();
        assert_eq!(out.pop_front().as_deref(), Some("/first"));
        assert!(out.is_empty());

        parser.feed(br#"ond"]}"#, &mut out).unwrap();
        assert_eq!(out.pop_front().as_deref(), Some("/second"));
        parser.finish().unwrap();
        assert!(parser.is_complete());
    }

    #[test]
    fn test_paths_not_array() {
        let err = parse_all(br#"{"paths": "/tmp/a"}"#).unwrap_err();
        assert!(matches!(err, ParseError::PathsNotArray { offset: 10 }));

        let err = parse_all(br#"{"paths": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, ParseError::PathsNotArray { .. }));
    }

    #[test]
    fn test_non_string_element() {
        let err = parse_all(br#"{"paths": ["/a", 42]}"#).unwrap_err();
        assert!(matches!(err, ParseError::NonStringPath { .. }));

        let err = parse_all(br#"{"paths": [null]}"#).unwrap_err();
        assert!(matches!(err, ParseError::NonStringPath { .. }));
    }

    #[test]
    fn test_malformed_structure() {
        assert!(matches!(
            parse_all(b"not json").unwrap_err(),
            ParseError::UnexpectedByte { byte: b'n', offset: 0, .. }
        ));
        assert!(matches!(
            parse_all(br#"["/a"]"#).unwrap_err(),
            ParseError::UnexpectedByte { .. }
        ));
        assert!(matches!(
            parse_all(br#"{"paths": ["/a",]}"#).unwrap_err(),
            ParseError::UnexpectedByte { .. }
        ));
        assert!(matches!(
            parse_all(br#"{"x": [1, 2}, "paths": []}"#).unwrap_err(),
            ParseError::Unbalanced { .. }
        ));
        assert!(matches!(
            parse_all(br#"{"x": nope}"#).unwrap_err(),
            ParseError::InvalidLiteral { .. }
        ));
        assert!(matches!(
            parse_all(br#"{"paths": []} {}"#).unwrap_err(),
            ParseError::TrailingData { .. }
        ));
    }

    #[test]
    fn test_skipped_values_are_validated() {
        assert!(matches!(
            parse_all(br#"{"x": [nope], "paths": ["/a"]}"#).unwrap_err(),
            ParseError::InvalidLiteral { .. }
        ));
        assert!(matches!(
            parse_all(br#"{"x": {"a" 1 2}, "paths": ["/a"]}"#).unwrap_err(),
            ParseError::UnexpectedByte { byte: b'1', .. }
        ));
        assert!(matches!(
            parse_all(br#"{"x": ["\q"], "paths": ["/a"]}"#).unwrap_err(),
            ParseError::InvalidString { .. }
        ));
        assert!(matches!(
            parse_all(b"{\"x\": [\"\xff\"], \"paths\": [\"/a\"]}").unwrap_err(),
            ParseError::InvalidString { .. }
        ));
    }

    #[test]
    fn test_skipped_container_structure() {
        let cases: [&[u8]; 8] = [
            br#"{"x": {1: 2}, "paths": []}"#,
            br#"{"x": {"a": 1,}, "paths": []}"#,
            br#"{"x": [1,, 2], "paths": []}"#,
            br#"{"x": [1 2], "paths": []}"#,
            br#"{"x": {"a": }, "paths": []}"#,
            br#"{"x": {"a": 1 "b": 2}, "paths": []}"#,
            br#"{"x": [,], "paths": []}"#,
            br#"{"x": {"a"}, "paths": []}"#,
        ];

        for body in cases {
            let result = parse_all(body);
            assert!(result.is_err(), "{}: {:?}", String::from_utf8_lossy(body), result);
        }

        assert!(matches!(
            parse_all(br#"{"x": {"a": [1}], "paths": []}"#).unwrap_err(),
            ParseError::Unbalanced { .. }
        ));
    }

    #[test]
    fn test_nested_skipped_values_accepted() {
        let body = br#"{"x": {"a": [], "b": {}, "c": [[1, -2.5e-3], {"d": [true, false, null]}], "e\n": "\u00e9"}, "paths": ["/ok"]}"#;
        assert_eq!(parse_all(body).unwrap(), vec!["/ok"]);
    }

    #[test]
    fn test_invalid_strings() {
        assert!(matches!(
            parse_all(br#"{"paths": ["/a\q"]}"#).unwrap_err(),
            ParseError::InvalidString { .. }
        ));
        assert!(matches!(
            parse_all(b"{\"paths\": [\"/a\xff\"]}").unwrap_err(),
            ParseError::InvalidString { .. }
        ));
        assert!(matches!(
            parse_all(b"{\"paths\": [\"/a\tb\"]}").unwrap_err(),
            ParseError::InvalidString { .. }
        ));
    }

    #[test]
    fn test_unterminated_body() {
        let err = parse_all(br#"{"paths": ["/a", "/b""#).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = parse_all(br#"{"paths": ["/a"]"#).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { expected: "',' or '}'" }));

        let err = parse_all(b"").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { expected: "'{'" }));
    }

    #[test]
    fn test_parser_stays_failed() {
        let mut parser = PathStreamParser::new();
        let mut out = VecDeque::new();
        assert!(parser.feed(b"[", &mut out).is_err());
        assert!(parser.feed(b"{}", &mut out).is_err());
        assert!(parser.finish().is_err());
    }

    #[test]
    fn test_tokens_before_error_are_kept() {
        let mut parser = PathStreamParser::new();
        let mut out = VecDeque::new();
        let result = parser.feed(br#"{"paths": ["/ok", 7]}"#, &mut out);
        assert!(result.is_err());
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_path_stream_adapter() {
        let chunks: Vec<Result<&'static [u8], Infallible>> = vec![
            Ok(&br#"{"pa"#[..]),
            Ok(&br#"ths": ["/one","#[..]),
            Ok(&br#" "/two"]}"#[..]),
        ];
        let paths: Vec<_> = path_stream(stream::iter(chunks)).collect().await;

        assert_eq!(paths, vec![Ok("/one".to_string()), Ok("/two".to_string())]);
    }

    #[tokio::test]
    async fn test_path_stream_reports_error_last() {
        let chunks: Vec<Result<&'static [u8], Infallible>> = vec![Ok(&br#"{"paths": ["/one", "/tw"#[..])];
        let items: Vec<_> = path_stream(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("/one".to_string()));
        assert!(matches!(items[1], Err(ParseError::UnexpectedEof { .. })));
    }

    #[tokio::test]
    async fn test_path_stream_body_failure() {
        let chunks: Vec<Result<&'static [u8], String>> =
            vec![Ok(&br#"{"paths": ["/one","#[..]), Err("connection reset".to_string())];
        let items: Vec<_> = path_stream(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(ParseError::Body("connection reset".to_string())));
    }
}
