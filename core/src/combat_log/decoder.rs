use memchr::memchr;

const END_SENTINEL: &str = "end";
const END_SENTINEL_JSON: &str = r#",{"eventType":"end"}"#;

/// True for the two literal lines the game writes when it closes a log.
pub fn is_end_sentinel(line: &str) -> bool {
    let line = line.trim();
    line == END_SENTINEL || line == END_SENTINEL_JSON
}

/// Split one raw line into its ordered field values.
///
/// Lines containing `{` are the brace dialect: `,{"key":"value",...}`. Keys are
/// dropped and surrounding quotes are stripped from values. Every other line is
/// the pipe dialect, where a field written as `key=value` keeps only `value`.
pub fn decode_line(line: &str) -> Vec<&str> {
    if memchr(b'{', line.as_bytes()).is_some() {
        decode_braced(line)
    } else {
        decode_piped(line)
    }
}

fn decode_braced(line: &str) -> Vec<&str> {
    line.trim()
        .trim_matches(|c: char| matches!(c, '{' | '}' | ','))
        .split(',')
        .map(|token| {
            let value = match memchr(b':', token.as_bytes()) {
                Some(colon) => &token[colon + 1..],
                None => token,
            };
            value.trim().trim_matches('"')
        })
        .collect()
}

fn decode_piped(line: &str) -> Vec<&str> {
    line.trim_end_matches(|c: char| c == '\r' || c == '\n')
        .split('|')
        .map(|token| match memchr(b'=', token.as_bytes()) {
            Some(eq) => &token[eq + 1..],
            None => token,
        })
        .map(str::trim)
        .collect()
}
