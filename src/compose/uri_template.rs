//! Minimal RFC 6570 matching used to route resource reads to template owners.

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    /// `{var}`: one or more characters, never `/`.
    Simple,
    /// `{+var}` or `{var*}`: one or more characters, `/` included.
    Reserved,
}

fn parse(template: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;
    while !rest.is_empty() {
        match rest.find('{') {
            Some(0) => {
                let close = rest.find('}')?;
                let expression = &rest[1..close];
                if expression.is_empty() {
                    return None;
                }
                if expression.starts_with('+') || expression.ends_with('*') {
                    segments.push(Segment::Reserved);
                } else {
                    segments.push(Segment::Simple);
                }
                rest = &rest[close + 1..];
            }
            Some(open) => {
                segments.push(Segment::Literal(&rest[..open]));
                rest = &rest[open..];
            }
            None => {
                segments.push(Segment::Literal(rest));
                rest = "";
            }
        }
    }
    Some(segments)
}

/// Returns true when `uri` is an expansion of `template`.
pub fn matches(template: &str, uri: &str) -> bool {
    match parse(template) {
        Some(segments) => match_segments(&segments, uri),
        None => false,
    }
}

fn match_segments(segments: &[Segment<'_>], input: &str) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return input.is_empty();
    };
    match first {
        Segment::Literal(literal) => input
            .strip_prefix(literal)
            .is_some_and(|remaining| match_segments(rest, remaining)),
        Segment::Simple | Segment::Reserved => {
            let allow_slash = matches!(first, Segment::Reserved);
            for (index, ch) in input.char_indices() {
                if ch == '/' && !allow_slash {
                    return false;
                }
                let end = index + ch.len_utf8();
                if match_segments(rest, &input[end..]) {
                    return true;
                }
            }
            false
        }
    }
}
