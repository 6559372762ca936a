//! Source-map finalization.
//!
//! During generation every emitted chunk may be prefixed with a location
//! mark — NUL, `line,col`, NUL — naming the source position it came
//! from. This stage strips the marks back out of the generated string,
//! converting each into one V3 mapping segment with Base64 VLQ deltas.

use serde::{Deserialize, Serialize};

use crate::{Options, Output, SourceMapMode};

/// Build the mark prefix for a source position.
pub(crate) fn location_mark(line: u32, col: u32) -> String {
    format!("\u{0}{line},{col}\u{0}")
}

/// A version-3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub version: u32,
    pub file: String,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Serialize to JSON. The struct holds only strings and vectors, so
    /// serialization cannot fail.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map serialization")
    }
}

/// One extracted mark, in generated-output coordinates.
struct Segment {
    gen_line: u32,
    gen_col: u32,
    src_line: u32,
    src_col: u32,
}

/// Apply the requested source-map mode to the marked generator output.
pub(crate) fn finalize(marked: String, original: &str, opts: &Options) -> Output {
    match opts.sourcemap {
        SourceMapMode::None => Output::Source(marked),
        SourceMapMode::Extract => {
            let (src, map) = extract(&marked, original, opts);
            Output::SourceAndMap { src, map }
        }
        SourceMapMode::Append => {
            let (src, map) = extract(&marked, original, opts);
            let url = urlencoding::encode(&map.to_json()).into_owned();
            Output::Source(format!(
                "{src}\n//# sourceMappingURL=data:application/json,{url}"
            ))
        }
    }
}

/// Strip marks from `marked`, producing the clean source and its map.
fn extract(marked: &str, original: &str, opts: &Options) -> (String, SourceMap) {
    let (src, segments) = strip_marks(marked);
    let map = SourceMap {
        version: 3,
        file: opts.targetfile.clone(),
        sources: vec![opts.sourcefile.clone()],
        sources_content: vec![original.to_string()],
        names: Vec::new(),
        mappings: serialize_mappings(&segments),
    };
    (src, map)
}

/// Remove every location mark, recording where each sat in the stripped
/// output.
fn strip_marks(marked: &str) -> (String, Vec<Segment>) {
    let mut src = String::with_capacity(marked.len());
    let mut segments = Vec::new();
    let mut gen_line: u32 = 0;
    let mut line_start = 0usize;

    let mut rest = marked;
    while let Some(idx) = rest.find('\u{0}') {
        push_text(&rest[..idx], &mut src, &mut gen_line, &mut line_start);
        let after = &rest[idx + 1..];
        let Some(end) = after.find('\u{0}') else {
            // a lone NUL is not ours; keep it and stop scanning
            src.push_str(&rest[idx..]);
            return (src, segments);
        };
        let (src_line, src_col) = parse_mark(&after[..end]);
        segments.push(Segment {
            gen_line,
            gen_col: (src.len() - line_start) as u32,
            src_line,
            src_col,
        });
        rest = &after[end + 1..];
    }
    push_text(rest, &mut src, &mut gen_line, &mut line_start);

    (src, segments)
}

fn push_text(text: &str, src: &mut String, gen_line: &mut u32, line_start: &mut usize) {
    let mut lines = text.split('\n');
    src.push_str(lines.next().unwrap_or(""));
    for line in lines {
        src.push('\n');
        *gen_line += 1;
        *line_start = src.len();
        src.push_str(line);
    }
}

fn parse_mark(body: &str) -> (u32, u32) {
    let (line, col) = body.split_once(',').unwrap_or((body, "0"));
    (line.parse().unwrap_or(0), col.parse().unwrap_or(0))
}

/// Encode segments as V3 `mappings`: lines separated by `;`, segments on
/// a line by `,`, each segment four VLQ deltas (generated column, source
/// index, source line, source column). Generated columns restart per
/// line; source coordinates run on.
fn serialize_mappings(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut prev_gen_line: u32 = 0;
    let mut prev_gen_col: i64 = 0;
    let mut prev_src_line: i64 = 0;
    let mut prev_src_col: i64 = 0;
    let mut first_on_line = true;

    for seg in segments {
        while prev_gen_line < seg.gen_line {
            out.push(';');
            prev_gen_line += 1;
            prev_gen_col = 0;
            first_on_line = true;
        }
        if !first_on_line {
            out.push(',');
        }
        vlq_encode(i64::from(seg.gen_col) - prev_gen_col, &mut out);
        vlq_encode(0, &mut out); // single source
        vlq_encode(i64::from(seg.src_line) - prev_src_line, &mut out);
        vlq_encode(i64::from(seg.src_col) - prev_src_col, &mut out);
        prev_gen_col = i64::from(seg.gen_col);
        prev_src_line = i64::from(seg.src_line);
        prev_src_col = i64::from(seg.src_col);
        first_on_line = false;
    }

    out
}

/// Append the Base64 VLQ encoding of a signed value: the sign moves to
/// the low bit, then 5-bit chunks are emitted least-significant first,
/// every chunk but the final one flagged with 0x20.
fn vlq_encode(value: i64, out: &mut String) {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut rest = (value.unsigned_abs() << 1) | u64::from(value < 0);
    loop {
        let chunk = (rest & 0x1f) as usize;
        rest >>= 5;
        out.push(ALPHABET[if rest == 0 { chunk } else { chunk | 0x20 }] as char);
        if rest == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        vlq_encode(value, &mut out);
        out
    }

    #[test]
    fn test_vlq_encode_zero() {
        assert_eq!(vlq(0), "A");
    }

    #[test]
    fn test_vlq_encode_positive() {
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(8), "Q");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
    }

    #[test]
    fn test_vlq_encode_negative() {
        assert_eq!(vlq(-1), "D");
    }

    #[test]
    fn test_strip_single_mark() {
        let marked = format!("{}abc", location_mark(0, 8));
        let (src, segments) = strip_marks(&marked);
        assert_eq!(src, "abc");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].gen_col, 0);
        assert_eq!(segments[0].src_line, 0);
        assert_eq!(segments[0].src_col, 8);
    }

    #[test]
    fn test_strip_mark_mid_line() {
        let marked = format!("var x = {}f();", location_mark(2, 4));
        let (src, segments) = strip_marks(&marked);
        assert_eq!(src, "var x = f();");
        assert_eq!(segments[0].gen_col, 8);
        assert_eq!(segments[0].src_line, 2);
    }

    #[test]
    fn test_gen_cols_account_for_stripped_marks() {
        let marked = format!("a{}bb{}c", location_mark(0, 1), location_mark(0, 3));
        let (src, segments) = strip_marks(&marked);
        assert_eq!(src, "abbc");
        assert_eq!(segments[0].gen_col, 1);
        assert_eq!(segments[1].gen_col, 3);
    }

    #[test]
    fn test_gen_lines_reset_cols() {
        let marked = format!("{}line1\n{}line2", location_mark(0, 0), location_mark(1, 0));
        let (src, segments) = strip_marks(&marked);
        assert_eq!(src, "line1\nline2");
        assert_eq!(segments[1].gen_line, 1);
        assert_eq!(segments[1].gen_col, 0);
    }

    #[test]
    fn test_serialize_mappings() {
        let marked = format!("{}line1\n{}line2", location_mark(0, 0), location_mark(1, 0));
        let (_, segments) = strip_marks(&marked);
        assert_eq!(serialize_mappings(&segments), "AAAA;AACA");
    }

    #[test]
    fn test_serialize_two_segments_one_line() {
        let marked = format!("{}ab{}cd", location_mark(0, 0), location_mark(0, 10));
        let (_, segments) = strip_marks(&marked);
        // second segment: +2 generated, +10 source col
        assert_eq!(serialize_mappings(&segments), "AAAA,EAAU");
    }

    #[test]
    fn test_map_artifact_shape() {
        let opts = Options::default();
        let marked = format!("{}x", location_mark(0, 0));
        let (src, map) = extract(&marked, "x", &opts);
        assert_eq!(src, "x");
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["in.js".to_string()]);
        assert_eq!(map.sources_content, vec!["x".to_string()]);
        assert!(map.names.is_empty());
        let json = map.to_json();
        assert!(json.contains("\"sourcesContent\""));
        assert!(json.contains("\"mappings\":\"AAAA\""));
    }
}
